pub mod chart;
pub mod depth;
pub mod gallery;
pub mod job;
