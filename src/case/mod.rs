pub mod config;
pub mod rundata;
