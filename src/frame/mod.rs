pub mod claw;
pub mod model;
