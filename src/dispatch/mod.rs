pub mod dispatcher;
pub mod partition;
