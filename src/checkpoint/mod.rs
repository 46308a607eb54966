pub mod completion;
pub mod run;
