pub mod config;
pub mod resume;
pub mod run;
