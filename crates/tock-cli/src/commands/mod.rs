pub mod common;
pub mod completions;
pub mod config;
pub mod log;
pub mod project;
pub mod report;
pub mod sync;
pub mod task;
pub mod timer;
