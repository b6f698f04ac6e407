pub mod apply;
pub mod batch_plan;
pub mod cli;
pub mod config;
pub mod detector;
pub mod discover;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod util;
