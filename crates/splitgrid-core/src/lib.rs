pub mod config;
pub mod types;

pub use config::{LoggingConfig, SchedulerConfig, SchedulerSection};
pub use types::*;
