pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use app::run_birthdays;
pub use config::AppConfig;
pub use crate::core::{engine::BirthdayEngine, processor::BirthdayProcessor};
pub use domain::model::{RunSummary, SendFailure, SendJob};
pub use utils::error::{BirthdayError, Result};
