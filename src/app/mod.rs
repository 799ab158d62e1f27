pub mod runner;

pub use runner::{build_engine, run_birthdays};
