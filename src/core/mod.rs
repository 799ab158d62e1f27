pub mod engine;
pub mod matcher;
pub mod normalizer;
pub mod processor;
pub mod recipients;

pub use crate::domain::model::{Contact, MonthDay, RawRow, RunSummary, SendJob, SheetData};
pub use crate::domain::ports::{BirthdaySender, RowSource};
pub use crate::utils::error::Result;
