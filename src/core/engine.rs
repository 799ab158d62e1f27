use crate::core::normalizer::RowNormalizer;
use crate::core::processor::BirthdayProcessor;
use crate::domain::model::{MonthDay, RunSummary, SheetData};
use crate::domain::ports::{BirthdaySender, RowSource};
use crate::utils::error::{BirthdayError, Result};
use chrono::NaiveDate;

pub struct BirthdayEngine<R: RowSource, S: BirthdaySender> {
    source: R,
    sender: S,
    normalizer: RowNormalizer,
    processor: BirthdayProcessor,
}

impl<R: RowSource, S: BirthdaySender> BirthdayEngine<R, S> {
    pub fn new(source: R, sender: S, normalizer: RowNormalizer, processor: BirthdayProcessor) -> Self {
        Self {
            source,
            sender,
            normalizer,
            processor,
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        tracing::info!("Processing birthdays for {}", today.format("%Y-%m-%d"));

        let sheet = self.source.fetch_rows().await?;
        tracing::info!("Fetched {} rows below header row {}", sheet.rows.len(), sheet.header_row);

        self.check_columns(&sheet)?;

        let outcomes = self.normalizer.normalize_all(&sheet.rows);
        let summary = self
            .processor
            .run(&outcomes, MonthDay::from(today), &self.sender)
            .await;

        tracing::info!(
            "Birthday processing finished. Matched = {}, Sent = {}, Failed = {}, Skipped = {}",
            summary.matched,
            summary.sent,
            summary.failed_send,
            summary.skipped_invalid
        );

        Ok(summary)
    }

    fn check_columns(&self, sheet: &SheetData) -> Result<()> {
        let missing: Vec<String> = self
            .normalizer
            .columns()
            .all()
            .into_iter()
            .filter(|header| !sheet.has_header(header))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        tracing::error!(
            "Missing required columns in row {}: {}",
            sheet.header_row,
            missing.join(", ")
        );
        Err(BirthdayError::MissingColumnsError {
            header_row: sheet.header_row,
            missing,
        })
    }
}
