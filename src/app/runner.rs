use crate::adapters::{CsvFileSource, DryRunSender, GoogleSheetsSource, SmtpBirthdaySender};
use crate::config::{AppConfig, SourceKind};
use crate::core::engine::BirthdayEngine;
use crate::core::matcher::BirthdayMatcher;
use crate::core::normalizer::RowNormalizer;
use crate::core::processor::BirthdayProcessor;
use crate::core::recipients::RecipientSetBuilder;
use crate::domain::model::RunSummary;
use crate::domain::ports::{BirthdaySender, RowSource};
use crate::utils::error::{BirthdayError, Result};
use chrono::{Datelike, NaiveDate};

pub type ConfiguredEngine = BirthdayEngine<Box<dyn RowSource>, Box<dyn BirthdaySender>>;

pub fn build_source(config: &AppConfig) -> Result<Box<dyn RowSource>> {
    let source: Box<dyn RowSource> = match config.source.kind {
        SourceKind::GoogleSheets => Box::new(GoogleSheetsSource::from_config(&config.source)?),
        SourceKind::Csv => {
            let path = config
                .source
                .csv_path()
                .ok_or_else(|| BirthdayError::MissingConfigError {
                    field: "source.csv_path".to_string(),
                })?;
            Box::new(CsvFileSource::new(path, config.source.header_row()))
        }
    };
    Ok(source)
}

pub fn build_sender(config: &AppConfig, today: NaiveDate, dry_run: bool) -> Result<Box<dyn BirthdaySender>> {
    if dry_run {
        return Ok(Box::new(DryRunSender));
    }
    let sender = SmtpBirthdaySender::from_config(config.smtp()?, &config.content, today.year())?;
    Ok(Box::new(sender))
}

pub fn build_processor(config: &AppConfig) -> BirthdayProcessor {
    BirthdayProcessor::new(
        BirthdayMatcher::from_patterns(&config.birthday.date_formats),
        RecipientSetBuilder::new(config.content.subject()),
    )
}

pub fn build_engine(config: &AppConfig, today: NaiveDate, dry_run: bool) -> Result<ConfiguredEngine> {
    Ok(BirthdayEngine::new(
        build_source(config)?,
        build_sender(config, today, dry_run)?,
        RowNormalizer::new(config.columns.clone()),
        build_processor(config),
    ))
}

/// One full run against the configured source and sender.
pub async fn run_birthdays(config: &AppConfig, today: NaiveDate, dry_run: bool) -> Result<RunSummary> {
    tracing::info!("Starting birthday processing...");
    let engine = build_engine(config, today, dry_run)?;
    engine.run(today).await
}
