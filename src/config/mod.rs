#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::google_auth::ServiceAccountKey;
use crate::core::matcher::DEFAULT_DATE_FORMATS;
use crate::core::recipients::DEFAULT_SUBJECT;
use crate::domain::model::ColumnHeaders;
use crate::utils::error::{BirthdayError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub columns: ColumnHeaders,
    #[serde(default)]
    pub birthday: BirthdayConfig,
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    GoogleSheets,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    pub spreadsheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Path to a service account key file.
    pub credentials_path: Option<String>,
    /// The key file's JSON inline, usually `'''${GOOGLE_CREDENTIALS}'''`.
    pub credentials_json: Option<String>,
    pub base_url: Option<String>,
    pub csv_path: Option<String>,
    pub header_row: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthdayConfig {
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for BirthdayConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub sender_email: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    pub template_path: Option<String>,
    pub image_path: Option<String>,
    pub company_name: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Overrides the system date, `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
}

/// `None` for unset values and for `${VAR}` references left unresolved.
fn resolved(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !(v.starts_with("${") && v.ends_with('}')))
}

impl SourceConfig {
    pub fn spreadsheet_id(&self) -> Option<&str> {
        resolved(&self.spreadsheet_id)
    }

    pub fn sheet_name(&self) -> &str {
        resolved(&self.sheet_name).unwrap_or("Sheet1")
    }

    pub fn api_key(&self) -> Option<&str> {
        resolved(&self.api_key)
    }

    pub fn access_token(&self) -> Option<&str> {
        resolved(&self.access_token)
    }

    /// Inline JSON wins over the key file path.
    pub fn service_account(&self) -> Result<Option<ServiceAccountKey>> {
        if let Some(json) = resolved(&self.credentials_json) {
            return ServiceAccountKey::from_json("source.credentials_json", json).map(Some);
        }
        match resolved(&self.credentials_path) {
            Some(path) => ServiceAccountKey::from_file("source.credentials_path", path).map(Some),
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        resolved(&self.base_url).unwrap_or(DEFAULT_SHEETS_BASE_URL)
    }

    pub fn csv_path(&self) -> Option<&str> {
        resolved(&self.csv_path)
    }

    pub fn header_row(&self) -> usize {
        self.header_row.unwrap_or(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.retry_attempts.unwrap_or(default.max_retries),
            initial_delay: self
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(default.initial_delay),
            backoff_factor: self.backoff_factor.unwrap_or(default.backoff_factor),
        }
    }
}

impl SmtpConfig {
    pub fn server(&self) -> &str {
        resolved(&self.server).unwrap_or("smtp.gmail.com")
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(587)
    }

    /// Falls back to the sender address, as most providers expect.
    pub fn username(&self) -> &str {
        resolved(&self.username).unwrap_or(self.sender_email.trim())
    }

    pub fn password(&self) -> Option<&str> {
        resolved(&self.password)
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls.unwrap_or(true)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(30))
    }
}

impl ContentConfig {
    pub fn template_path(&self) -> &str {
        resolved(&self.template_path).unwrap_or("templates/birthday_email.html")
    }

    pub fn image_path(&self) -> &str {
        resolved(&self.image_path).unwrap_or("./birthday_image.jpg")
    }

    pub fn company_name(&self) -> &str {
        resolved(&self.company_name).unwrap_or("Fischer Jordan")
    }

    pub fn subject(&self) -> &str {
        resolved(&self.subject).unwrap_or(DEFAULT_SUBJECT)
    }
}

impl AppConfig {
    /// Loads and env-substitutes a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BirthdayError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BirthdayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BirthdayError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// `cli_date` wins over the configured date, which wins over the local date.
    pub fn run_date(&self, cli_date: Option<NaiveDate>) -> NaiveDate {
        cli_date
            .or(self.run.date)
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn smtp(&self) -> Result<&SmtpConfig> {
        validation::validate_required_field("smtp", &self.smtp)
    }

    /// Everything needed to read and match the sheet, without the mail side.
    pub fn validate_for_dry_run(&self) -> Result<()> {
        self.validate_source()?;

        validation::validate_non_empty_string("columns.name", &self.columns.name)?;
        validation::validate_non_empty_string("columns.birthday", &self.columns.birthday)?;
        validation::validate_non_empty_string("columns.emails", &self.columns.emails)?;

        validation::validate_date_formats("birthday.date_formats", &self.birthday.date_formats)?;
        Ok(())
    }

    fn validate_source(&self) -> Result<()> {
        validation::validate_range("source.header_row", self.source.header_row(), 1, usize::MAX)?;

        match self.source.kind {
            SourceKind::GoogleSheets => {
                validation::validate_url("source.base_url", self.source.base_url())?;
                validation::validate_required_field(
                    "source.spreadsheet_id",
                    &self.source.spreadsheet_id().map(str::to_string),
                )?;
                let service_account = self.source.service_account()?;
                if service_account.is_none()
                    && self.source.api_key().is_none()
                    && self.source.access_token().is_none()
                {
                    return Err(BirthdayError::MissingConfigError {
                        field: "source.credentials_path, source.credentials_json, source.access_token or source.api_key"
                            .to_string(),
                    });
                }
            }
            SourceKind::Csv => {
                let csv_path = self.source.csv_path().map(str::to_string);
                let path = validation::validate_required_field("source.csv_path", &csv_path)?;
                validation::validate_path("source.csv_path", path)?;
            }
        }
        Ok(())
    }

    fn validate_mail(&self) -> Result<()> {
        let smtp = self.smtp()?;
        validation::validate_email("smtp.sender_email", &smtp.sender_email)?;
        validation::validate_non_empty_string("smtp.server", smtp.server())?;
        validation::validate_range("smtp.port", smtp.port(), 1, u16::MAX)?;
        validation::validate_required_field("smtp.password", &smtp.password().map(str::to_string))?;

        validation::validate_existing_file("content.template_path", self.content.template_path())?;
        if !Path::new(self.content.image_path()).exists() {
            tracing::warn!(
                "Image '{}' does not exist. Emails will be sent without an image.",
                self.content.image_path()
            );
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_for_dry_run()?;
        self.validate_mail()
    }
}
