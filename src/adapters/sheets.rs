use crate::adapters::google_auth::{self, ServiceAccountKey, SHEETS_READONLY_SCOPE};
use crate::config::SourceConfig;
use crate::domain::model::SheetData;
use crate::domain::ports::RowSource;
use crate::utils::error::{BirthdayError, Result};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsAuth {
    /// Public or link-shared sheets only.
    ApiKey(String),
    /// A token obtained elsewhere; it is not refreshed.
    BearerToken(String),
    /// Exchanges a signed grant for a fresh token on every fetch.
    ServiceAccount(ServiceAccountKey),
}

/// Reads the contact sheet through the Google Sheets v4 `values.get` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleSheetsSource {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    auth: SheetsAuth,
    header_row: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl GoogleSheetsSource {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        auth: SheetsAuth,
        header_row: usize,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("birthday-mailer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            auth,
            header_row,
            retry,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id()
            .ok_or_else(|| BirthdayError::MissingConfigError {
                field: "source.spreadsheet_id".to_string(),
            })?;

        let auth = match (config.service_account()?, config.access_token(), config.api_key()) {
            (Some(key), _, _) => SheetsAuth::ServiceAccount(key),
            (None, Some(token), _) => SheetsAuth::BearerToken(token.to_string()),
            (None, None, Some(key)) => SheetsAuth::ApiKey(key.to_string()),
            (None, None, None) => {
                return Err(BirthdayError::MissingConfigError {
                    field: "source.credentials_path, source.credentials_json, source.access_token or source.api_key"
                        .to_string(),
                })
            }
        };

        Self::new(
            config.base_url(),
            spreadsheet_id,
            config.sheet_name(),
            auth,
            config.header_row(),
            config.timeout(),
            config.retry_policy(),
        )
    }

    pub fn values_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| BirthdayError::InvalidConfigValueError {
            field: "source.base_url".to_string(),
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        url.path_segments_mut()
            .map_err(|_| BirthdayError::config(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", self.sheet_name.as_str()]);

        if let SheetsAuth::ApiKey(key) = &self.auth {
            url.query_pairs_mut().append_pair("key", key);
        }

        Ok(url)
    }

    async fn bearer_token(&self) -> Result<Option<String>> {
        match &self.auth {
            SheetsAuth::ApiKey(_) => Ok(None),
            SheetsAuth::BearerToken(token) => Ok(Some(token.clone())),
            SheetsAuth::ServiceAccount(key) => {
                google_auth::fetch_access_token(&self.client, key, SHEETS_READONLY_SCOPE)
                    .await
                    .map(Some)
            }
        }
    }

    async fn fetch_grid(&self, url: &Url, token: Option<&str>) -> Result<Vec<Vec<String>>> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Sheets API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BirthdayError::SourceStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let range: ValueRange = response.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_unavailable(err: &BirthdayError) -> bool {
    matches!(
        err,
        BirthdayError::SourceStatusError { status, .. } if *status == StatusCode::SERVICE_UNAVAILABLE.as_u16()
    )
}

#[async_trait]
impl RowSource for GoogleSheetsSource {
    async fn fetch_rows(&self) -> Result<SheetData> {
        let url = self.values_url()?;
        tracing::info!(
            "Fetching sheet '{}' from spreadsheet {}",
            self.sheet_name,
            self.spreadsheet_id
        );

        let token = self.bearer_token().await?;
        let grid = retry_with_backoff(&self.retry, "Sheets", is_unavailable, || {
            self.fetch_grid(&url, token.as_deref())
        })
        .await?;
        Ok(SheetData::from_grid(grid, self.header_row))
    }
}
