//! Service-account login for the Sheets API.
//!
//! Signs an RS256 JWT grant with the account's private key and exchanges it
//! at the key's `token_uri` for a short-lived access token, once per fetch.

use crate::utils::error::{BirthdayError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::form_urlencoded;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google rejects assertions valid for longer than an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a downloaded service-account key file that the grant needs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    /// Parses the key JSON. `field` names the config key it came from.
    pub fn from_json(field: &str, json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json).map_err(|e| BirthdayError::ConfigValidationError {
            field: field.to_string(),
            message: format!("not a service account key: {}", e),
        })?;
        key.check(field)
    }

    pub fn from_file<P: AsRef<Path>>(field: &str, path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| BirthdayError::InvalidConfigValueError {
            field: field.to_string(),
            value: path.display().to_string(),
            reason: format!("Could not read service account key: {}", e),
        })?;
        Self::from_json(field, &json)
    }

    fn check(self, field: &str) -> Result<Self> {
        let invalid = |message: &str| BirthdayError::ConfigValidationError {
            field: field.to_string(),
            message: message.to_string(),
        };

        if !self.client_email.contains('@') {
            return Err(invalid("client_email is missing or not an address"));
        }
        if !self.private_key.contains("PRIVATE KEY-----") {
            return Err(invalid("private_key is not a PEM private key"));
        }
        if let Some(uri) = &self.token_uri {
            url::Url::parse(uri).map_err(|e| invalid(&format!("token_uri is not a URL: {}", e)))?;
        }
        Ok(self)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// The signed JWT sent as the grant's `assertion`.
    pub fn signed_assertion(&self, scope: &str, issued_at: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = GrantClaims {
            iss: &self.client_email,
            scope,
            aud: self.token_uri(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            BirthdayError::SheetsAuthError {
                message: format!("private key for {} is unusable: {}", self.client_email, e),
            }
        })?;

        encode(&header, &claims, &key).map_err(|e| BirthdayError::SheetsAuthError {
            message: format!("could not sign the token request: {}", e),
        })
    }
}

pub async fn fetch_access_token(client: &Client, key: &ServiceAccountKey, scope: &str) -> Result<String> {
    let assertion = key.signed_assertion(scope, Utc::now().timestamp())?;
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", JWT_BEARER_GRANT)
        .append_pair("assertion", &assertion)
        .finish();

    tracing::info!("Requesting access token for {}", key.client_email);
    let response = client
        .post(key.token_uri())
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BirthdayError::SheetsAuthError {
            message: format!("token endpoint returned HTTP {}: {}", status.as_u16(), body),
        });
    }

    let token: TokenResponse = response.json().await?;
    tracing::debug!("Access token issued for {}", key.client_email);
    Ok(token.access_token)
}
