use thiserror::Error;

#[derive(Error, Debug)]
pub enum BirthdayError {
    #[error("Sheet request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Sheet returned HTTP {status}: {body}")]
    SourceStatusError { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required columns in row {header_row}: {}", .missing.join(", "))]
    MissingColumnsError {
        header_row: usize,
        missing: Vec<String>,
    },

    #[error("Google authentication failed: {message}")]
    SheetsAuthError { message: String },

    #[error("SMTP setup failed: {message}")]
    SmtpSetupError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    DataSource,
    Mail,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BirthdayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingColumnsError { .. } => ErrorCategory::Configuration,
            Self::ApiError(_)
            | Self::SourceStatusError { .. }
            | Self::SheetsAuthError { .. }
            | Self::CsvError(_) => ErrorCategory::DataSource,
            Self::SmtpSetupError { .. } => ErrorCategory::Mail,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Mail => ErrorSeverity::High,
            ErrorCategory::DataSource => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for a run aborted by this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Mail => 1,
            ErrorCategory::DataSource => 2,
            ErrorCategory::System => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingColumnsError { header_row, .. } => format!(
                "Check the [columns] headers and that row {} of the sheet holds them",
                header_row
            ),
            Self::MissingConfigError { field } => {
                format!("Set '{}' in the configuration file or its environment variable", field)
            }
            Self::InvalidConfigValueError { field, .. } | Self::ConfigValidationError { field, .. } => {
                format!("Fix the value of '{}' in the configuration file", field)
            }
            Self::ConfigError { .. } => "Review the configuration file".to_string(),
            Self::SourceStatusError { status: 401 | 403, .. } => {
                "Check the Google credentials and the sheet's sharing settings".to_string()
            }
            Self::SourceStatusError { status: 404, .. } => {
                "Check spreadsheet_id and sheet_name".to_string()
            }
            Self::ApiError(_) | Self::SourceStatusError { .. } => {
                "Check network connectivity and try again later".to_string()
            }
            Self::SheetsAuthError { .. } => {
                "Check the service account key and that its token endpoint is reachable".to_string()
            }
            Self::CsvError(_) => "Check that the contact list is a well-formed table".to_string(),
            Self::SmtpSetupError { .. } => "Check the [smtp] server settings".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::DataSource => format!("Could not read the contact list: {}", self),
            ErrorCategory::Mail => format!("Could not prepare the mail sender: {}", self),
            ErrorCategory::System => format!("Unexpected failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BirthdayError>;
