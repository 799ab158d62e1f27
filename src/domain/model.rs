use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// One spreadsheet line keyed by its column headers, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number within the sheet.
    pub row_number: usize,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<(String, String)>) -> Self {
        Self { row_number, cells }
    }

    /// Looks up a cell by header, ignoring case and surrounding whitespace.
    pub fn get(&self, header: &str) -> Option<&str> {
        let wanted = header.trim();
        self.cells
            .iter()
            .find(|(h, _)| h.trim().eq_ignore_ascii_case(wanted))
            .map(|(_, v)| v.as_str())
    }
}

/// Header row plus the data rows beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub header_row: usize,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetData {
    /// Builds rows from a raw cell grid. `header_row` is 1-based; rows above it
    /// are ignored and cells beyond the header width are dropped.
    pub fn from_grid(grid: Vec<Vec<String>>, header_row: usize) -> Self {
        Self::from_numbered_lines(
            grid.into_iter().enumerate().map(|(index, cells)| (index + 1, cells)),
            header_row,
        )
    }

    /// Like [`SheetData::from_grid`] for sources that skip blank lines: each
    /// line carries its own 1-based number, which becomes the row number.
    /// The first line numbered at or after `header_row` holds the headers.
    pub fn from_numbered_lines<I>(lines: I, header_row: usize) -> Self
    where
        I: IntoIterator<Item = (usize, Vec<String>)>,
    {
        let mut lines = lines.into_iter().skip_while(|(number, _)| *number < header_row);

        let headers: Vec<String> = match lines.next() {
            Some((_, headers)) => headers.into_iter().map(|h| h.trim().to_string()).collect(),
            None => {
                return Self {
                    header_row,
                    ..Self::default()
                }
            }
        };

        let rows = lines
            .map(|(number, cells)| {
                let cells = headers
                    .iter()
                    .cloned()
                    .zip(cells)
                    .collect::<Vec<(String, String)>>();
                RawRow::new(number, cells)
            })
            .collect();

        Self {
            header_row,
            headers,
            rows,
        }
    }

    pub fn has_header(&self, header: &str) -> bool {
        let wanted = header.trim();
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(wanted))
    }
}

/// Sheet headers holding each contact field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnHeaders {
    pub name: String,
    pub birthday: String,
    pub emails: String,
}

impl Default for ColumnHeaders {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            birthday: "Birthday".to_string(),
            emails: "Emails".to_string(),
        }
    }
}

impl ColumnHeaders {
    pub fn all(&self) -> [&str; 3] {
        [&self.name, &self.birthday, &self.emails]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: String,
    pub birthday_raw: String,
    pub email_list: Vec<String>,
    pub row_index: usize,
}

/// A contact plus the email fragments that were dropped while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub contact: Contact,
    pub rejected_emails: Vec<String>,
}

/// Why a row was excluded from processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("name is missing")]
    MissingName,

    #[error("birthday is missing")]
    MissingBirthday,

    #[error("no valid email address")]
    NoValidEmail { rejected: Vec<String> },

    #[error("could not parse birthday '{raw}'")]
    UnparseableBirthday { raw: String },
}

/// Normalization result for one sheet row, in sheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    pub row_index: usize,
    pub result: Result<NormalizedRow, SkipReason>,
}

impl RowOutcome {
    pub fn contact(&self) -> Option<&Contact> {
        self.result.as_ref().ok().map(|row| &row.contact)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedBirthday {
    pub month: u32,
    pub day: u32,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }
}

impl From<NaiveDate> for MonthDay {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.month(), date.day())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendJob {
    pub primary_recipient: String,
    pub cc_list: BTreeSet<String>,
    pub first_name: String,
    pub subject: String,
}

/// Failure reported by an email sender for one job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    #[error("SMTP authentication failed: {0}")]
    Auth(String),

    #[error("SMTP connection failed: {0}")]
    Connection(String),

    #[error("recipient refused: {0}")]
    RecipientRefused(String),

    #[error("could not render email: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub row_index: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row_index, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub matched: usize,
    pub sent: usize,
    pub skipped_invalid: usize,
    pub failed_send: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    pub(crate) fn note(&mut self, row_index: usize, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            row_index,
            message: message.into(),
        });
    }
}
