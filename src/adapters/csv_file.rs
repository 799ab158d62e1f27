use crate::domain::model::SheetData;
use crate::domain::ports::RowSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads contacts from a CSV export of the sheet.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    header_row: usize,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>, header_row: usize) -> Self {
        Self {
            path: path.into(),
            header_row,
        }
    }

    pub fn parse(data: &[u8], header_row: usize) -> Result<SheetData> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(data);

        // Blank lines produce no record, so number rows by where they start.
        let mut lines = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|position| starting_line(data, position))
                .unwrap_or(index + 1);
            lines.push((line, record.iter().map(str::to_string).collect::<Vec<String>>()));
        }

        Ok(SheetData::from_numbered_lines(lines, header_row))
    }
}

/// A record's position is taken before any blank lines in front of it.
fn starting_line(data: &[u8], position: &csv::Position) -> usize {
    let skipped_newlines = data
        .get(position.byte() as usize..)
        .unwrap_or_default()
        .iter()
        .take_while(|byte| matches!(byte, b'\r' | b'\n'))
        .filter(|byte| **byte == b'\n')
        .count();
    position.line() as usize + skipped_newlines
}

#[async_trait]
impl RowSource for CsvFileSource {
    async fn fetch_rows(&self) -> Result<SheetData> {
        tracing::debug!("Reading contacts from {}", self.path.display());
        let data = tokio::fs::read(&self.path).await?;
        Self::parse(&data, self.header_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_quoted_email_list() {
        let data = b"Name,Birthday,Emails\n\"Doe, Jane\",04/15/1990,\"jane@x.com, j.doe@x.com\"\n";
        let sheet = CsvFileSource::parse(data, 1).unwrap();

        assert_eq!(sheet.headers, vec!["Name", "Birthday", "Emails"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(sheet.rows[0].get("Name"), Some("Doe, Jane"));
        assert_eq!(sheet.rows[0].get("Emails"), Some("jane@x.com, j.doe@x.com"));
    }

    #[test]
    fn test_parse_skips_rows_above_header() {
        let data = b"Team birthdays\nName,Birthday,Emails\nBob,05/01,bob@x.com\nShort\n";
        let sheet = CsvFileSource::parse(data, 2).unwrap();

        assert_eq!(sheet.header_row, 2);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row_number, 3);
        assert_eq!(sheet.rows[1].get("Name"), Some("Short"));
        assert_eq!(sheet.rows[1].get("Birthday"), None);
    }

    #[test]
    fn test_row_numbers_follow_file_lines_across_blank_lines() {
        let data = b"Name,Birthday,Emails\nAnn,04/15,ann@x.com\n\n\nBob,05/01,bob@x.com\n\"Cy\nLee\",06/01,cy@x.com\nDee,07/01,dee@x.com\n";
        let sheet = CsvFileSource::parse(data, 1).unwrap();

        let numbers: Vec<usize> = sheet.rows.iter().map(|row| row.row_number).collect();
        assert_eq!(numbers, vec![2, 5, 6, 8]);
        assert_eq!(sheet.rows[1].get("Name"), Some("Bob"));
    }

    #[test]
    fn test_header_row_counts_file_lines() {
        let data = b"Team birthdays\n\nName,Birthday,Emails\nBob,05/01,bob@x.com\n";
        let sheet = CsvFileSource::parse(data, 3).unwrap();

        assert_eq!(sheet.headers, vec!["Name", "Birthday", "Emails"]);
        assert_eq!(sheet.rows[0].row_number, 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = CsvFileSource::new("/definitely/not/here.csv", 1);
        let err = source.fetch_rows().await.unwrap_err();
        assert!(matches!(err, crate::utils::error::BirthdayError::IoError(_)));
    }
}
