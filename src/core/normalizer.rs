use crate::domain::model::{ColumnHeaders, Contact, NormalizedRow, RawRow, RowOutcome, SkipReason};

/// Turns raw sheet rows into validated contacts.
#[derive(Debug, Clone, Default)]
pub struct RowNormalizer {
    columns: ColumnHeaders,
}

impl RowNormalizer {
    pub fn new(columns: ColumnHeaders) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnHeaders {
        &self.columns
    }

    pub fn normalize(&self, row: &RawRow) -> Result<NormalizedRow, SkipReason> {
        let name = cell(row, &self.columns.name).ok_or(SkipReason::MissingName)?;
        let birthday = cell(row, &self.columns.birthday).ok_or(SkipReason::MissingBirthday)?;

        let (email_list, rejected_emails) = split_emails(row.get(&self.columns.emails).unwrap_or(""));
        if email_list.is_empty() {
            return Err(SkipReason::NoValidEmail {
                rejected: rejected_emails,
            });
        }

        Ok(NormalizedRow {
            contact: Contact {
                name: name.to_string(),
                birthday_raw: birthday.to_string(),
                email_list,
                row_index: row.row_number,
            },
            rejected_emails,
        })
    }

    /// Normalizes every row, keeping sheet order.
    pub fn normalize_all(&self, rows: &[RawRow]) -> Vec<RowOutcome> {
        rows.iter()
            .map(|row| RowOutcome {
                row_index: row.row_number,
                result: self.normalize(row),
            })
            .collect()
    }
}

fn cell<'a>(row: &'a RawRow, header: &str) -> Option<&'a str> {
    row.get(header).map(str::trim).filter(|v| !v.is_empty())
}

/// Splits a delimited email cell into (valid, rejected) fragments.
pub fn split_emails(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut valid: Vec<String> = Vec::new();
    let mut rejected = Vec::new();

    for fragment in raw.split([',', ';']).map(str::trim).filter(|f| !f.is_empty()) {
        if !is_plausible_email(fragment) {
            rejected.push(fragment.to_string());
        } else if !valid.iter().any(|v| v.eq_ignore_ascii_case(fragment)) {
            valid.push(fragment.to_string());
        }
    }

    (valid, rejected)
}

/// Exactly one `@` with something on both sides.
pub fn is_plausible_email(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, birthday: &str, emails: &str) -> RawRow {
        RawRow::new(
            2,
            vec![
                ("Name".to_string(), name.to_string()),
                ("Birthday".to_string(), birthday.to_string()),
                ("Emails".to_string(), emails.to_string()),
            ],
        )
    }

    #[test]
    fn test_valid_row_keeps_email_order() {
        let normalizer = RowNormalizer::default();
        let result = normalizer
            .normalize(&row(" Jane Doe ", "04/15/1990", "jane@x.com, j.doe@x.com"))
            .unwrap();

        assert_eq!(result.contact.name, "Jane Doe");
        assert_eq!(result.contact.birthday_raw, "04/15/1990");
        assert_eq!(result.contact.email_list, vec!["jane@x.com", "j.doe@x.com"]);
        assert_eq!(result.contact.row_index, 2);
        assert!(result.rejected_emails.is_empty());
    }

    #[test]
    fn test_missing_name_and_birthday() {
        let normalizer = RowNormalizer::default();
        assert_eq!(
            normalizer.normalize(&row("  ", "04/15", "a@b.c")),
            Err(SkipReason::MissingName)
        );
        assert_eq!(
            normalizer.normalize(&row("Bob", "", "a@b.c")),
            Err(SkipReason::MissingBirthday)
        );

        let no_columns = RawRow::new(5, vec![("Other".to_string(), "x".to_string())]);
        assert_eq!(normalizer.normalize(&no_columns), Err(SkipReason::MissingName));
    }

    #[test]
    fn test_all_invalid_emails_skip_row() {
        let normalizer = RowNormalizer::default();
        let result = normalizer.normalize(&row("Ann", "01/01", "not-an-email, also bad"));

        assert_eq!(
            result,
            Err(SkipReason::NoValidEmail {
                rejected: vec!["not-an-email".to_string(), "also bad".to_string()],
            })
        );
    }

    #[test]
    fn test_invalid_fragments_dropped_individually() {
        let normalizer = RowNormalizer::default();
        let result = normalizer
            .normalize(&row("Ann", "01/01", "ann@x.com;; @x.com ; a@@x.com; ann2@x.com; x@"))
            .unwrap();

        assert_eq!(result.contact.email_list, vec!["ann@x.com", "ann2@x.com"]);
        assert_eq!(result.rejected_emails, vec!["@x.com", "a@@x.com", "x@"]);
        assert!(result.contact.email_list.iter().all(|e| !e.is_empty()));
    }

    #[test]
    fn test_duplicate_emails_within_row_removed() {
        let (valid, rejected) = split_emails("a@x.com, A@X.com; b@x.com, a@x.com");
        assert_eq!(valid, vec!["a@x.com", "b@x.com"]);
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = RowNormalizer::default();
        let raw = row("Jane Doe", "04/15/1990", "jane@x.com, bad");
        assert_eq!(normalizer.normalize(&raw), normalizer.normalize(&raw));
    }

    #[test]
    fn test_custom_headers() {
        let normalizer = RowNormalizer::new(ColumnHeaders {
            name: "Full Name".to_string(),
            birthday: "DOB".to_string(),
            emails: "Mail".to_string(),
        });
        let raw = RawRow::new(
            3,
            vec![
                ("full name".to_string(), "Kim".to_string()),
                ("dob".to_string(), "2000-03-01".to_string()),
                ("MAIL".to_string(), "kim@x.com".to_string()),
            ],
        );

        let result = normalizer.normalize(&raw).unwrap();
        assert_eq!(result.contact.name, "Kim");
        assert_eq!(result.contact.email_list, vec!["kim@x.com"]);
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let normalizer = RowNormalizer::default();
        let mut second = row("", "01/01", "a@b.c");
        second.row_number = 3;
        let outcomes = normalizer.normalize_all(&[row("A", "01/01", "a@b.c"), second]);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].contact().is_some());
        assert_eq!(outcomes[1].row_index, 3);
        assert_eq!(outcomes[1].result, Err(SkipReason::MissingName));
    }
}
