use crate::core::matcher::BirthdayMatcher;
use crate::core::recipients::RecipientSetBuilder;
use crate::domain::model::{MonthDay, RowOutcome, RunSummary};
use crate::domain::ports::BirthdaySender;

/// Walks normalized rows in order and sends one email per birthday match.
///
/// Row skips and send failures are folded into the [`RunSummary`]; nothing
/// that happens to one row stops the others.
#[derive(Debug, Clone, Default)]
pub struct BirthdayProcessor {
    matcher: BirthdayMatcher,
    recipients: RecipientSetBuilder,
}

impl BirthdayProcessor {
    pub fn new(matcher: BirthdayMatcher, recipients: RecipientSetBuilder) -> Self {
        Self {
            matcher,
            recipients,
        }
    }

    pub async fn run<S>(&self, rows: &[RowOutcome], today: MonthDay, sender: &S) -> RunSummary
    where
        S: BirthdaySender + ?Sized,
    {
        let mut summary = RunSummary::default();
        let contacts: Vec<_> = rows.iter().filter_map(RowOutcome::contact).collect();

        for row in rows {
            let normalized = match &row.result {
                Ok(normalized) => normalized,
                Err(reason) => {
                    tracing::warn!("Skipping row {}: {}", row.row_index, reason);
                    summary.skipped_invalid += 1;
                    summary.note(row.row_index, format!("skipped: {}", reason));
                    continue;
                }
            };
            let contact = &normalized.contact;

            for rejected in &normalized.rejected_emails {
                tracing::warn!(
                    "Row {} ({}): ignoring invalid email '{}'",
                    row.row_index,
                    contact.name,
                    rejected
                );
                summary.note(row.row_index, format!("ignored invalid email '{}'", rejected));
            }

            let parsed = match self.matcher.parse(&contact.birthday_raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!("Skipping row {} ({}): {}", row.row_index, contact.name, err);
                    summary.skipped_invalid += 1;
                    summary.note(
                        row.row_index,
                        format!("skipped: could not parse birthday '{}'", contact.birthday_raw),
                    );
                    continue;
                }
            };

            if !BirthdayMatcher::matches(&parsed, today) {
                continue;
            }

            let Some(job) = self.recipients.build(contacts.iter().copied(), contact) else {
                continue;
            };

            summary.matched += 1;
            tracing::info!(
                "Match found: row {} - {}'s birthday is today, sending to {} (CC: {} others)",
                row.row_index,
                contact.name,
                job.primary_recipient,
                job.cc_list.len()
            );

            match sender.send(&job).await {
                Ok(()) => {
                    summary.sent += 1;
                    tracing::info!("Sent birthday email to {}", job.primary_recipient);
                }
                Err(failure) => {
                    summary.failed_send += 1;
                    tracing::error!(
                        "Failed to send email for {} (row {}) to {}: {}",
                        contact.name,
                        row.row_index,
                        job.primary_recipient,
                        failure
                    );
                    summary.note(
                        row.row_index,
                        format!("send to {} failed: {}", job.primary_recipient, failure),
                    );
                }
            }
        }

        summary
    }
}
