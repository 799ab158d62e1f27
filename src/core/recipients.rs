use crate::domain::model::{Contact, SendJob};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_SUBJECT: &str = "Happy Birthday, {first_name}!";

/// Resolves recipient, CC set and template values for one match.
#[derive(Debug, Clone)]
pub struct RecipientSetBuilder {
    subject_pattern: String,
}

impl Default for RecipientSetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT)
    }
}

impl RecipientSetBuilder {
    pub fn new(subject_pattern: impl Into<String>) -> Self {
        Self {
            subject_pattern: subject_pattern.into(),
        }
    }

    /// Returns `None` when the matched contact has no email address.
    pub fn build<'a, I>(&self, all_contacts: I, matched: &Contact) -> Option<SendJob>
    where
        I: IntoIterator<Item = &'a Contact>,
    {
        let primary_recipient = matched.email_list.first()?.clone();
        let primary_key = primary_recipient.to_lowercase();

        // Keyed by lowercase address so case variants collapse to the first spelling seen.
        let mut everyone: BTreeMap<String, &str> = BTreeMap::new();
        for email in all_contacts.into_iter().flat_map(|c| c.email_list.iter()) {
            everyone.entry(email.to_lowercase()).or_insert(email.as_str());
        }

        let cc_list: BTreeSet<String> = everyone
            .into_iter()
            .filter(|(key, _)| *key != primary_key)
            .map(|(_, email)| email.to_string())
            .collect();

        let first_name = first_name(&matched.name).to_string();
        let subject = self.subject_pattern.replace("{first_name}", &first_name);

        Some(SendJob {
            primary_recipient,
            cc_list,
            first_name,
            subject,
        })
    }
}

pub fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}
