use crate::domain::model::{SendFailure, SendJob};
use crate::domain::ports::BirthdaySender;
use async_trait::async_trait;

/// Logs each job instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct DryRunSender;

#[async_trait]
impl BirthdaySender for DryRunSender {
    async fn send(&self, job: &SendJob) -> Result<(), SendFailure> {
        tracing::info!(
            "🔍 DRY RUN: would send '{}' to {} (CC: {})",
            job.subject,
            job.primary_recipient,
            job.cc_list.len()
        );
        Ok(())
    }
}
