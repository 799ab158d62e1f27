use crate::domain::model::{SendFailure, SendJob, SheetData};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Supplies the contact sheet for one run.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<SheetData>;
}

/// Delivers one birthday email. Called once per matched contact.
#[async_trait]
pub trait BirthdaySender: Send + Sync {
    async fn send(&self, job: &SendJob) -> std::result::Result<(), SendFailure>;
}

#[async_trait]
impl<T: BirthdaySender + ?Sized> BirthdaySender for Box<T> {
    async fn send(&self, job: &SendJob) -> std::result::Result<(), SendFailure> {
        (**self).send(job).await
    }
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for Box<T> {
    async fn fetch_rows(&self) -> Result<SheetData> {
        (**self).fetch_rows().await
    }
}
