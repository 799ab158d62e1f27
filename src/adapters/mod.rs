// Adapters layer: concrete row sources and email senders behind the domain ports.

pub mod csv_file;
pub mod dry_run;
pub mod google_auth;
pub mod sheets;
pub mod smtp;
pub mod template;

pub use csv_file::CsvFileSource;
pub use dry_run::DryRunSender;
pub use google_auth::ServiceAccountKey;
pub use sheets::{GoogleSheetsSource, SheetsAuth};
pub use smtp::SmtpBirthdaySender;
