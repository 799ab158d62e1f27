//! SMTP delivery for birthday emails.
//!
//! Wraps lettre's `AsyncSmtpTransport`. STARTTLS with credentials is the
//! default; `use_tls = false` talks plain SMTP for local relays such as Mailpit.

use crate::adapters::template::{self, TemplateValues, TEXT_TEMPLATE};
use crate::config::{ContentConfig, SmtpConfig};
use crate::domain::model::{SendFailure, SendJob};
use crate::domain::ports::BirthdaySender;
use crate::utils::error::{BirthdayError, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;

/// Referenced from the HTML template as `cid:birthday_image`.
pub const IMAGE_CONTENT_ID: &str = "birthday_image";

#[derive(Debug, Clone)]
struct InlineImage {
    data: Vec<u8>,
    content_type: ContentType,
}

pub struct SmtpBirthdaySender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender_email: String,
    html_template: String,
    image: Option<InlineImage>,
    company_name: String,
    year: i32,
}

impl SmtpBirthdaySender {
    /// `year` fills the `{year}` placeholder.
    pub fn from_config(smtp: &SmtpConfig, content: &ContentConfig, year: i32) -> Result<Self> {
        let builder = if !smtp.use_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp.server())
        } else if smtp.port() == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp.server())
                .map_err(|e| BirthdayError::SmtpSetupError { message: e.to_string() })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp.server())
                .map_err(|e| BirthdayError::SmtpSetupError { message: e.to_string() })?
        };

        let mut builder = builder.port(smtp.port()).timeout(Some(smtp.timeout()));
        if let Some(password) = smtp.password() {
            builder = builder.credentials(Credentials::new(
                smtp.username().to_string(),
                password.to_string(),
            ));
        }

        let html_template = std::fs::read_to_string(content.template_path()).map_err(|e| {
            BirthdayError::InvalidConfigValueError {
                field: "content.template_path".to_string(),
                value: content.template_path().to_string(),
                reason: format!("Could not read HTML template: {}", e),
            }
        })?;

        tracing::info!(
            "Email sender initialized for {}:{} with user {}",
            smtp.server(),
            smtp.port(),
            smtp.username()
        );

        Ok(Self {
            transport: builder.build(),
            sender_email: smtp.sender_email.trim().to_string(),
            html_template,
            image: load_image(content.image_path()),
            company_name: content.company_name().to_string(),
            year,
        })
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn build_message(&self, job: &SendJob) -> std::result::Result<Message, SendFailure> {
        let values = TemplateValues {
            first_name: &job.first_name,
            company_name: &self.company_name,
            year: self.year,
        };
        let html = template::render(&self.html_template, &values)
            .map_err(|e| SendFailure::Render(e.to_string()))?;
        let text = template::render(TEXT_TEMPLATE, &values)
            .map_err(|e| SendFailure::Render(e.to_string()))?;

        let from: Mailbox = self
            .sender_email
            .parse()
            .map_err(|e| SendFailure::Render(format!("invalid sender address '{}': {}", self.sender_email, e)))?;
        let to: Mailbox = job.primary_recipient.parse().map_err(|e| {
            SendFailure::RecipientRefused(format!("invalid address '{}': {}", job.primary_recipient, e))
        })?;

        let mut builder = Message::builder().from(from).to(to).subject(job.subject.as_str());
        for cc in &job.cc_list {
            match cc.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.cc(mailbox),
                Err(e) => tracing::warn!("Leaving '{}' off the CC list: {}", cc, e),
            }
        }

        let body = match &self.image {
            Some(image) => MultiPart::alternative().singlepart(SinglePart::plain(text)).multipart(
                MultiPart::related().singlepart(SinglePart::html(html)).singlepart(
                    Attachment::new_inline(IMAGE_CONTENT_ID.to_string())
                        .body(image.data.clone(), image.content_type.clone()),
                ),
            ),
            None => MultiPart::alternative_plain_html(text, html),
        };

        builder
            .multipart(body)
            .map_err(|e| SendFailure::Render(format!("message build failed: {}", e)))
    }
}

#[async_trait]
impl BirthdaySender for SmtpBirthdaySender {
    async fn send(&self, job: &SendJob) -> std::result::Result<(), SendFailure> {
        let message = self.build_message(job)?;

        tracing::info!(
            "Attempting to send email to {} (CC: {})",
            job.primary_recipient,
            if job.cc_list.is_empty() {
                "None".to_string()
            } else {
                job.cc_list.iter().cloned().collect::<Vec<_>>().join(", ")
            }
        );

        self.transport.send(message).await.map(|_| ()).map_err(|e| {
            let code = e.status().map(|code| code.to_string());
            classify_failure(code.as_deref(), e.to_string())
        })
    }
}

/// Maps an SMTP reply code (if the server sent one) to a failure kind.
pub fn classify_failure(code: Option<&str>, detail: String) -> SendFailure {
    match code {
        Some("530" | "534" | "535") => SendFailure::Auth(detail),
        Some("550" | "551" | "552" | "553" | "554") => SendFailure::RecipientRefused(detail),
        _ => SendFailure::Connection(detail),
    }
}

fn load_image(path: &str) -> Option<InlineImage> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::warn!("Image {} not found. Sending without image.", path.display());
        return None;
    }

    match std::fs::read(path) {
        Ok(data) => {
            tracing::debug!("Loaded inline image {} ({} bytes)", path.display(), data.len());
            Some(InlineImage {
                data,
                content_type: image_content_type(path),
            })
        }
        Err(e) => {
            tracing::error!("Error reading image {}: {}. Sending without image.", path.display(), e);
            None
        }
    }
}

fn image_content_type(path: &Path) -> ContentType {
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            server: Some("localhost".to_string()),
            port: Some(1025),
            sender_email: "party@example.com".to_string(),
            username: None,
            password: None,
            use_tls: Some(false),
            timeout_seconds: Some(5),
        }
    }

    fn sender_with(template_body: &str, image_path: &str) -> (SmtpBirthdaySender, NamedTempFile) {
        let mut template = NamedTempFile::new().unwrap();
        template.write_all(template_body.as_bytes()).unwrap();
        let content = ContentConfig {
            template_path: Some(template.path().display().to_string()),
            image_path: Some(image_path.to_string()),
            company_name: Some("Acme".to_string()),
            subject: None,
        };
        let sender = SmtpBirthdaySender::from_config(&smtp_config(), &content, 2026).unwrap();
        (sender, template)
    }

    fn job() -> SendJob {
        SendJob {
            primary_recipient: "jane@x.com".to_string(),
            cc_list: BTreeSet::from(["bob@x.com".to_string(), "carl@x.com".to_string()]),
            first_name: "Jane".to_string(),
            subject: "Happy Birthday, Jane!".to_string(),
        }
    }

    #[test]
    fn test_message_has_recipients_and_subject() {
        let (sender, _template) = sender_with("<p>Hi {first_name}</p>", "/no/such/image.jpg");
        assert!(!sender.has_image());

        let message = sender.build_message(&job()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("To: jane@x.com"));
        assert!(formatted.contains("bob@x.com"));
        assert!(formatted.contains("carl@x.com"));
        assert!(formatted.contains("Subject: Happy Birthday, Jane!"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("<p>Hi Jane</p>"));
    }

    #[test]
    fn test_inline_image_is_embedded() {
        let mut image = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let (sender, _template) = sender_with(
            "<img src=\"cid:birthday_image\">",
            &image.path().display().to_string(),
        );
        assert!(sender.has_image());

        let message = sender.build_message(&job()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/related"));
        assert!(formatted.contains("image/png"));
        assert!(formatted.contains("birthday_image"));
    }

    #[test]
    fn test_unknown_placeholder_is_render_failure() {
        let (sender, _template) = sender_with("<p>{nickname}</p>", "/no/such/image.jpg");
        assert!(matches!(sender.build_message(&job()), Err(SendFailure::Render(_))));
    }

    #[test]
    fn test_invalid_primary_is_refused() {
        let (sender, _template) = sender_with("<p>{first_name}</p>", "/no/such/image.jpg");
        let mut bad = job();
        bad.primary_recipient = "not-an-address".to_string();
        assert!(matches!(
            sender.build_message(&bad),
            Err(SendFailure::RecipientRefused(_))
        ));
    }

    #[test]
    fn test_missing_template_is_config_error() {
        let content = ContentConfig {
            template_path: Some("/no/such/template.html".to_string()),
            ..Default::default()
        };
        let err = SmtpBirthdaySender::from_config(&smtp_config(), &content, 2026)
            .err()
            .unwrap();
        assert!(matches!(err, BirthdayError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure(Some("535"), "bad credentials".to_string()),
            SendFailure::Auth("bad credentials".to_string())
        );
        assert!(matches!(
            classify_failure(Some("550"), "no such user".to_string()),
            SendFailure::RecipientRefused(_)
        ));
        assert!(matches!(
            classify_failure(None, "connection refused".to_string()),
            SendFailure::Connection(_)
        ));
        assert!(matches!(
            classify_failure(Some("421"), "try later".to_string()),
            SendFailure::Connection(_)
        ));
    }

    #[test]
    fn test_image_content_type() {
        assert_eq!(
            image_content_type(Path::new("cake.JPG")),
            ContentType::parse("image/jpeg").unwrap()
        );
        assert_eq!(
            image_content_type(Path::new("cake")),
            ContentType::parse("application/octet-stream").unwrap()
        );
    }
}
