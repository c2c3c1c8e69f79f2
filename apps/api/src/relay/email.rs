use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::store::{get_record, new_id, set_record, Collection, DocumentStore, Record};

/// Document id of the stored credentials inside the `settings` collection.
pub const EMAIL_SETTINGS_ID: &str = "email";

const EMAIL_DELIVERY_FAILED: &str = "Failed to send email";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("no mail relay endpoint configured")]
    NotConfigured,
}

/// SMTP-style credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// `settings/email` document body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEmailSettings {
    #[serde(flatten)]
    pub settings: EmailSettings,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// One `sentEmails` log entry, written for every send attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub sent_by: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Applicant details used to render an application email when no `html` is given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEmailData {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub cover_letter: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message and returns the relay's message id.
    async fn send(&self, settings: &EmailSettings, email: &OutgoingEmail)
        -> Result<String, MailError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    host: &'a str,
    port: u16,
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(alias = "id")]
    message_id: String,
}

/// Delivers mail through an HTTP mail relay, authenticating with the stored
/// SMTP user and password.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: Option<String>,
}

impl HttpMailer {
    pub fn new(api_url: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_url,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(
        &self,
        settings: &EmailSettings,
        email: &OutgoingEmail,
    ) -> Result<String, MailError> {
        let api_url = self.api_url.as_deref().ok_or(MailError::NotConfigured)?;

        let body = RelayRequest {
            host: &settings.host,
            port: settings.port,
            from: &settings.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(api_url)
            .basic_auth(&settings.user, Some(&settings.pass))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: RelayResponse = response.json().await?;
        Ok(parsed.message_id)
    }
}

/// Stored settings win; the `SMTP_*` environment fallback is used otherwise.
pub async fn resolve_settings(
    store: &dyn DocumentStore,
    fallback: Option<&EmailSettings>,
) -> Result<EmailSettings, AppError> {
    let stored: Option<Record<StoredEmailSettings>> =
        get_record(store, Collection::Settings, EMAIL_SETTINGS_ID).await?;
    if let Some(record) = stored {
        return Ok(record.data.settings);
    }
    fallback
        .cloned()
        .ok_or_else(|| AppError::Unavailable("Email settings are not configured".into()))
}

pub async fn save_settings(
    store: &dyn DocumentStore,
    settings: EmailSettings,
    updated_by: &str,
) -> Result<(), AppError> {
    let stored = StoredEmailSettings {
        settings,
        updated_at: Utc::now(),
        updated_by: updated_by.to_string(),
    };
    set_record(store, Collection::Settings, EMAIL_SETTINGS_ID, &stored).await?;
    info!("Email settings updated by {updated_by}");
    Ok(())
}

/// Sends the message and records the attempt in `sentEmails`.
///
/// The log entry is bookkeeping: if it cannot be written the outcome of the
/// send still decides the result, so a delivered message is never reported
/// as failed. A failed send surfaces as `AppError::Delivery` with a fixed
/// message; relay details stay in the server log.
pub async fn send_and_log(
    store: &dyn DocumentStore,
    mailer: &dyn Mailer,
    settings: &EmailSettings,
    email: &OutgoingEmail,
    sent_by: Option<&str>,
    application_id: Option<&str>,
) -> Result<String, AppError> {
    let result = mailer.send(settings, email).await;

    let entry = SentEmail {
        to: email.to.clone(),
        subject: email.subject.clone(),
        success: result.is_ok(),
        message_id: result.as_ref().ok().cloned(),
        error: result.as_ref().err().map(|e| e.to_string()),
        sent_by: sent_by.map(String::from),
        application_id: application_id.map(String::from),
        created_at: Utc::now(),
    };
    if let Err(e) = set_record(store, Collection::SentEmails, &new_id(), &entry).await {
        warn!("Could not record email to {} in sentEmails: {e}", email.to);
    }

    match result {
        Ok(message_id) => {
            info!("Sent email to {} ({message_id})", email.to);
            Ok(message_id)
        }
        Err(e) => {
            error!("Email to {} failed: {e}", email.to);
            Err(AppError::Delivery(EMAIL_DELIVERY_FAILED.to_string()))
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the employer-facing email for a new application.
pub fn render_application_email(data: &ApplicationEmailData, resume_url: Option<&str>) -> String {
    let mut html = format!(
        "<h2>New application for {}</h2>\n<p>{} has applied for the position at {}.</p>\n<ul>\n",
        escape_html(&data.job_title),
        escape_html(&data.name),
        escape_html(&data.company),
    );
    for (label, value) in [
        ("Name", &data.name),
        ("Email", &data.email),
        ("Phone", &data.phone),
        ("Experience", &data.experience),
    ] {
        if !value.trim().is_empty() {
            html.push_str(&format!(
                "<li><strong>{label}:</strong> {}</li>\n",
                escape_html(value)
            ));
        }
    }
    html.push_str("</ul>\n");
    if !data.cover_letter.trim().is_empty() {
        html.push_str(&format!(
            "<h3>Cover letter</h3>\n<p>{}</p>\n",
            escape_html(&data.cover_letter)
        ));
    }
    if let Some(url) = resume_url.filter(|u| !u.trim().is_empty()) {
        html.push_str(&format!(
            "<p><a href=\"{}\">View resume</a></p>\n",
            escape_html(url)
        ));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{query_records, MemoryStore, Query};
    use crate::test_support::{smtp_settings, RecordingMailer};

    #[test]
    fn test_render_escapes_and_includes_resume() {
        let data = ApplicationEmailData {
            job_title: "Rust <Engineer>".into(),
            company: "Acme & Co".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            ..Default::default()
        };
        let html = render_application_email(&data, Some("https://cv.example.com/ada"));
        assert!(html.contains("Rust &lt;Engineer&gt;"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("href=\"https://cv.example.com/ada\""));
        assert!(!html.contains("Phone"));
    }

    #[tokio::test]
    async fn test_resolve_prefers_stored_settings() {
        let store = MemoryStore::new();
        let env = smtp_settings("env.example.com");
        let resolved = resolve_settings(&store, Some(&env)).await.unwrap();
        assert_eq!(resolved.host, "env.example.com");

        save_settings(&store, smtp_settings("stored.example.com"), "admin")
            .await
            .unwrap();
        let resolved = resolve_settings(&store, Some(&env)).await.unwrap();
        assert_eq!(resolved.host, "stored.example.com");
    }

    #[tokio::test]
    async fn test_resolve_without_any_settings() {
        let store = MemoryStore::new();
        assert!(matches!(
            resolve_settings(&store, None).await,
            Err(AppError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_send_is_logged() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::failing();
        let email = OutgoingEmail {
            to: "boss@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
        };

        let result = send_and_log(
            &store,
            &mailer,
            &smtp_settings("smtp.example.com"),
            &email,
            Some("u1"),
            Some("app-1"),
        )
        .await;
        assert!(matches!(result, Err(AppError::Delivery(_))));

        let log: Vec<Record<SentEmail>> =
            query_records(&store, &Query::new(Collection::SentEmails))
                .await
                .unwrap();
        assert_eq!(log.len(), 1);
        assert!(!log[0].data.success);
        assert!(log[0].data.error.is_some());
        assert_eq!(log[0].data.application_id.as_deref(), Some("app-1"));
    }

    #[tokio::test]
    async fn test_failed_send_hides_relay_detail() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::failing();
        let email = OutgoingEmail {
            to: "boss@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
        };

        let result = send_and_log(
            &store,
            &mailer,
            &smtp_settings("smtp.example.com"),
            &email,
            None,
            None,
        )
        .await;
        match result {
            Err(AppError::Delivery(message)) => {
                assert_eq!(message, "Failed to send email");
                assert!(!message.contains("relay down"));
            }
            other => panic!("expected Delivery, got {other:?}"),
        }

        // The relay's detail is still kept in the log entry
        let log: Vec<Record<SentEmail>> =
            query_records(&store, &Query::new(Collection::SentEmails))
                .await
                .unwrap();
        assert!(log[0].data.error.as_deref().unwrap().contains("relay down"));
    }

    #[tokio::test]
    async fn test_delivered_email_survives_log_failure() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let mailer = RecordingMailer::new();
        let email = OutgoingEmail {
            to: "boss@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
        };

        let message_id = send_and_log(
            &store,
            &mailer,
            &smtp_settings("smtp.example.com"),
            &email,
            Some("u1"),
            None,
        )
        .await
        .unwrap();
        assert_eq!(message_id, "msg-1");
        assert_eq!(mailer.sent().await.len(), 1);
        assert_eq!(store.count(Collection::SentEmails).await, 0);
    }

    #[tokio::test]
    async fn test_failed_send_with_log_failure_is_still_delivery_error() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let mailer = RecordingMailer::failing();
        let email = OutgoingEmail {
            to: "boss@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
        };

        let result = send_and_log(
            &store,
            &mailer,
            &smtp_settings("smtp.example.com"),
            &email,
            None,
            None,
        )
        .await;
        assert!(matches!(result, Err(AppError::Delivery(_))));
    }

    #[tokio::test]
    async fn test_http_mailer_without_endpoint() {
        let mailer = HttpMailer::new(None).unwrap();
        let email = OutgoingEmail {
            to: "a@b.co".into(),
            subject: "s".into(),
            html: String::new(),
        };
        let err = mailer
            .send(&smtp_settings("smtp.example.com"), &email)
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
