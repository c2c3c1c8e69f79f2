//! Shared fixtures for unit and router tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::applications::validation::ApplicationForm;
use crate::auth::{JwtService, Principal};
use crate::config::{Config, StoreBackend, DEFAULT_PUSH_API_URL};
use crate::jobs::service::JobInput;
use crate::models::{NotificationPreferences, UserProfile};
use crate::relay::email::{EmailSettings, MailError, Mailer, OutgoingEmail};
use crate::relay::push::{PushMessage, PushSender};
use crate::state::AppState;
use crate::store::MemoryStore;

pub const TEST_SECRET: &str = "test_secret";
pub const TEST_ISSUER: &str = "test_issuer";

pub fn principal(uid: &str) -> Principal {
    Principal {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        display_name: None,
        photo_url: None,
        is_admin: false,
    }
}

pub fn admin(uid: &str) -> Principal {
    Principal {
        is_admin: true,
        ..principal(uid)
    }
}

pub fn job_input(title: &str) -> JobInput {
    JobInput {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Remote".to_string(),
        salary: "$100k".to_string(),
        description: "Write reliable services".to_string(),
        job_type: "full-time".to_string(),
        category: "engineering".to_string(),
    }
}

pub fn application_form() -> ApplicationForm {
    ApplicationForm {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "5550102030".to_string(),
        experience: "Five years".to_string(),
        cover_letter: "I would love to join.".to_string(),
        resume_url: "https://files.example.com/ada.pdf".to_string(),
    }
}

pub fn profile(uid: &str) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        display_name: None,
        photo_url: None,
        user_type: None,
        profile_complete: false,
        notification_preferences: NotificationPreferences::default(),
        push_token: None,
        is_admin: false,
        created_at: now,
        last_login_at: now,
    }
}

pub fn smtp_settings(host: &str) -> EmailSettings {
    EmailSettings {
        host: host.to_string(),
        port: 587,
        user: "mailer".to_string(),
        pass: "secret".to_string(),
        from: "jobs@example.com".to_string(),
    }
}

/// Mailer that records messages instead of sending them.
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        _settings: &EmailSettings,
        email: &OutgoingEmail,
    ) -> Result<String, MailError> {
        if self.fail {
            return Err(MailError::Rejected {
                status: 500,
                message: "relay down".to_string(),
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push(email.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

/// Push sender that records messages instead of sending them.
pub struct RecordingPush {
    sent: Mutex<Vec<PushMessage>>,
    fail: bool,
}

impl RecordingPush {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub async fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("push service down");
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt_secret: TEST_SECRET.to_string(),
        jwt_issuer: TEST_ISSUER.to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        mail_api_url: None,
        smtp: None,
        push_api_url: DEFAULT_PUSH_API_URL.to_string(),
        push_access_token: None,
    }
}

/// An `AppState` over in-memory fakes, with handles kept for assertions.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub push: Arc<RecordingPush>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let push = Arc::new(RecordingPush::new());
        let state = AppState {
            store: store.clone(),
            jwt: JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()),
            mailer: mailer.clone(),
            push: push.clone(),
            config,
        };
        Self {
            state,
            store,
            mailer,
            push,
        }
    }

    pub fn token(&self, uid: &str, admin: bool) -> String {
        self.state
            .jwt
            .create_token(uid, &format!("{uid}@example.com"), admin)
            .unwrap()
    }
}
