use anyhow::{bail, Context, Result};

use crate::relay::email::EmailSettings;

pub const DEFAULT_PUSH_API_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub port: u16,
    pub rust_log: String,
    pub mail_api_url: Option<String>,
    /// Fallback mail credentials used when no `settings/email` document exists.
    pub smtp: Option<EmailSettings>,
    pub push_api_url: String,
    pub push_access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = match optional_env("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => optional_env("DATABASE_URL"),
        };

        Ok(Config {
            store_backend,
            database_url,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_issuer: optional_env("JWT_ISSUER").unwrap_or_else(|| "jobboard-auth".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            mail_api_url: optional_env("MAIL_API_URL"),
            smtp: smtp_from_env()?,
            push_api_url: optional_env("PUSH_API_URL")
                .unwrap_or_else(|| DEFAULT_PUSH_API_URL.to_string()),
            push_access_token: optional_env("PUSH_ACCESS_TOKEN"),
        })
    }
}

/// Reads `SMTP_*` credentials. All of host, user and pass must be present
/// for the fallback to be usable.
fn smtp_from_env() -> Result<Option<EmailSettings>> {
    let (Some(host), Some(user), Some(pass)) = (
        optional_env("SMTP_HOST"),
        optional_env("SMTP_USER"),
        optional_env("SMTP_PASS"),
    ) else {
        return Ok(None);
    };
    let port = match optional_env("SMTP_PORT") {
        Some(p) => p.parse::<u16>().context("SMTP_PORT must be a valid port number")?,
        None => 587,
    };
    let from = optional_env("SMTP_FROM").unwrap_or_else(|| user.clone());
    Ok(Some(EmailSettings {
        host,
        port,
        user,
        pass,
        from,
    }))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
