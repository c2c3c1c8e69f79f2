use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::UserProfile;
use crate::store::{get_record, Collection, DocumentStore};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// What happened when a push to a user was requested.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Sent,
    /// The user has no profile or no registered push token.
    NoToken,
    /// The user turned push notifications off.
    Disabled,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
    sound: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    data: ExpoTicket,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Expo-compatible push client. No delivery receipts are fetched.
pub struct ExpoPushClient {
    client: Client,
    api_url: String,
    access_token: Option<String>,
}

impl ExpoPushClient {
    pub fn new(api_url: String, access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url,
            access_token,
        }
    }
}

#[async_trait]
impl PushSender for ExpoPushClient {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        let body = ExpoMessage {
            to: &message.to,
            title: &message.title,
            body: &message.body,
            data: &message.data,
            sound: "default",
        };

        let mut request = self.client.post(&self.api_url).json(&body);
        // Access token raises rate limits when present
        if let Some(token) = &self.access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!("Push send failed {}: {}", status, body);
            anyhow::bail!("Push API error {}: {}", status, body);
        }

        let ticket: ExpoResponse = response.json().await?;
        if ticket.data.status == "error" {
            anyhow::bail!(
                "Push ticket error: {}",
                ticket.data.message.unwrap_or_default()
            );
        }

        info!("Push notification sent");
        Ok(())
    }
}

/// Looks up the user's push token and preferences, then sends.
pub async fn notify_user(
    store: &dyn DocumentStore,
    push: &dyn PushSender,
    uid: &str,
    title: &str,
    body: &str,
    data: serde_json::Value,
) -> Result<PushOutcome, AppError> {
    let profile = get_record::<UserProfile>(store, Collection::Users, uid).await?;
    let Some(profile) = profile else {
        return Ok(PushOutcome::NoToken);
    };
    if !profile.data.notification_preferences.push {
        return Ok(PushOutcome::Disabled);
    }
    let Some(token) = profile.data.push_token.filter(|t| !t.is_empty()) else {
        return Ok(PushOutcome::NoToken);
    };

    let message = PushMessage {
        to: token,
        title: title.to_string(),
        body: body.to_string(),
        data,
    };
    if let Err(e) = push.send(&message).await {
        error!("Push to {uid} failed: {e}");
        return Err(AppError::Delivery(
            "Failed to send push notification".to_string(),
        ));
    }
    Ok(PushOutcome::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{set_record, MemoryStore};
    use crate::test_support::{profile, RecordingPush};
    use serde_json::json;

    #[tokio::test]
    async fn test_notify_user_outcomes() {
        let store = MemoryStore::new();
        let push = RecordingPush::new();

        let outcome = notify_user(&store, &push, "ghost", "t", "b", json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::NoToken);

        let mut owner = profile("owner");
        set_record(&store, Collection::Users, "owner", &owner).await.unwrap();
        let outcome = notify_user(&store, &push, "owner", "t", "b", json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::NoToken);

        owner.push_token = Some("ExponentPushToken[abc]".into());
        owner.notification_preferences.push = false;
        set_record(&store, Collection::Users, "owner", &owner).await.unwrap();
        let outcome = notify_user(&store, &push, "owner", "t", "b", json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Disabled);

        owner.notification_preferences.push = true;
        set_record(&store, Collection::Users, "owner", &owner).await.unwrap();
        let outcome = notify_user(&store, &push, "owner", "New", "Hello", json!({"k": 1}))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Sent);

        let sent = push.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ExponentPushToken[abc]");
        assert_eq!(sent[0].title, "New");
    }

    #[tokio::test]
    async fn test_notify_user_send_failure() {
        let store = MemoryStore::new();
        let mut owner = profile("owner");
        owner.push_token = Some("tok".into());
        set_record(&store, Collection::Users, "owner", &owner).await.unwrap();

        let push = RecordingPush::failing();
        match notify_user(&store, &push, "owner", "t", "b", json!({})).await {
            Err(AppError::Delivery(message)) => {
                assert!(!message.contains("push service down"));
            }
            other => panic!("expected Delivery, got {other:?}"),
        }
    }
}
