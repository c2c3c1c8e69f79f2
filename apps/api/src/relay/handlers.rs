use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::applications::validation::is_valid_email;
use crate::auth::Principal;
use crate::errors::{AppError, FieldErrors};
use crate::relay::email::{
    render_application_email, resolve_settings, save_settings, send_and_log,
    ApplicationEmailData, EmailSettings, OutgoingEmail,
};
use crate::relay::push::{notify_user, PushOutcome};
use crate::state::AppState;
use crate::users::profile::require_admin;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub application_data: Option<ApplicationEmailData>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    pub message_id: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyOwnerRequest {
    pub owner_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct NotifyOwnerResponse {
    pub success: bool,
    pub outcome: PushOutcome,
}

/// Uses `html` when given, otherwise renders from `applicationData`.
fn build_email(req: SendEmailRequest) -> Result<(OutgoingEmail, Option<String>), AppError> {
    let mut errors = FieldErrors::new();
    if !is_valid_email(&req.to) {
        errors.insert("to".into(), "Recipient must be a valid email address".into());
    }
    if req.subject.trim().is_empty() {
        errors.insert("subject".into(), "Subject is required".into());
    }

    let html = match (req.html, &req.application_data) {
        (Some(html), _) if !html.trim().is_empty() => Some(html),
        (_, Some(data)) => Some(render_application_email(data, req.resume_url.as_deref())),
        _ => None,
    };
    if html.is_none() {
        errors.insert(
            "html".into(),
            "Either html or applicationData is required".into(),
        );
    }

    match html {
        Some(html) if errors.is_empty() => Ok((
            OutgoingEmail {
                to: req.to.trim().to_string(),
                subject: req.subject,
                html,
            },
            req.application_data.and_then(|d| d.application_id),
        )),
        _ => Err(AppError::InvalidFields(errors)),
    }
}

async fn relay_application_email(
    state: &AppState,
    req: SendEmailRequest,
    sent_by: Option<&str>,
) -> Result<SendEmailResponse, AppError> {
    let (email, application_id) = build_email(req)?;
    let settings = resolve_settings(state.store.as_ref(), state.config.smtp.as_ref()).await?;
    let message_id = send_and_log(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &settings,
        &email,
        sent_by,
        application_id.as_deref(),
    )
    .await?;
    Ok(SendEmailResponse {
        success: true,
        message_id,
    })
}

/// POST /api/v1/relay/send-application-email
pub async fn handle_send_application_email(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, AppError> {
    Ok(Json(
        relay_application_email(&state, req, Some(&principal.uid)).await?,
    ))
}

/// POST /api/v1/relay/send-application-email-http
/// Unauthenticated variant.
pub async fn handle_send_application_email_http(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<Json<SendEmailResponse>, AppError> {
    Ok(Json(relay_application_email(&state, req, None).await?))
}

/// POST /api/v1/relay/email-settings
pub async fn handle_create_email_settings(
    State(state): State<AppState>,
    principal: Principal,
    Json(settings): Json<EmailSettings>,
) -> Result<Json<SuccessResponse>, AppError> {
    require_admin(state.store.as_ref(), &principal).await?;

    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("host", &settings.host),
        ("user", &settings.user),
        ("pass", &settings.pass),
    ] {
        if value.trim().is_empty() {
            errors.insert(field.to_string(), format!("{field} is required"));
        }
    }
    if !is_valid_email(&settings.from) {
        errors.insert("from".into(), "Sender must be a valid email address".into());
    }
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    save_settings(state.store.as_ref(), settings, &principal.uid).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/v1/relay/test-email
/// Sends a canned message to the caller's own address.
pub async fn handle_test_email(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<SendEmailResponse>, AppError> {
    let settings = resolve_settings(state.store.as_ref(), state.config.smtp.as_ref()).await?;
    let email = OutgoingEmail {
        to: principal.email.clone(),
        subject: "Job board test email".to_string(),
        html: "<p>Your email settings are working.</p>".to_string(),
    };
    let message_id = send_and_log(
        state.store.as_ref(),
        state.mailer.as_ref(),
        &settings,
        &email,
        Some(&principal.uid),
        None,
    )
    .await?;
    Ok(Json(SendEmailResponse {
        success: true,
        message_id,
    }))
}

/// POST /api/v1/relay/notify-owner
pub async fn handle_notify_owner(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<NotifyOwnerRequest>,
) -> Result<Json<NotifyOwnerResponse>, AppError> {
    if req.owner_id.trim().is_empty() || req.title.trim().is_empty() {
        return Err(AppError::Validation("ownerId and title are required".into()));
    }
    tracing::debug!("Push relay to {} requested by {}", req.owner_id, principal.uid);

    let outcome = notify_user(
        state.store.as_ref(),
        state.push.as_ref(),
        &req.owner_id,
        &req.title,
        &req.body,
        req.data,
    )
    .await?;
    Ok(Json(NotifyOwnerResponse {
        success: outcome == PushOutcome::Sent,
        outcome,
    }))
}
