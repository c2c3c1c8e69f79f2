use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::applications::submission::Submission;
use crate::models::Application;
use crate::relay::push::{notify_user, PushOutcome, PushSender};
use crate::state::AppState;
use crate::store::{DocumentStore, Record};

/// Pushes a "new application" alert to the job owner.
/// Never fails: delivery problems are logged and otherwise ignored.
pub async fn on_application_created(
    store: &dyn DocumentStore,
    push: &dyn PushSender,
    owner_id: &str,
    application: &Record<Application>,
) -> Option<PushOutcome> {
    let title = "New job application";
    let body = format!(
        "{} applied for {}",
        application.data.name, application.data.job_title
    );
    let data = json!({
        "type": "application",
        "applicationId": application.id,
        "jobId": application.data.job_id,
    });

    match notify_user(store, push, owner_id, title, &body, data).await {
        Ok(outcome) => {
            info!(
                "Application {} push to owner {owner_id}: {outcome:?}",
                application.id
            );
            Some(outcome)
        }
        Err(e) => {
            warn!(
                "Application {} push to owner {owner_id} failed: {e}",
                application.id
            );
            None
        }
    }
}

/// Runs `on_application_created` detached from the request.
pub fn spawn_on_application_created(state: &AppState, submission: &Submission) {
    let store: Arc<dyn DocumentStore> = state.store.clone();
    let push: Arc<dyn PushSender> = state.push.clone();
    let owner_id = submission.owner_id.clone();
    let application = submission.application.clone();

    tokio::spawn(async move {
        on_application_created(store.as_ref(), push.as_ref(), &owner_id, &application).await;
    });
}
