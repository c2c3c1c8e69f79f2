pub mod health;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::auth::auth_middleware;
use crate::jobs::handlers as jobs;
use crate::notifications::handlers as notifications;
use crate::relay::handlers as relay;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/mine", get(jobs::handle_my_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:id/applications",
            get(applications::handle_job_applications).post(applications::handle_submit),
        )
        // Applications
        .route(
            "/api/v1/applications/mine",
            get(applications::handle_my_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application)
                .put(applications::handle_update_application)
                .delete(applications::handle_withdraw_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(applications::handle_change_status),
        )
        // Notification inbox
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list).delete(notifications::handle_delete_all),
        )
        .route(
            "/api/v1/notifications/unread-count",
            get(notifications::handle_unread_count),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id/read",
            patch(notifications::handle_mark_read),
        )
        .route(
            "/api/v1/notifications/:id",
            delete(notifications::handle_delete),
        )
        // Users
        .route("/api/v1/users/me/login", post(users::handle_login))
        .route(
            "/api/v1/users/me",
            get(users::handle_get_me).patch(users::handle_update_me),
        )
        .route(
            "/api/v1/admin/users/:uid/admin",
            post(users::handle_set_admin),
        )
        // Relay
        .route(
            "/api/v1/relay/send-application-email",
            post(relay::handle_send_application_email),
        )
        .route(
            "/api/v1/relay/send-application-email-http",
            post(relay::handle_send_application_email_http),
        )
        .route(
            "/api/v1/relay/email-settings",
            post(relay::handle_create_email_settings),
        )
        .route("/api/v1/relay/test-email", post(relay::handle_test_email))
        .route("/api/v1/relay/notify-owner", post(relay::handle_notify_owner))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
