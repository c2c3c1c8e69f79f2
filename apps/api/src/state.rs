use std::sync::Arc;

use crate::auth::JwtService;
use crate::config::Config;
use crate::relay::email::Mailer;
use crate::relay::push::PushSender;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable document store. Default: PgDocumentStore.
    /// `STORE_BACKEND=memory` swaps in MemoryStore.
    pub store: Arc<dyn DocumentStore>,
    pub jwt: JwtService,
    pub mailer: Arc<dyn Mailer>,
    pub push: Arc<dyn PushSender>,
    pub config: Config,
}
