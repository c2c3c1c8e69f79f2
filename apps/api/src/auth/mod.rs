pub mod jwt;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub use jwt::{Claims, JwtService};

use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated identity behind a request.
/// Passed explicitly into every service operation that needs one.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_admin: bool,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            photo_url: claims.picture,
            is_admin: claims.admin,
        }
    }
}

/// Verifies the bearer token, if any, and stores the `Principal` in request extensions.
/// Requests without a valid token continue unauthenticated.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_principal(request.headers(), &state.jwt) {
        Some(principal) => {
            debug!("Authenticated principal {}", principal.uid);
            request.extensions_mut().insert(principal);
        }
        None => debug!("No valid authentication token"),
    }
    next.run(request).await
}

/// Accepts both `Bearer <token>` and a raw token.
fn extract_principal(headers: &axum::http::HeaderMap, jwt: &JwtService) -> Option<Principal> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);
    jwt.verify_token(token).ok().map(Principal::from)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
