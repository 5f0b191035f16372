use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use growthwatch_auth::SessionStore;

use crate::app::errors::ServiceError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<dyn SessionStore>,
}

/// Resolves the bearer token to a principal before any handler runs.
///
/// Missing, invalid or expired tokens, and tokens naming a deleted manager,
/// all yield 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(_) => return ServiceError::Unauthenticated.into_response(),
    };

    let principal = match state.sessions.resolve_principal(token).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return ServiceError::Unauthenticated.into_response(),
        Err(e) => return ServiceError::from(e).into_response(),
    };

    tracing::Span::current().record("principal_id", tracing::field::display(principal.id));
    req.extensions_mut().insert(PrincipalContext::new(principal));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
