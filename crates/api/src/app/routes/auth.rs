use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
};

use crate::app::dto::{self, LoginRequest, MeResponse, RegisterRequest, SessionResponse};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// POST /auth/register - self-service registration as a manager
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), ServiceError> {
    let body = dto::body(payload)?;
    let session = services
        .register(&body.username, &body.password, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ServiceError> {
    let body = dto::body(payload)?;
    Ok(Json(services.login(&body.username, &body.password).await?))
}

/// GET /auth/me - current principal and what its role may do
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Json<MeResponse> {
    Json(services.me(principal.principal()))
}
