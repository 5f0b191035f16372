use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use growthwatch_auth::Manager;
use growthwatch_core::ManagerId;

use crate::app::dto::{self, UpdateManagerRequest};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_managers))
        .route(
            "/:id",
            get(get_manager).patch(update_manager).delete(delete_manager),
        )
        .route("/supervisor/:supervisor_id", get(list_subordinates))
}

pub async fn list_managers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Value>, ServiceError> {
    let items = services.list_managers(principal.principal()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn get_manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Manager>, ServiceError> {
    let id: ManagerId = dto::parse_id(&id)?;
    Ok(Json(services.get_manager(principal.principal(), id).await?))
}

pub async fn list_subordinates(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(supervisor_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let supervisor_id: ManagerId = dto::parse_id(&supervisor_id)?;
    let items = services
        .list_subordinates(principal.principal(), supervisor_id)
        .await?;
    Ok(Json(json!({ "items": items })))
}

/// PATCH /managers/:id - fields the caller may not change are dropped
pub async fn update_manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateManagerRequest>, JsonRejection>,
) -> Result<Json<Manager>, ServiceError> {
    let id: ManagerId = dto::parse_id(&id)?;
    let body = dto::body(payload)?;
    let updated = services
        .update_manager(principal.principal(), id, body.into())
        .await?;
    Ok(Json(updated))
}

pub async fn delete_manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id: ManagerId = dto::parse_id(&id)?;
    services.delete_manager(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
