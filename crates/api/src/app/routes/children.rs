use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use growthwatch_core::{Child, ChildId, FamilyId};

use crate::app::dto::{self, CreateChildRequest};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Children have no update route.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_children).post(create_child))
        .route("/:id", get(get_child).delete(delete_child))
        .route("/family/:family_id", get(list_children_of_family))
}

pub async fn list_children(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Value>, ServiceError> {
    let items = services.list_children(principal.principal()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn list_children_of_family(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(family_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let family_id: FamilyId = dto::parse_id(&family_id)?;
    let items = services
        .list_children_of_family(principal.principal(), family_id)
        .await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn get_child(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Child>, ServiceError> {
    let id: ChildId = dto::parse_id(&id)?;
    Ok(Json(services.get_child(principal.principal(), id).await?))
}

pub async fn create_child(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CreateChildRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Child>), ServiceError> {
    let input = dto::body(payload)?.into();
    let child = services.create_child(principal.principal(), input).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn delete_child(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id: ChildId = dto::parse_id(&id)?;
    services.delete_child(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
