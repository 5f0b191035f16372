use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use growthwatch_core::{Family, FamilyId, ManagerId};

use crate::app::dto::{self, CreateFamilyRequest, UpdateFamilyRequest};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_families).post(create_family))
        .route(
            "/:id",
            get(get_family).patch(update_family).delete(delete_family),
        )
        .route("/manager/:manager_id", get(list_families_of_manager))
}

pub async fn list_families(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Value>, ServiceError> {
    let items = services.list_families(principal.principal()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn list_families_of_manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(manager_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let manager_id: ManagerId = dto::parse_id(&manager_id)?;
    let items = services
        .list_families_of_manager(principal.principal(), manager_id)
        .await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn get_family(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Family>, ServiceError> {
    let id: FamilyId = dto::parse_id(&id)?;
    Ok(Json(services.get_family(principal.principal(), id).await?))
}

pub async fn create_family(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CreateFamilyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Family>), ServiceError> {
    let (owner, input) = dto::body(payload)?.into_parts();
    let family = services
        .create_family(principal.principal(), owner, input)
        .await?;
    Ok((StatusCode::CREATED, Json(family)))
}

pub async fn update_family(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateFamilyRequest>, JsonRejection>,
) -> Result<Json<Family>, ServiceError> {
    let id: FamilyId = dto::parse_id(&id)?;
    let body = dto::body(payload).map(UpdateFamilyRequest::into_parts);
    let family = services
        .update_family(principal.principal(), id, body)
        .await?;
    Ok(Json(family))
}

pub async fn delete_family(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id: FamilyId = dto::parse_id(&id)?;
    services.delete_family(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
