use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};

use growthwatch_core::{ChildId, GrowthRecord, GrowthRecordId};

use crate::app::dto::{self, CreateGrowthRecordRequest, UpdateGrowthRecordRequest};
use crate::app::errors::ServiceError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_growth_records).post(create_growth_record))
        .route(
            "/:id",
            get(get_growth_record)
                .patch(update_growth_record)
                .delete(delete_growth_record),
        )
        .route("/child/:child_id", get(list_growth_records_of_child))
}

pub async fn list_growth_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Value>, ServiceError> {
    let items = services.list_growth_records(principal.principal()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn list_growth_records_of_child(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(child_id): Path<String>,
) -> Result<Json<Value>, ServiceError> {
    let child_id: ChildId = dto::parse_id(&child_id)?;
    let items = services
        .list_growth_records_of_child(principal.principal(), child_id)
        .await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn get_growth_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<GrowthRecord>, ServiceError> {
    let id: GrowthRecordId = dto::parse_id(&id)?;
    Ok(Json(services.get_growth_record(principal.principal(), id).await?))
}

pub async fn create_growth_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<CreateGrowthRecordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GrowthRecord>), ServiceError> {
    let input = dto::body(payload)?.into();
    let record = services
        .create_growth_record(principal.principal(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_growth_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateGrowthRecordRequest>, JsonRejection>,
) -> Result<Json<GrowthRecord>, ServiceError> {
    let id: GrowthRecordId = dto::parse_id(&id)?;
    let changes = dto::body(payload)?.into();
    let record = services
        .update_growth_record(principal.principal(), id, changes)
        .await?;
    Ok(Json(record))
}

pub async fn delete_growth_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id: GrowthRecordId = dto::parse_id(&id)?;
    services.delete_growth_record(principal.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
