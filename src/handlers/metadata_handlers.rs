//! HTTP handlers for the metadata catalog: types and entries.

use crate::{
    errors::AppError,
    pagination::PageParams,
    services::{
        catalog_service::{MetadataCreate, MetadataTypeUpsert, MetadataUpdate},
        store::StoreService,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET `/metadata-types`
pub async fn list_metadata_types(
    State(service): State<StoreService>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = service.list_metadata_types(&params).await?;
    Ok(Json(page))
}

/// POST `/metadata-types`
pub async fn create_metadata_type(
    State(service): State<StoreService>,
    Json(payload): Json<MetadataTypeUpsert>,
) -> Result<impl IntoResponse, AppError> {
    let created = service.create_metadata_type(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET `/metadata-types/{id}`
pub async fn get_metadata_type(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_metadata_type(id).await?))
}

/// PUT `/metadata-types/{id}`
pub async fn update_metadata_type(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
    Json(payload): Json<MetadataTypeUpsert>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.update_metadata_type(id, payload).await?))
}

/// DELETE `/metadata-types/{id}`
pub async fn delete_metadata_type(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_metadata_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/metadata`
pub async fn list_metadata(
    State(service): State<StoreService>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = service.list_metadata(&params).await?;
    Ok(Json(page))
}

/// POST `/metadata`
pub async fn create_metadata(
    State(service): State<StoreService>,
    Json(payload): Json<MetadataCreate>,
) -> Result<impl IntoResponse, AppError> {
    let created = service.create_metadata(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET `/metadata/{key}` — detail lookup when `key` is an integer id,
/// otherwise the paginated listing of all entries under that type name
/// (case-sensitive exact match).
pub async fn get_metadata_or_by_type(
    State(service): State<StoreService>,
    Path(key): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, AppError> {
    if let Ok(id) = key.parse::<i64>() {
        let entry = service.get_metadata(id).await?;
        return Ok(Json(entry).into_response());
    }

    let page = service.metadata_by_type_name(&key, &params).await?;
    Ok(Json(page).into_response())
}

/// PUT `/metadata/{id}`
pub async fn update_metadata(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
    Json(payload): Json<MetadataUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.update_metadata(id, payload).await?))
}

/// DELETE `/metadata/{id}`
pub async fn delete_metadata(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_metadata(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
