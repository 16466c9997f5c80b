//! HTTP handlers for the library tree: layout images, versions, folders,
//! and the build endpoint.

use crate::{
    errors::AppError,
    pagination::PageParams,
    services::{
        library_service::{FolderCreate, FolderUpdate, VersionCreate, VersionUpdate},
        store::StoreService,
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use std::io;

/// PUT `/library/images/{group}/{file_name}` — stream-upload a layout
/// image under the group's sub-path. A non-integer group is rejected by
/// the extractor; an unmapped one by the service.
pub async fn upload_layout_image(
    State(service): State<StoreService>,
    Path((group, file_name)): Path<(i64, String)>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let image = service
        .upload_layout_image(group, &file_name, stream)
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// GET `/library/images`
pub async fn list_layout_images(
    State(service): State<StoreService>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.list_layout_images(&params).await?))
}

/// GET `/library/images/{id}`
pub async fn get_layout_image(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_layout_image(id).await?))
}

/// DELETE `/library/images/{id}` — referencing folders and versions keep
/// existing with the image reference cleared.
pub async fn delete_layout_image(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_layout_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/library/versions`
pub async fn list_versions(
    State(service): State<StoreService>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.list_versions(&params).await?))
}

/// POST `/library/versions`
pub async fn create_version(
    State(service): State<StoreService>,
    Json(payload): Json<VersionCreate>,
) -> Result<impl IntoResponse, AppError> {
    let version = service.create_version(payload).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET `/library/versions/{id}`
pub async fn get_version(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_version(id).await?))
}

/// PUT `/library/versions/{id}`
pub async fn update_version(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
    Json(payload): Json<VersionUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.update_version(id, payload).await?))
}

/// DELETE `/library/versions/{id}` — cascades deletion of the version's
/// folder tree.
pub async fn delete_version(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_version(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/library/folders`
pub async fn list_folders(
    State(service): State<StoreService>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.list_folders(&params).await?))
}

/// POST `/library/folders`
pub async fn create_folder(
    State(service): State<StoreService>,
    Json(payload): Json<FolderCreate>,
) -> Result<impl IntoResponse, AppError> {
    let folder = service.create_folder(payload).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// GET `/library/folders/{id}`
pub async fn get_folder(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.get_folder(id).await?))
}

/// PUT `/library/folders/{id}` — reparenting onto the folder itself or a
/// descendant is rejected.
pub async fn update_folder(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
    Json(payload): Json<FolderUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.update_folder(id, payload).await?))
}

/// DELETE `/library/folders/{id}` — cascades deletion of subfolders.
pub async fn delete_folder(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_folder(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/library/builds/{version_id}` — assemble the folder tree for a
/// version. A non-integer id is a client error from the extractor; an
/// unknown one is a 404.
pub async fn build_library(
    State(service): State<StoreService>,
    Path(version_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(service.build_library(version_id).await?))
}
