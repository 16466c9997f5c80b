//! HTTP handlers for content records, content files, and the sheet import.
//! Bodies stream through to avoid buffering uploads in memory; everything
//! else delegates to `StoreService`.

use crate::{
    errors::AppError,
    pagination::PageParams,
    services::{
        content_service::{ContentCreate, ContentUpdate, SheetPayload},
        filters::{ContentFilterQuery, ContentFilters},
        store::StoreService,
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::io;
use tokio_util::io::ReaderStream;

/// Query params accepted by `GET /contents`: the six recognized filters
/// plus pagination. Unknown parameters are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ContentListQuery {
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub copyright: Option<String>,
    pub active: Option<String>,
    pub metadata: Option<String>,
    pub published_date: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET `/contents` — filtered, paginated listing.
pub async fn list_contents(
    State(service): State<StoreService>,
    Query(q): Query<ContentListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filters = ContentFilters::parse(&ContentFilterQuery {
        title: q.title,
        file_name: q.file_name,
        copyright: q.copyright,
        active: q.active,
        metadata: q.metadata,
        published_date: q.published_date,
    });
    let params = PageParams {
        page: q.page,
        page_size: q.page_size,
    };

    let page = service.list_contents(&filters, &params).await?;
    Ok(Json(page))
}

/// POST `/contents` — create a record over an uploaded file.
pub async fn create_content(
    State(service): State<StoreService>,
    Json(payload): Json<ContentCreate>,
) -> Result<impl IntoResponse, AppError> {
    let content = service.create_content(payload).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

/// GET `/contents/{id}`
pub async fn get_content(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let content = service.get_content(id).await?;
    Ok(Json(content))
}

/// PUT `/contents/{id}`
pub async fn update_content(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
    Json(payload): Json<ContentUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let content = service.update_content(id, payload).await?;
    Ok(Json(content))
}

/// DELETE `/contents/{id}`
pub async fn delete_content(
    State(service): State<StoreService>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_content(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/contents/sheet` — bulk import, one transaction per row.
pub async fn import_sheet(
    State(service): State<StoreService>,
    Json(payload): Json<SheetPayload>,
) -> Result<impl IntoResponse, AppError> {
    let result = service.import_sheet(payload).await?;
    Ok(Json(result))
}

/// PUT `/files/contents/{file_name}` — stream-upload a content file.
pub async fn upload_content_file(
    State(service): State<StoreService>,
    Path(file_name): Path<String>,
    body: Body,
) -> Result<impl IntoResponse, AppError> {
    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let stored = service.upload_content_file(&file_name, stream).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET `/files/contents/{file_name}` — stream a content file back.
pub async fn download_content_file(
    State(service): State<StoreService>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let (file, size) = service.content_file_reader(&file_name).await?;
    let stream = ReaderStream::new(file);

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&size.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    Ok(response)
}
