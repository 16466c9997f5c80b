use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::setup_store;
use crate::routes::routes::routes;
use crate::services::catalog_service::{MetadataCreate, MetadataTypeUpsert};
use crate::services::store::StoreService;

async fn setup_app() -> (Router, StoreService, tempfile::TempDir) {
    let (service, dir) = setup_store().await;
    let app = routes().with_state(service.clone());
    (app, service, dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_returns_ok() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_reports_database_and_storage_checks() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["database"]["ok"], json!(true));
    assert_eq!(body["storage"]["ok"], json!(true));
}

#[tokio::test]
async fn non_integer_build_version_id_is_a_client_error() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/library/builds/not-a-number")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_build_version_is_not_found() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/library/builds/99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_content_listing_wraps_the_page_envelope() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(Request::builder().uri("/contents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["total_count"], json!(0));
    assert_eq!(body["page"], json!(1));
}

#[tokio::test]
async fn metadata_key_dispatches_by_id_or_type_name() {
    let (app, service, _dir) = setup_app().await;
    let t = service
        .create_metadata_type(MetadataTypeUpsert {
            name: "Language".into(),
        })
        .await
        .unwrap();
    let entry = service
        .create_metadata(MetadataCreate {
            name: "English".into(),
            type_id: t.id,
        })
        .await
        .unwrap();

    // Integer key: detail lookup.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/metadata/{}", entry.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], json!("English"));
    assert_eq!(body["type_name"], json!("Language"));

    // Non-integer key: by-type listing.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metadata/Language")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_count"], json!(1));
    assert_eq!(body["data"][0]["name"], json!("English"));
}

#[tokio::test]
async fn file_upload_then_content_create_round_trip() {
    let (app, _service, _dir) = setup_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/files/contents/report.pdf")
                .body(Body::from("pdf bytes"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = body_json(response).await;
    assert_eq!(stored["file_name"], json!("report.pdf"));
    assert_eq!(stored["size"], json!(9));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/contents")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"file_name": "report.pdf", "title": "Report"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let content = body_json(response).await;
    assert_eq!(content["title"], json!("Report"));
    assert_eq!(content["filesize"], json!(9));

    // And the payload streams back out.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/contents/report.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"pdf bytes");
}

#[tokio::test]
async fn unknown_content_detail_is_not_found() {
    let (app, _service, _dir) = setup_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/contents/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!(404));
}
