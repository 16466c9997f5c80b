//! Liveness and readiness probes.

use crate::services::store::StoreService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: CheckOutcome,
    storage: CheckOutcome,
}

#[derive(Serialize)]
struct CheckOutcome {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl CheckOutcome {
    fn pass() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    fn fail(detail: String) -> Self {
        Self {
            ok: false,
            detail: Some(detail),
        }
    }
}

/// `GET /healthz` — liveness only, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `GET /readyz` — readiness: the metadata database answers a trivial
/// query and the content storage directory accepts a write. 200 when both
/// hold, 503 otherwise, with per-check detail in the body.
pub async fn readyz(State(service): State<StoreService>) -> impl IntoResponse {
    let database = check_database(&service).await;
    let storage = check_storage(&service).await;

    let ready = database.ok && storage.ok;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "unavailable" },
        database,
        storage,
    };
    (status, Json(body))
}

async fn check_database(service: &StoreService) -> CheckOutcome {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*service.db)
        .await
    {
        Ok(1) => CheckOutcome::pass(),
        Ok(other) => CheckOutcome::fail(format!("unexpected probe result: {}", other)),
        Err(err) => CheckOutcome::fail(err.to_string()),
    }
}

/// Round-trip a probe file through `contents/`, the directory every
/// content upload lands in.
async fn check_storage(service: &StoreService) -> CheckOutcome {
    let probe = service
        .base_path
        .join("contents")
        .join(format!(".readyz-{}", Uuid::new_v4()));

    if let Err(err) = fs::write(&probe, b"readyz").await {
        return CheckOutcome::fail(format!("write failed: {}", err));
    }
    let outcome = match fs::read(&probe).await {
        Ok(bytes) if bytes == b"readyz" => CheckOutcome::pass(),
        Ok(_) => CheckOutcome::fail("probe file content mismatch".to_string()),
        Err(err) => CheckOutcome::fail(format!("read failed: {}", err)),
    };
    let _ = fs::remove_file(&probe).await;
    outcome
}
