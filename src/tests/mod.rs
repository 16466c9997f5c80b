//! Service- and router-level tests over a temp-dir SQLite store.

mod api_tests;
mod library_tests;
mod sheet_tests;

use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io, sync::Arc};
use tempfile::TempDir;

use crate::db;
use crate::services::content_service::ContentCreate;
use crate::services::store::StoreService;

/// Fresh store over a temp directory: schema applied, foreign keys on.
/// The TempDir must stay alive for the duration of the test.
pub(crate) async fn setup_store() -> (StoreService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("contents")).unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("store.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    db::init_db(&pool).await.unwrap();

    let service = StoreService::new(Arc::new(pool), dir.path());
    (service, dir)
}

/// Single-chunk byte stream, matching what upload handlers feed in.
pub(crate) fn one_chunk(
    data: Vec<u8>,
) -> impl futures::Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures::stream::iter(vec![Ok(Bytes::from(data))])
}

pub(crate) async fn upload(service: &StoreService, file_name: &str, data: &[u8]) {
    service
        .upload_content_file(file_name, one_chunk(data.to_vec()))
        .await
        .unwrap();
}

/// Minimal create request; tests override fields as needed.
pub(crate) fn content_req(title: &str, file_name: &str) -> ContentCreate {
    ContentCreate {
        file_name: file_name.into(),
        title: title.into(),
        description: None,
        copyright: None,
        rights_statement: None,
        published_date: None,
        reviewed_on: None,
        active: None,
        metadata: None,
    }
}
