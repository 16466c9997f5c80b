use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use library_store::models::library::ImageGroup;
use library_store::services::store::StoreService;
use library_store::{config, db, routes};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting library-store with config: {:?}", cfg);

    // --- Ensure storage layout exists ---
    let storage_root = Path::new(&cfg.storage_dir);
    fs::create_dir_all(storage_root.join("contents"))?;
    for group in [ImageGroup::Logo, ImageGroup::Banner, ImageGroup::Version] {
        fs::create_dir_all(storage_root.join(group.storage_prefix()))?;
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // Foreign keys must be on for every pooled connection; the cascade and
    // null-on-delete rules of the library tree depend on it.
    let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
        .create_if_missing(true)
        .foreign_keys(true);
    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?,
    );

    db::init_db(&db).await?;

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database schema applied.");
        return Ok(()); // exit after schema setup
    }

    // --- Initialize core service ---
    let store = StoreService::new(db.clone(), cfg.storage_dir.clone());

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(store);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
