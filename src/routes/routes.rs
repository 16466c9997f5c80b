//! Defines routes for all content, catalog, and library-tree operations.
//!
//! ## Structure
//! - **Content records**
//!   - `GET    /contents` — filtered, paginated listing
//!   - `POST   /contents` — create a record over an uploaded file
//!   - `POST   /contents/sheet` — bulk sheet import
//!   - `GET/PUT/DELETE /contents/{id}`
//!
//! - **Content files**
//!   - `PUT    /files/contents/{file_name}` — stream-upload
//!   - `GET    /files/contents/{file_name}` — stream-download
//!
//! - **Metadata catalog**
//!   - `GET/POST /metadata-types`, `GET/PUT/DELETE /metadata-types/{id}`
//!   - `GET/POST /metadata`
//!   - `GET /metadata/{key}` — id detail, or by-type listing for a name
//!   - `PUT/DELETE /metadata/{id}`
//!
//! - **Library tree**
//!   - `PUT /library/images/{group}/{file_name}` — upload by group code
//!   - `GET /library/images`, `GET/DELETE /library/images/{id}`
//!   - CRUD under `/library/versions` and `/library/folders`
//!   - `GET /library/builds/{version_id}` — assembled folder tree

use crate::{
    handlers::{
        content_handlers::{
            create_content, delete_content, download_content_file, get_content, import_sheet,
            list_contents, update_content, upload_content_file,
        },
        health_handlers::{healthz, readyz},
        library_handlers::{
            build_library, create_folder, create_version, delete_folder, delete_layout_image,
            delete_version, get_folder, get_layout_image, get_version, list_folders,
            list_layout_images, list_versions, update_folder, update_version,
            upload_layout_image,
        },
        metadata_handlers::{
            create_metadata, create_metadata_type, delete_metadata, delete_metadata_type,
            get_metadata_or_by_type, get_metadata_type, list_metadata, list_metadata_types,
            update_metadata, update_metadata_type,
        },
    },
    services::store::StoreService,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build and return the router for the whole API surface.
///
/// The router carries shared state (`StoreService`) to all handlers.
pub fn routes() -> Router<StoreService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // content records
        .route("/contents", get(list_contents).post(create_content))
        .route("/contents/sheet", post(import_sheet))
        .route(
            "/contents/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        // content files
        .route(
            "/files/contents/{file_name}",
            put(upload_content_file).get(download_content_file),
        )
        // metadata catalog
        .route(
            "/metadata-types",
            get(list_metadata_types).post(create_metadata_type),
        )
        .route(
            "/metadata-types/{id}",
            get(get_metadata_type)
                .put(update_metadata_type)
                .delete(delete_metadata_type),
        )
        .route("/metadata", get(list_metadata).post(create_metadata))
        .route(
            "/metadata/{key}",
            get(get_metadata_or_by_type)
                .put(update_metadata)
                .delete(delete_metadata),
        )
        // library tree
        .route("/library/images", get(list_layout_images))
        .route(
            "/library/images/{group}/{file_name}",
            put(upload_layout_image),
        )
        .route(
            "/library/images/{id}",
            get(get_layout_image).delete(delete_layout_image),
        )
        .route("/library/versions", get(list_versions).post(create_version))
        .route(
            "/library/versions/{id}",
            get(get_version).put(update_version).delete(delete_version),
        )
        .route("/library/folders", get(list_folders).post(create_folder))
        .route(
            "/library/folders/{id}",
            get(get_folder).put(update_folder).delete(delete_folder),
        )
        .route("/library/builds/{version_id}", get(build_library))
}
