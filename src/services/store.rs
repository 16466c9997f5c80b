//! StoreService — shared state and file-storage primitives for the
//! content-and-library backend. Durable metadata lives in SQLite; content
//! and layout-image payloads live on local disk beneath `base_path`
//! (`contents/` for content files, `images/{logos,banners,libversions}/`
//! for layout images by group).
//!
//! The CRUD surfaces are split across sibling modules (`content_service`,
//! `catalog_service`, `library_service`) as further `impl StoreService`
//! blocks; this module owns the pieces they all share.

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use serde::Serialize;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;
use uuid::Uuid;

const MAX_FILE_NAME_LEN: usize = 300;
const HASH_BUF_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content {0} not found")]
    ContentNotFound(i64),
    #[error("metadata {0} not found")]
    MetadataNotFound(i64),
    #[error("metadata type {0} not found")]
    MetadataTypeNotFound(i64),
    #[error("library image {0} not found")]
    ImageNotFound(i64),
    #[error("library version {0} not found")]
    VersionNotFound(i64),
    #[error("library folder {0} not found")]
    FolderNotFound(i64),
    #[error("stored file `{0}` not found")]
    StoredFileMissing(String),
    #[error("file `{0}` already exists")]
    FileAlreadyExists(String),
    #[error("invalid file name")]
    InvalidFileName,
    #[error("image group `{0}` is not recognized")]
    InvalidImageGroup(i64),
    #[error("duplicate {field}: `{value}`")]
    Duplicate { field: &'static str, value: String },
    #[error("unknown {0} reference")]
    UnknownReference(&'static str),
    #[error("malformed metadata token `{0}`, expected `Type:Name`")]
    MalformedMetadataToken(String),
    #[error("folder {0} cannot become its own ancestor")]
    FolderCycle(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Attributes of a stored file, reported after upload and re-derived when
/// a content record binds the file.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub file_name: String,
    pub size: i64,
    pub hash: String,
}

/// Shared service state carried by every handler.
///
/// Holds the SQLite pool for metadata and the root directory for payloads.
/// Cloning is cheap; all fields are shared handles.
#[derive(Clone)]
pub struct StoreService {
    /// Shared SQLite connection pool used for all metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payload files are stored.
    pub base_path: PathBuf,
}

impl StoreService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Basic file-name validation to avoid trivial path traversal vectors.
    ///
    /// Stored names are single path segments: no separators, no `..`, no
    /// control characters.
    pub(crate) fn ensure_file_name_safe(&self, name: &str) -> StoreResult<()> {
        if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
            return Err(StoreError::InvalidFileName);
        }
        if name == "." || name == ".." {
            return Err(StoreError::InvalidFileName);
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidFileName);
        }
        Ok(())
    }

    /// Path of a content file beneath `contents/`.
    pub(crate) fn content_file_path(&self, file_name: &str) -> PathBuf {
        self.base_path.join("contents").join(file_name)
    }

    /// Stream a payload to `final_path` and return its size and MD5.
    ///
    /// Writes incrementally to a temporary sibling, computing hash and size
    /// while streaming, then fsyncs and atomically renames into place.
    /// Temp files are cleaned up on every error path.
    pub(crate) async fn write_stream_to<S>(
        &self,
        final_path: &PathBuf,
        stream: S,
    ) -> StoreResult<(i64, String)>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let parent = final_path
            .parent()
            .map(std::path::Path::to_path_buf)
            .ok_or_else(|| {
                StoreError::Io(io::Error::other("payload path missing parent directory"))
            })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        Ok((size, format!("{:x}", digest.compute())))
    }

    /// Stream-upload a content file to `contents/{file_name}`.
    ///
    /// Rejects names that already exist: stored files are unique by name.
    pub async fn upload_content_file<S>(
        &self,
        file_name: &str,
        stream: S,
    ) -> StoreResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.ensure_file_name_safe(file_name)?;
        let path = self.content_file_path(file_name);
        if fs::try_exists(&path).await? {
            return Err(StoreError::FileAlreadyExists(file_name.to_string()));
        }

        let (size, hash) = self.write_stream_to(&path, stream).await?;
        debug!("stored content file {} ({} bytes)", file_name, size);

        Ok(StoredFile {
            file_name: file_name.to_string(),
            size,
            hash,
        })
    }

    /// Open a stored content file for streaming out, with its size.
    pub async fn content_file_reader(&self, file_name: &str) -> StoreResult<(File, i64)> {
        self.ensure_file_name_safe(file_name)?;
        let path = self.content_file_path(file_name);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::StoredFileMissing(file_name.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;
        let size = file.metadata().await?.len() as i64;
        Ok((file, size))
    }

    /// Re-derive size and hash of a stored content file at assignment time.
    ///
    /// Used when a content record binds (or re-binds) its file. Returns
    /// `StoredFileMissing` if the referenced file was never uploaded.
    pub(crate) async fn stat_content_file(&self, file_name: &str) -> StoreResult<StoredFile> {
        self.ensure_file_name_safe(file_name)?;
        let path = self.content_file_path(file_name);
        let mut file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::StoredFileMissing(file_name.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        let mut size: i64 = 0;
        let mut digest = Context::new();
        let mut buf = vec![0u8; HASH_BUF_SIZE];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            size += read as i64;
            digest.consume(&buf[..read]);
        }

        Ok(StoredFile {
            file_name: file_name.to_string(),
            size,
            hash: format!("{:x}", digest.compute()),
        })
    }

    /// Best-effort removal of a payload file; missing files are fine.
    pub(crate) async fn remove_payload(&self, path: &PathBuf) {
        match fs::remove_file(path).await {
            Ok(_) => debug!("removed payload file {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload file {} already missing", path.display());
            }
            Err(err) => debug!("failed to remove payload {}: {}", path.display(), err),
        }
    }
}

/// Return the violated column (e.g. `contents.title`) if the SQLx error is
/// a unique constraint violation.
pub(crate) fn unique_violation_column(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = err {
        let message = db_err.message();
        if let Some(rest) = message.strip_prefix("UNIQUE constraint failed: ") {
            return Some(rest.split(',').next().unwrap_or(rest).trim().to_string());
        }
        if message.to_ascii_lowercase().contains("unique") {
            return Some(String::new());
        }
    }
    None
}

/// Return true if the SQLx error indicates a foreign-key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.message().to_ascii_lowercase().contains("foreign key")
    )
}
