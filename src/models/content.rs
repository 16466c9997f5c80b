//! Represents a managed content record bound to an uploaded file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::metadata::MetadataInfo;

/// A content item: a stored file plus descriptive and rights metadata.
///
/// The `Content` struct stores file-derived attributes (`file_name`,
/// `file_hash`, `filesize`), not the payload bytes. Both the file name and
/// the content hash are unique across all records, so two records can never
/// point at the same stored file or at byte-identical files.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Content {
    pub id: i64,

    /// Basename of the stored file under `contents/`.
    pub file_name: String,

    /// MD5 of the stored file, computed at assignment time.
    pub file_hash: String,

    /// Size in bytes of the stored file at assignment time.
    pub filesize: i64,

    /// Unique display title.
    pub title: String,

    pub description: Option<String>,

    /// Set when the record is created and refreshed on every update.
    pub modified_on: DateTime<Utc>,

    pub copyright: Option<String>,
    pub rights_statement: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub reviewed_on: Option<NaiveDate>,

    /// Inactive records stay listed unless filtered out by `active`.
    pub active: bool,
}

/// A content record together with its resolved tag set, as returned by
/// detail and list endpoints.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContentWithMetadata {
    #[serde(flatten)]
    pub record: Content,
    pub metadata: Vec<MetadataInfo>,
}

/// Reduced content view embedded in library build payloads.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ContentSummary {
    pub id: i64,
    pub title: String,
    pub file_name: String,
    pub filesize: i64,
    pub published_date: Option<NaiveDate>,
}
