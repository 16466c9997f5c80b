//! Content record operations: filtered listing, CRUD, and the sheet-driven
//! bulk import. All writes run in a transaction so a record never commits
//! with half of its tag links.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashMap;

use super::filters::ContentFilters;
use super::store::{
    StoreError, StoreResult, StoreService, StoredFile, is_foreign_key_violation,
    unique_violation_column,
};
use crate::models::content::{Content, ContentWithMetadata};
use crate::models::metadata::MetadataInfo;
use crate::pagination::{Page, PageParams};

const CONTENT_COLUMNS: &str = "id, file_name, file_hash, filesize, title, description, \
     modified_on, copyright, rights_statement, published_date, reviewed_on, active";

/// Request body for `POST /contents`. The referenced file must already be
/// uploaded; size and hash are derived from disk at assignment time.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentCreate {
    pub file_name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub rights_statement: Option<String>,
    #[serde(default)]
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub reviewed_on: Option<NaiveDate>,
    #[serde(default)]
    pub active: Option<bool>,
    /// Tag ids to associate.
    #[serde(default)]
    pub metadata: Option<Vec<i64>>,
}

/// Request body for `PUT /contents/{id}`. Absent fields keep their current
/// values; on the nullable fields the double option distinguishes "leave
/// as is" (missing) from "clear" (explicit null). A present `metadata`
/// list replaces the whole tag set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentUpdate {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub copyright: Option<Option<String>>,
    #[serde(default)]
    pub rights_statement: Option<Option<String>>,
    #[serde(default)]
    pub published_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub reviewed_on: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub metadata: Option<Vec<i64>>,
}

/// One row of a sheet import. Tags are referenced by `"Type:Name"` tokens
/// and created on demand.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetRow {
    pub title: String,
    pub file_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub rights_statement: Option<String>,
    #[serde(default)]
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub reviewed_on: Option<NaiveDate>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub metadata: Option<Vec<String>>,
}

/// Request body for `POST /contents/sheet`.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetPayload {
    pub rows: Vec<SheetRow>,
}

/// Per-batch summary returned by the sheet import.
#[derive(Debug, Clone, Serialize)]
pub struct SheetImportResult {
    pub created: usize,
    pub updated: usize,
    pub failed: Vec<SheetRowFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetRowFailure {
    pub row: usize,
    pub title: String,
    pub error: String,
}

#[derive(sqlx::FromRow)]
struct ContentMetadataRow {
    content_id: i64,
    id: i64,
    name: String,
    type_id: i64,
    type_name: String,
}

impl StoreService {
    /// List content records matching the conjunction of all supplied
    /// filters, ordered by primary key, one page at a time.
    pub async fn list_contents(
        &self,
        filters: &ContentFilters,
        params: &PageParams,
    ) -> StoreResult<Page<ContentWithMetadata>> {
        let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM contents");
        filters.apply(&mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM contents", CONTENT_COLUMNS));
        filters.apply(&mut builder);
        builder.push(" ORDER BY id ASC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let records: Vec<Content> = builder.build_query_as().fetch_all(&*self.db).await?;
        let mut tags = self
            .metadata_info_for_many(records.iter().map(|c| c.id).collect())
            .await?;
        let data = records
            .into_iter()
            .map(|record| {
                let metadata = tags.remove(&record.id).unwrap_or_default();
                ContentWithMetadata { record, metadata }
            })
            .collect();

        Ok(Page::new(data, params, total))
    }

    pub async fn get_content(&self, id: i64) -> StoreResult<ContentWithMetadata> {
        let record = self.get_content_record(id).await?;
        let metadata = self.metadata_info_for(id).await?;
        Ok(ContentWithMetadata { record, metadata })
    }

    async fn get_content_record(&self, id: i64) -> StoreResult<Content> {
        sqlx::query_as::<_, Content>(&format!(
            "SELECT {} FROM contents WHERE id = ?",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::ContentNotFound(id))
    }

    /// Create a content record bound to an already-uploaded file.
    ///
    /// Filesize and hash come from the stored file at this moment, not from
    /// the request. Duplicate title, file name, or file hash rejects the
    /// write.
    pub async fn create_content(&self, req: ContentCreate) -> StoreResult<ContentWithMetadata> {
        let stored = self.stat_content_file(&req.file_name).await?;

        let mut tx = self.db.begin().await?;
        let record = sqlx::query_as::<_, Content>(&format!(
            "INSERT INTO contents (file_name, file_hash, filesize, title, description, \
             modified_on, copyright, rights_statement, published_date, reviewed_on, active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(&stored.file_name)
        .bind(&stored.hash)
        .bind(stored.size)
        .bind(&req.title)
        .bind(&req.description)
        .bind(Utc::now())
        .bind(&req.copyright)
        .bind(&req.rights_statement)
        .bind(req.published_date)
        .bind(req.reviewed_on)
        .bind(req.active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| classify_content_write_error(err, &req.title, &stored))?;

        if let Some(ids) = &req.metadata {
            link_metadata(&mut tx, record.id, ids).await?;
        }
        tx.commit().await?;

        let metadata = self.metadata_info_for(record.id).await?;
        Ok(ContentWithMetadata { record, metadata })
    }

    /// Partial update. A present `file_name` re-binds the file and
    /// re-derives size and hash from disk.
    pub async fn update_content(
        &self,
        id: i64,
        req: ContentUpdate,
    ) -> StoreResult<ContentWithMetadata> {
        let existing = self.get_content_record(id).await?;

        let stored = match &req.file_name {
            Some(name) => self.stat_content_file(name).await?,
            None => StoredFile {
                file_name: existing.file_name.clone(),
                size: existing.filesize,
                hash: existing.file_hash.clone(),
            },
        };
        let title = req.title.unwrap_or(existing.title);

        let mut tx = self.db.begin().await?;
        let record = sqlx::query_as::<_, Content>(&format!(
            "UPDATE contents SET file_name = ?, file_hash = ?, filesize = ?, title = ?, \
             description = ?, modified_on = ?, copyright = ?, rights_statement = ?, \
             published_date = ?, reviewed_on = ?, active = ? WHERE id = ? RETURNING {}",
            CONTENT_COLUMNS
        ))
        .bind(&stored.file_name)
        .bind(&stored.hash)
        .bind(stored.size)
        .bind(&title)
        .bind(req.description.unwrap_or(existing.description))
        .bind(Utc::now())
        .bind(req.copyright.unwrap_or(existing.copyright))
        .bind(req.rights_statement.unwrap_or(existing.rights_statement))
        .bind(req.published_date.unwrap_or(existing.published_date))
        .bind(req.reviewed_on.unwrap_or(existing.reviewed_on))
        .bind(req.active.unwrap_or(existing.active))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| classify_content_write_error(err, &title, &stored))?;

        if let Some(ids) = &req.metadata {
            sqlx::query("DELETE FROM content_metadata WHERE content_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_metadata(&mut tx, id, ids).await?;
        }
        tx.commit().await?;

        let metadata = self.metadata_info_for(id).await?;
        Ok(ContentWithMetadata { record, metadata })
    }

    /// Delete a record and remove its stored file best-effort.
    pub async fn delete_content(&self, id: i64) -> StoreResult<()> {
        let file_name: Option<String> =
            sqlx::query_scalar("DELETE FROM contents WHERE id = ? RETURNING file_name")
                .bind(id)
                .fetch_optional(&*self.db)
                .await?;
        let file_name = file_name.ok_or(StoreError::ContentNotFound(id))?;

        let path = self.content_file_path(&file_name);
        self.remove_payload(&path).await;
        Ok(())
    }

    /// Apply a sheet of content rows, one transaction per row.
    ///
    /// A failing row is reported in the summary and never blocks the rest
    /// of the batch; abandoning the batch mid-way leaves only whole rows
    /// applied.
    pub async fn import_sheet(&self, payload: SheetPayload) -> StoreResult<SheetImportResult> {
        let mut result = SheetImportResult {
            created: 0,
            updated: 0,
            failed: Vec::new(),
        };

        for (index, row) in payload.rows.iter().enumerate() {
            match self.apply_sheet_row(row).await {
                Ok(true) => result.created += 1,
                Ok(false) => result.updated += 1,
                Err(err) => {
                    tracing::debug!("sheet row {} ({}) failed: {}", index, row.title, err);
                    result.failed.push(SheetRowFailure {
                        row: index,
                        title: row.title.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    /// Upsert one sheet row by title. Returns true when a new record was
    /// created, false when an existing one was updated.
    async fn apply_sheet_row(&self, row: &SheetRow) -> StoreResult<bool> {
        let stored = self.stat_content_file(&row.file_name).await?;

        let mut tx = self.db.begin().await?;
        let existing_id: Option<i64> = sqlx::query_scalar("SELECT id FROM contents WHERE title = ?")
            .bind(&row.title)
            .fetch_optional(&mut *tx)
            .await?;

        let (content_id, created) = match existing_id {
            Some(id) => {
                sqlx::query(
                    "UPDATE contents SET file_name = ?, file_hash = ?, filesize = ?, \
                     description = ?, modified_on = ?, copyright = ?, rights_statement = ?, \
                     published_date = ?, reviewed_on = ?, active = ? WHERE id = ?",
                )
                .bind(&stored.file_name)
                .bind(&stored.hash)
                .bind(stored.size)
                .bind(&row.description)
                .bind(Utc::now())
                .bind(&row.copyright)
                .bind(&row.rights_statement)
                .bind(row.published_date)
                .bind(row.reviewed_on)
                .bind(row.active.unwrap_or(true))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|err| classify_content_write_error(err, &row.title, &stored))?;
                (id, false)
            }
            None => {
                let id: i64 = sqlx::query_scalar(
                    "INSERT INTO contents (file_name, file_hash, filesize, title, description, \
                     modified_on, copyright, rights_statement, published_date, reviewed_on, active) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
                )
                .bind(&stored.file_name)
                .bind(&stored.hash)
                .bind(stored.size)
                .bind(&row.title)
                .bind(&row.description)
                .bind(Utc::now())
                .bind(&row.copyright)
                .bind(&row.rights_statement)
                .bind(row.published_date)
                .bind(row.reviewed_on)
                .bind(row.active.unwrap_or(true))
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| classify_content_write_error(err, &row.title, &stored))?;
                (id, true)
            }
        };

        if let Some(tokens) = &row.metadata {
            let mut ids = Vec::with_capacity(tokens.len());
            for token in tokens {
                ids.push(resolve_metadata_token(&mut tx, token).await?);
            }
            sqlx::query("DELETE FROM content_metadata WHERE content_id = ?")
                .bind(content_id)
                .execute(&mut *tx)
                .await?;
            link_metadata(&mut tx, content_id, &ids).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Resolved tag set for a single content record.
    pub(crate) async fn metadata_info_for(&self, content_id: i64) -> StoreResult<Vec<MetadataInfo>> {
        let rows = sqlx::query_as::<_, MetadataInfo>(
            "SELECT m.id, m.name, m.type_id, t.name AS type_name \
             FROM content_metadata cm \
             JOIN metadata m ON m.id = cm.metadata_id \
             JOIN metadata_types t ON t.id = m.type_id \
             WHERE cm.content_id = ? ORDER BY m.id",
        )
        .bind(content_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Resolved tag sets for one page of content records, keyed by id.
    async fn metadata_info_for_many(
        &self,
        content_ids: Vec<i64>,
    ) -> StoreResult<HashMap<i64, Vec<MetadataInfo>>> {
        if content_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT cm.content_id, m.id, m.name, m.type_id, t.name AS type_name \
             FROM content_metadata cm \
             JOIN metadata m ON m.id = cm.metadata_id \
             JOIN metadata_types t ON t.id = m.type_id \
             WHERE cm.content_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in &content_ids {
            separated.push_bind(*id);
        }
        builder.push(") ORDER BY m.id");

        let rows: Vec<ContentMetadataRow> = builder.build_query_as().fetch_all(&*self.db).await?;
        let mut map: HashMap<i64, Vec<MetadataInfo>> = HashMap::new();
        for row in rows {
            map.entry(row.content_id).or_default().push(MetadataInfo {
                id: row.id,
                name: row.name,
                type_id: row.type_id,
                type_name: row.type_name,
            });
        }
        Ok(map)
    }
}

/// Insert tag links for a content record inside the caller's transaction.
async fn link_metadata(
    tx: &mut Transaction<'_, Sqlite>,
    content_id: i64,
    metadata_ids: &[i64],
) -> StoreResult<()> {
    for id in metadata_ids {
        sqlx::query("INSERT OR IGNORE INTO content_metadata (content_id, metadata_id) VALUES (?, ?)")
            .bind(content_id)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    StoreError::UnknownReference("metadata")
                } else {
                    StoreError::Sqlx(err)
                }
            })?;
    }
    Ok(())
}

/// Resolve a `"Type:Name"` sheet token to a tag id, creating the type and
/// the tag as needed.
async fn resolve_metadata_token(
    tx: &mut Transaction<'_, Sqlite>,
    token: &str,
) -> StoreResult<i64> {
    let (type_name, name) = token
        .split_once(':')
        .map(|(t, n)| (t.trim(), n.trim()))
        .filter(|(t, n)| !t.is_empty() && !n.is_empty())
        .ok_or_else(|| StoreError::MalformedMetadataToken(token.to_string()))?;

    sqlx::query("INSERT OR IGNORE INTO metadata_types (name) VALUES (?)")
        .bind(type_name)
        .execute(&mut **tx)
        .await?;
    let type_id: i64 = sqlx::query_scalar("SELECT id FROM metadata_types WHERE name = ?")
        .bind(type_name)
        .fetch_one(&mut **tx)
        .await?;

    sqlx::query("INSERT OR IGNORE INTO metadata (name, type_id) VALUES (?, ?)")
        .bind(name)
        .bind(type_id)
        .execute(&mut **tx)
        .await?;
    let id: i64 = sqlx::query_scalar("SELECT id FROM metadata WHERE name = ? AND type_id = ?")
        .bind(name)
        .bind(type_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(id)
}

/// Map a write failure to the uniqueness constraint it violated.
fn classify_content_write_error(err: sqlx::Error, title: &str, stored: &StoredFile) -> StoreError {
    match unique_violation_column(&err).as_deref() {
        Some("contents.title") => StoreError::Duplicate {
            field: "title",
            value: title.to_string(),
        },
        Some("contents.file_name") => StoreError::Duplicate {
            field: "file name",
            value: stored.file_name.clone(),
        },
        Some("contents.file_hash") => StoreError::Duplicate {
            field: "file content",
            value: stored.hash.clone(),
        },
        Some(column) => StoreError::Duplicate {
            field: "value",
            value: column.to_string(),
        },
        None => StoreError::Sqlx(err),
    }
}
