//! Metadata catalog operations: CRUD over metadata types and entries, plus
//! the by-type-name listing.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use super::store::{
    StoreError, StoreResult, StoreService, is_foreign_key_violation, unique_violation_column,
};
use crate::models::metadata::{Metadata, MetadataInfo, MetadataType};
use crate::pagination::{Page, PageParams};

/// Request body for metadata-type create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataTypeUpsert {
    pub name: String,
}

/// Request body for `POST /metadata`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataCreate {
    pub name: String,
    pub type_id: i64,
}

/// Request body for `PUT /metadata/{id}`. Absent fields keep their values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub type_id: Option<i64>,
}

const METADATA_INFO_QUERY: &str = "SELECT m.id, m.name, m.type_id, t.name AS type_name \
     FROM metadata m JOIN metadata_types t ON t.id = m.type_id";

impl StoreService {
    pub async fn create_metadata_type(&self, req: MetadataTypeUpsert) -> StoreResult<MetadataType> {
        sqlx::query_as::<_, MetadataType>(
            "INSERT INTO metadata_types (name) VALUES (?) RETURNING id, name",
        )
        .bind(&req.name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| classify_catalog_write_error(err, &req.name))
    }

    pub async fn list_metadata_types(&self, params: &PageParams) -> StoreResult<Page<MetadataType>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metadata_types")
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, MetadataType>(
            "SELECT id, name FROM metadata_types ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }

    pub async fn get_metadata_type(&self, id: i64) -> StoreResult<MetadataType> {
        sqlx::query_as::<_, MetadataType>("SELECT id, name FROM metadata_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(StoreError::MetadataTypeNotFound(id))
    }

    pub async fn update_metadata_type(
        &self,
        id: i64,
        req: MetadataTypeUpsert,
    ) -> StoreResult<MetadataType> {
        sqlx::query_as::<_, MetadataType>(
            "UPDATE metadata_types SET name = ? WHERE id = ? RETURNING id, name",
        )
        .bind(&req.name)
        .bind(id)
        .fetch_optional(&*self.db)
        .await
        .map_err(|err| classify_catalog_write_error(err, &req.name))?
        .ok_or(StoreError::MetadataTypeNotFound(id))
    }

    /// Delete a type; its entries go with it via cascade.
    pub async fn delete_metadata_type(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM metadata_types WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MetadataTypeNotFound(id));
        }
        Ok(())
    }

    pub async fn create_metadata(&self, req: MetadataCreate) -> StoreResult<Metadata> {
        sqlx::query_as::<_, Metadata>(
            "INSERT INTO metadata (name, type_id) VALUES (?, ?) RETURNING id, name, type_id",
        )
        .bind(&req.name)
        .bind(req.type_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| classify_catalog_write_error(err, &req.name))
    }

    pub async fn list_metadata(&self, params: &PageParams) -> StoreResult<Page<MetadataInfo>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM metadata")
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, MetadataInfo>(&format!(
            "{} ORDER BY m.id ASC LIMIT ? OFFSET ?",
            METADATA_INFO_QUERY
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }

    pub async fn get_metadata(&self, id: i64) -> StoreResult<MetadataInfo> {
        sqlx::query_as::<_, MetadataInfo>(&format!("{} WHERE m.id = ?", METADATA_INFO_QUERY))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(StoreError::MetadataNotFound(id))
    }

    pub async fn update_metadata(&self, id: i64, req: MetadataUpdate) -> StoreResult<MetadataInfo> {
        let existing = self.get_metadata(id).await?;
        let name = req.name.unwrap_or(existing.name);
        let type_id = req.type_id.unwrap_or(existing.type_id);

        sqlx::query("UPDATE metadata SET name = ?, type_id = ? WHERE id = ?")
            .bind(&name)
            .bind(type_id)
            .bind(id)
            .execute(&*self.db)
            .await
            .map_err(|err| classify_catalog_write_error(err, &name))?;

        self.get_metadata(id).await
    }

    pub async fn delete_metadata(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM metadata WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MetadataNotFound(id));
        }
        Ok(())
    }

    /// All entries whose type name matches `type_name` exactly.
    ///
    /// The comparison is case-sensitive: SQLite's default BINARY collation
    /// on `=` is the contract here.
    pub async fn metadata_by_type_name(
        &self,
        type_name: &str,
        params: &PageParams,
    ) -> StoreResult<Page<MetadataInfo>> {
        let mut count_builder = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM metadata m \
             JOIN metadata_types t ON t.id = m.type_id WHERE t.name = ",
        );
        count_builder.push_bind(type_name);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, MetadataInfo>(&format!(
            "{} WHERE t.name = ? ORDER BY m.id ASC LIMIT ? OFFSET ?",
            METADATA_INFO_QUERY
        ))
        .bind(type_name)
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }
}

/// Map a catalog write failure: unique violations carry the offending name,
/// foreign-key failures mean the referenced type does not exist.
fn classify_catalog_write_error(err: sqlx::Error, name: &str) -> StoreError {
    if let Some(column) = unique_violation_column(&err) {
        let field = if column.starts_with("metadata_types") {
            "metadata type name"
        } else {
            "metadata (type, name)"
        };
        return StoreError::Duplicate {
            field,
            value: name.to_string(),
        };
    }
    if is_foreign_key_violation(&err) {
        return StoreError::UnknownReference("metadata type");
    }
    StoreError::Sqlx(err)
}
