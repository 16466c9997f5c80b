//! Library tree operations: layout images, versions, folders, and the
//! build of a version's assembled folder tree.
//!
//! Referential rules live in the schema (version delete cascades folders,
//! folder delete cascades subfolders, image delete nulls references); this
//! module adds the one rule SQLite cannot express, acyclicity of the
//! folder tree, via an explicit ancestor walk on reparenting.

use bytes::Bytes;
use chrono::NaiveDate;
use futures::Stream;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};
use std::collections::HashMap;
use std::io;
use tokio::fs;

use super::store::{
    StoreError, StoreResult, StoreService, is_foreign_key_violation, unique_violation_column,
};
use crate::models::content::ContentSummary;
use crate::models::library::{ImageGroup, LibLayoutImage, LibraryFolder, LibraryVersion};
use crate::pagination::{Page, PageParams};

/// Request body for version create and update (update fields optional).
#[derive(Debug, Clone, Deserialize)]
pub struct VersionCreate {
    pub library_name: String,
    pub version_number: String,
    #[serde(default)]
    pub banner_image_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionUpdate {
    #[serde(default)]
    pub library_name: Option<String>,
    #[serde(default)]
    pub version_number: Option<String>,
    /// Missing field keeps the banner; explicit null clears it.
    #[serde(default)]
    pub banner_image_id: Option<Option<i64>>,
}

/// Request body for `POST /library/folders`.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderCreate {
    pub folder_name: String,
    pub version_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub banner_image_id: Option<i64>,
    #[serde(default)]
    pub logo_image_id: Option<i64>,
    #[serde(default)]
    pub content_ids: Option<Vec<i64>>,
}

/// Request body for `PUT /library/folders/{id}`. Double options distinguish
/// "leave as is" (missing) from "clear" (null).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderUpdate {
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Option<i64>>,
    #[serde(default)]
    pub banner_image_id: Option<Option<i64>>,
    #[serde(default)]
    pub logo_image_id: Option<Option<i64>>,
    #[serde(default)]
    pub content_ids: Option<Vec<i64>>,
}

/// Folder detail view with its contained content ids.
#[derive(Debug, Clone, Serialize)]
pub struct FolderWithContents {
    #[serde(flatten)]
    pub folder: LibraryFolder,
    pub content_ids: Vec<i64>,
}

/// The assembled tree for one library version.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryBuild {
    pub version: LibraryVersion,
    pub folders: Vec<BuiltFolder>,
}

/// One node of the assembled tree.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltFolder {
    pub id: i64,
    pub folder_name: String,
    pub banner_image_id: Option<i64>,
    pub logo_image_id: Option<i64>,
    pub contents: Vec<ContentSummary>,
    pub subfolders: Vec<BuiltFolder>,
}

#[derive(sqlx::FromRow)]
struct FolderContentRow {
    folder_id: i64,
    id: i64,
    title: String,
    file_name: String,
    filesize: i64,
    published_date: Option<NaiveDate>,
}

const FOLDER_COLUMNS: &str =
    "id, folder_name, banner_image_id, logo_image_id, version_id, parent_id";

impl StoreService {
    /// Stream-upload a layout image under its group's sub-path and record
    /// it. Unknown group codes are rejected before anything touches disk,
    /// and names are unique within a group so two rows never share a
    /// payload file.
    pub async fn upload_layout_image<S>(
        &self,
        group_code: i64,
        file_name: &str,
        stream: S,
    ) -> StoreResult<LibLayoutImage>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let group =
            ImageGroup::from_code(group_code).ok_or(StoreError::InvalidImageGroup(group_code))?;
        self.ensure_file_name_safe(file_name)?;

        let path = self.base_path.join(group.storage_prefix()).join(file_name);
        if fs::try_exists(&path).await? {
            return Err(StoreError::FileAlreadyExists(file_name.to_string()));
        }
        let (size, _) = self.write_stream_to(&path, stream).await?;
        tracing::debug!(
            "stored layout image {}/{} ({} bytes)",
            group.storage_prefix(),
            file_name,
            size
        );

        let image = sqlx::query_as::<_, LibLayoutImage>(
            "INSERT INTO lib_layout_images (file_name, image_group) VALUES (?, ?) \
             RETURNING id, file_name, image_group",
        )
        .bind(file_name)
        .bind(group.code())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if unique_violation_column(&err).is_some() {
                StoreError::FileAlreadyExists(file_name.to_string())
            } else {
                StoreError::Sqlx(err)
            }
        })?;
        Ok(image)
    }

    pub async fn list_layout_images(&self, params: &PageParams) -> StoreResult<Page<LibLayoutImage>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lib_layout_images")
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, LibLayoutImage>(
            "SELECT id, file_name, image_group FROM lib_layout_images \
             ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }

    pub async fn get_layout_image(&self, id: i64) -> StoreResult<LibLayoutImage> {
        sqlx::query_as::<_, LibLayoutImage>(
            "SELECT id, file_name, image_group FROM lib_layout_images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::ImageNotFound(id))
    }

    /// Delete an image; folders and versions pointing at it keep existing
    /// with the reference cleared (ON DELETE SET NULL).
    pub async fn delete_layout_image(&self, id: i64) -> StoreResult<()> {
        let image = self.get_layout_image(id).await?;
        sqlx::query("DELETE FROM lib_layout_images WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if let Some(group) = ImageGroup::from_code(image.image_group) {
            let path = self
                .base_path
                .join(group.storage_prefix())
                .join(&image.file_name);
            self.remove_payload(&path).await;
        }
        Ok(())
    }

    pub async fn create_version(&self, req: VersionCreate) -> StoreResult<LibraryVersion> {
        sqlx::query_as::<_, LibraryVersion>(
            "INSERT INTO library_versions (library_name, version_number, banner_image_id) \
             VALUES (?, ?, ?) RETURNING id, library_name, version_number, banner_image_id",
        )
        .bind(&req.library_name)
        .bind(&req.version_number)
        .bind(req.banner_image_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| classify_library_reference_error(err, "banner image"))
    }

    pub async fn list_versions(&self, params: &PageParams) -> StoreResult<Page<LibraryVersion>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM library_versions")
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, LibraryVersion>(
            "SELECT id, library_name, version_number, banner_image_id FROM library_versions \
             ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }

    pub async fn get_version(&self, id: i64) -> StoreResult<LibraryVersion> {
        sqlx::query_as::<_, LibraryVersion>(
            "SELECT id, library_name, version_number, banner_image_id \
             FROM library_versions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::VersionNotFound(id))
    }

    pub async fn update_version(&self, id: i64, req: VersionUpdate) -> StoreResult<LibraryVersion> {
        let existing = self.get_version(id).await?;
        let banner = match req.banner_image_id {
            Some(banner) => banner,
            None => existing.banner_image_id,
        };

        sqlx::query_as::<_, LibraryVersion>(
            "UPDATE library_versions SET library_name = ?, version_number = ?, \
             banner_image_id = ? WHERE id = ? \
             RETURNING id, library_name, version_number, banner_image_id",
        )
        .bind(req.library_name.unwrap_or(existing.library_name))
        .bind(req.version_number.unwrap_or(existing.version_number))
        .bind(banner)
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| classify_library_reference_error(err, "banner image"))
    }

    /// Delete a version; all of its folders cascade away.
    pub async fn delete_version(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM library_versions WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionNotFound(id));
        }
        Ok(())
    }

    pub async fn create_folder(&self, req: FolderCreate) -> StoreResult<FolderWithContents> {
        // Surface precise not-found conditions before the generic FK check.
        self.get_version(req.version_id).await?;
        if let Some(parent_id) = req.parent_id {
            self.get_folder_record(parent_id).await?;
        }

        let mut tx = self.db.begin().await?;
        let folder = sqlx::query_as::<_, LibraryFolder>(&format!(
            "INSERT INTO library_folders \
             (folder_name, banner_image_id, logo_image_id, version_id, parent_id) \
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            FOLDER_COLUMNS
        ))
        .bind(&req.folder_name)
        .bind(req.banner_image_id)
        .bind(req.logo_image_id)
        .bind(req.version_id)
        .bind(req.parent_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| classify_library_reference_error(err, "layout image"))?;

        if let Some(ids) = &req.content_ids {
            set_folder_contents(&mut tx, folder.id, ids).await?;
        }
        tx.commit().await?;

        self.get_folder(folder.id).await
    }

    pub async fn list_folders(&self, params: &PageParams) -> StoreResult<Page<LibraryFolder>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM library_folders")
            .fetch_one(&*self.db)
            .await?;

        let (limit, offset) = params.limit_offset();
        let data = sqlx::query_as::<_, LibraryFolder>(&format!(
            "SELECT {} FROM library_folders ORDER BY id ASC LIMIT ? OFFSET ?",
            FOLDER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.db)
        .await?;

        Ok(Page::new(data, params, total))
    }

    pub async fn get_folder(&self, id: i64) -> StoreResult<FolderWithContents> {
        let folder = self.get_folder_record(id).await?;
        let content_ids = sqlx::query_scalar(
            "SELECT content_id FROM folder_contents WHERE folder_id = ? ORDER BY content_id",
        )
        .bind(id)
        .fetch_all(&*self.db)
        .await?;
        Ok(FolderWithContents { folder, content_ids })
    }

    async fn get_folder_record(&self, id: i64) -> StoreResult<LibraryFolder> {
        sqlx::query_as::<_, LibraryFolder>(&format!(
            "SELECT {} FROM library_folders WHERE id = ?",
            FOLDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::FolderNotFound(id))
    }

    pub async fn update_folder(&self, id: i64, req: FolderUpdate) -> StoreResult<FolderWithContents> {
        let existing = self.get_folder_record(id).await?;

        let parent_id = match req.parent_id {
            Some(Some(new_parent)) => {
                self.get_folder_record(new_parent).await?;
                self.assert_no_cycle(id, new_parent).await?;
                Some(new_parent)
            }
            Some(None) => None,
            None => existing.parent_id,
        };
        let banner = match req.banner_image_id {
            Some(banner) => banner,
            None => existing.banner_image_id,
        };
        let logo = match req.logo_image_id {
            Some(logo) => logo,
            None => existing.logo_image_id,
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "UPDATE library_folders SET folder_name = ?, banner_image_id = ?, \
             logo_image_id = ?, parent_id = ? WHERE id = ?",
        )
        .bind(req.folder_name.unwrap_or(existing.folder_name))
        .bind(banner)
        .bind(logo)
        .bind(parent_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|err| classify_library_reference_error(err, "layout image"))?;

        if let Some(ids) = &req.content_ids {
            sqlx::query("DELETE FROM folder_contents WHERE folder_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            set_folder_contents(&mut tx, id, ids).await?;
        }
        tx.commit().await?;

        self.get_folder(id).await
    }

    /// Delete a folder; its subtree cascades away.
    pub async fn delete_folder(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM library_folders WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::FolderNotFound(id));
        }
        Ok(())
    }

    /// Walk ancestors from `new_parent` upwards; finding `folder_id` on the
    /// way means the reparent would close a cycle.
    async fn assert_no_cycle(&self, folder_id: i64, new_parent: i64) -> StoreResult<()> {
        let mut current = Some(new_parent);
        while let Some(id) = current {
            if id == folder_id {
                return Err(StoreError::FolderCycle(folder_id));
            }
            current = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT parent_id FROM library_folders WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .flatten();
        }
        Ok(())
    }

    /// Assemble the full folder tree for a version.
    ///
    /// Folders are fetched flat and composed in memory through a
    /// parent-id index, so the tree shape never depends on row order.
    /// An unknown version id fails with a not-found, never silently.
    pub async fn build_library(&self, version_id: i64) -> StoreResult<LibraryBuild> {
        let version = self.get_version(version_id).await?;

        let folders = sqlx::query_as::<_, LibraryFolder>(&format!(
            "SELECT {} FROM library_folders WHERE version_id = ? ORDER BY id ASC",
            FOLDER_COLUMNS
        ))
        .bind(version_id)
        .fetch_all(&*self.db)
        .await?;

        let content_rows = sqlx::query_as::<_, FolderContentRow>(
            "SELECT fc.folder_id, c.id, c.title, c.file_name, c.filesize, c.published_date \
             FROM folder_contents fc \
             JOIN contents c ON c.id = fc.content_id \
             JOIN library_folders f ON f.id = fc.folder_id \
             WHERE f.version_id = ? ORDER BY c.id ASC",
        )
        .bind(version_id)
        .fetch_all(&*self.db)
        .await?;

        let mut contents_by_folder: HashMap<i64, Vec<ContentSummary>> = HashMap::new();
        for row in content_rows {
            contents_by_folder
                .entry(row.folder_id)
                .or_default()
                .push(ContentSummary {
                    id: row.id,
                    title: row.title,
                    file_name: row.file_name,
                    filesize: row.filesize,
                    published_date: row.published_date,
                });
        }

        let mut children_by_parent: HashMap<Option<i64>, Vec<LibraryFolder>> = HashMap::new();
        for folder in folders {
            children_by_parent
                .entry(folder.parent_id)
                .or_default()
                .push(folder);
        }

        let folders = assemble_subtree(None, &mut children_by_parent, &mut contents_by_folder);
        Ok(LibraryBuild { version, folders })
    }
}

/// Recursively lift flat folder rows into the nested tree, consuming the
/// parent index as it goes.
fn assemble_subtree(
    parent: Option<i64>,
    children_by_parent: &mut HashMap<Option<i64>, Vec<LibraryFolder>>,
    contents_by_folder: &mut HashMap<i64, Vec<ContentSummary>>,
) -> Vec<BuiltFolder> {
    let Some(folders) = children_by_parent.remove(&parent) else {
        return Vec::new();
    };

    folders
        .into_iter()
        .map(|folder| {
            let subfolders =
                assemble_subtree(Some(folder.id), children_by_parent, contents_by_folder);
            BuiltFolder {
                id: folder.id,
                folder_name: folder.folder_name,
                banner_image_id: folder.banner_image_id,
                logo_image_id: folder.logo_image_id,
                contents: contents_by_folder.remove(&folder.id).unwrap_or_default(),
                subfolders,
            }
        })
        .collect()
}

/// Insert folder-content links inside the caller's transaction.
async fn set_folder_contents(
    tx: &mut Transaction<'_, Sqlite>,
    folder_id: i64,
    content_ids: &[i64],
) -> StoreResult<()> {
    for id in content_ids {
        sqlx::query("INSERT OR IGNORE INTO folder_contents (folder_id, content_id) VALUES (?, ?)")
            .bind(folder_id)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    StoreError::UnknownReference("content")
                } else {
                    StoreError::Sqlx(err)
                }
            })?;
    }
    Ok(())
}

fn classify_library_reference_error(err: sqlx::Error, reference: &'static str) -> StoreError {
    if is_foreign_key_violation(&err) {
        return StoreError::UnknownReference(reference);
    }
    StoreError::Sqlx(err)
}
