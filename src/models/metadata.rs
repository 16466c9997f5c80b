//! Typed tag vocabulary: metadata types and their entries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named category of metadata tags (e.g. "Language", "Subject").
///
/// Type names are unique. Deleting a type cascades to its entries.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct MetadataType {
    pub id: i64,

    /// Unique, case-sensitive type name.
    pub name: String,
}

/// A single tag entry belonging to a [`MetadataType`].
///
/// `(type_id, name)` pairs are unique so the same tag cannot be
/// registered twice under one type.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Metadata {
    pub id: i64,

    /// Display name of the tag.
    pub name: String,

    /// Foreign key linking to the owning type.
    pub type_id: i64,
}

/// Denormalized view of a tag with its type name resolved, as attached
/// to content records in API responses.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct MetadataInfo {
    pub id: i64,
    pub name: String,
    pub type_id: i64,
    pub type_name: String,
}
