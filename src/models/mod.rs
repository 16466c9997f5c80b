//! Core data models for the content-and-library management service.
//!
//! These entities represent the typed tag vocabulary, managed content files,
//! and the library tree (versions, folders, layout images). They map cleanly
//! to database tables via `sqlx::FromRow` and serialize naturally as JSON
//! via `serde`.

pub mod content;
pub mod library;
pub mod metadata;
