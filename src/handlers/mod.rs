pub mod content_handlers;
pub mod health_handlers;
pub mod library_handlers;
pub mod metadata_handlers;
