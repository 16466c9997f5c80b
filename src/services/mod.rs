pub mod catalog_service;
pub mod content_service;
pub mod filters;
pub mod library_service;
pub mod store;
