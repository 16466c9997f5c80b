pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;
