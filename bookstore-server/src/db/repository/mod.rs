//! Repository Module
//!
//! CRUD operations over the SQLite store. Repositories are free functions
//! taking `&SqlitePool`, one module per aggregate.

pub mod author;
pub mod book;
pub mod category;
pub mod chat;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod payment;
pub mod promotion;
pub mod publisher;
pub mod report;
pub mod review;
pub mod role;
pub mod shipping_method;
pub mod user;

use thiserror::Error;

use crate::utils::AppError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Business rule: {0}")]
    Business(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Business(msg) => AppError::BusinessRule(msg),
            RepoError::Database(msg) => AppError::Database(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Clamp user-supplied paging values
pub fn page_bounds(page: i64, page_size: i64) -> (i64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);
    (page_size, (page - 1) * page_size)
}
