use thiserror::Error;

/// Errors raised while validating catalog records submitted by clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Category name cannot be empty")]
    EmptyCategoryName,
    #[error("Product name cannot be empty")]
    EmptyProductName,
    #[error("Product category id is required")]
    MissingCategoryId,
    #[error("Product price must be a non-negative number")]
    InvalidPrice,
}
