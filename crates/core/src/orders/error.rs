use thiserror::Error;

/// Errors raised while validating orders submitted by clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order status is required")]
    MissingStatus,
    #[error("Unknown order status: {0}")]
    InvalidStatus(String),
    #[error("Order must contain at least one item")]
    NoItems,
    #[error("Item {0} has no product id")]
    MissingProductId(usize),
    #[error("Item {0} quantity must be positive")]
    InvalidQuantity(usize),
    #[error("Item {0} has an invalid price")]
    InvalidPrice(usize),
}
