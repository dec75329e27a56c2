use super::error::CatalogError;
use super::types::{Category, Product};

/// Validates a category submitted by a client.
pub fn validate_category(category: &Category) -> Result<(), CatalogError> {
    if category.name.trim().is_empty() {
        return Err(CatalogError::EmptyCategoryName);
    }
    Ok(())
}

/// Validates a product submitted by a client.
pub fn validate_product(product: &Product) -> Result<(), CatalogError> {
    if product.name.trim().is_empty() {
        return Err(CatalogError::EmptyProductName);
    }
    if product.category_id.trim().is_empty() {
        return Err(CatalogError::MissingCategoryId);
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(CatalogError::InvalidPrice);
    }
    Ok(())
}
