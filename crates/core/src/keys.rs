//! Identifier generation, validation and key-map construction.

use std::collections::HashMap;

use uuid::Uuid;

use crate::attribute::{AttributeValue, Item};
use crate::storage::RepositoryError;

/// Name of the partition-key attribute shared by every table.
pub const KEY_ATTRIBUTE: &str = "id";

/// Returns a fresh random (v4) identifier.
pub fn generate_id() -> String {
    let id = Uuid::new_v4().to_string();
    tracing::debug!(%id, "generated identifier");
    id
}

/// Returns true when `id` has the canonical hyphenated UUID shape.
///
/// The check is lexical: 36 characters, hyphens at offsets 8, 13, 18 and 23,
/// hex digits everywhere else. Version and variant bits are not inspected.
///
/// # Examples
///
/// ```
/// use raven_core::keys::is_valid_id;
///
/// assert!(is_valid_id("8f14e45f-ceea-467a-9575-8f2b7e4c9d11"));
/// assert!(!is_valid_id("not-a-uuid"));
/// ```
pub fn is_valid_id(id: &str) -> bool {
    id.len() == 36
        && id.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

/// Fails with a validation error unless `id` is UUID-shaped.
pub fn validate_id(id: &str, field: &str) -> Result<(), RepositoryError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(RepositoryError::Validation(format!(
            "Invalid {field}: '{id}'. Must be a valid UUID."
        )))
    }
}

/// Returns `id` when supplied, or a fresh identifier when it is blank.
pub fn ensure_valid_id(id: &str, field: &str) -> Result<String, RepositoryError> {
    if id.trim().is_empty() {
        return Ok(generate_id());
    }
    validate_id(id, field)?;
    Ok(id.to_string())
}

/// Builds the single-attribute key map addressing one item.
pub fn item_key(id: &str) -> Item {
    HashMap::from([(KEY_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string()))])
}
