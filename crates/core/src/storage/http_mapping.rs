//! Pure functions for mapping repository errors to HTTP status codes.

use super::{RepositoryError, StoreError};

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// - `Validation` -> 400 (Bad Request)
/// - `NotFound` -> 404 (Not Found)
/// - `Store` with a throttled or unavailable store -> 503 (Service Unavailable)
/// - everything else -> 500 (Internal Server Error)
///
/// # Examples
///
/// ```
/// use raven_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::NotFound {
///     entity_type: "Order",
///     id: "abc-123".to_string(),
/// };
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::Validation(_) => 400,
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::Store { source, .. } => store_error_to_status_code(source),
        RepositoryError::Marshal { .. } | RepositoryError::Unmarshal { .. } => 500,
    }
}

fn store_error_to_status_code(error: &StoreError) -> u16 {
    if error.is_transient() {
        503
    } else {
        500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreOperation;

    fn store(source: StoreError) -> RepositoryError {
        RepositoryError::Store {
            entity_type: "Order",
            operation: StoreOperation::Get,
            id: "o1".to_string(),
            source,
        }
    }

    #[test]
    fn test_validation_maps_to_400() {
        let error = RepositoryError::Validation("bad id".to_string());
        assert_eq!(repository_error_to_status_code(&error), 400);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let error = RepositoryError::NotFound {
            entity_type: "Order",
            id: "o1".to_string(),
        };
        assert_eq!(repository_error_to_status_code(&error), 404);
    }

    #[test]
    fn test_transient_store_errors_map_to_503() {
        let throttled = store(StoreError::Throttled("slow down".to_string()));
        let unavailable = store(StoreError::Unavailable("timeout".to_string()));
        assert_eq!(repository_error_to_status_code(&throttled), 503);
        assert_eq!(repository_error_to_status_code(&unavailable), 503);
    }

    #[test]
    fn test_other_store_errors_map_to_500() {
        let denied = store(StoreError::AccessDenied {
            table: "orders".to_string(),
            message: "no".to_string(),
        });
        let missing = store(StoreError::TableNotFound("orders".to_string()));
        assert_eq!(repository_error_to_status_code(&denied), 500);
        assert_eq!(repository_error_to_status_code(&missing), 500);
    }
}
