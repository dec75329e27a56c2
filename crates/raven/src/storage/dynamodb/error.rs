//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreError` from `raven_core::storage`.

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use raven_core::storage::StoreError;

/// Map an SDK error from any DynamoDB operation to StoreError.
///
/// Transport failures become `Unavailable`; service errors are classified by
/// their error code.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, table: &str, operation: &str) -> StoreError
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: Debug,
{
    if matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_)
    ) {
        return StoreError::Unavailable(format!(
            "{operation} on {table}: {}",
            DisplayErrorContext(&err)
        ));
    }

    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    match err.code() {
        Some("AccessDeniedException") | Some("UnrecognizedClientException") => {
            StoreError::AccessDenied {
                table: table.to_string(),
                message,
            }
        }
        Some("ResourceNotFoundException") => StoreError::TableNotFound(table.to_string()),
        Some("ProvisionedThroughputExceededException")
        | Some("RequestLimitExceeded")
        | Some("ThrottlingException") => {
            StoreError::Throttled(format!("{operation} on {table}: {message}"))
        }
        Some("InternalServerError") | Some("ServiceUnavailable") => {
            StoreError::Unavailable(format!("{operation} on {table}: {message}"))
        }
        _ => StoreError::Service(format!("{operation} on {table} failed: {message}")),
    }
}
