//! Storage backend selection.
//!
//! - `inmemory` (default): [`raven_core::storage::MemoryStore`], data lost on exit
//! - `dynamodb`: AWS DynamoDB through `aws-sdk-dynamodb`
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p raven --no-default-features --features dynamodb
//! ```

use std::sync::Arc;

use raven_core::storage::KeyValueStore;

use crate::config::Config;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

/// Builds the store for the enabled backend.
#[cfg(feature = "inmemory")]
pub async fn connect(_config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    tracing::warn!("using in-memory storage, data is lost on exit");
    Ok(Arc::new(raven_core::storage::MemoryStore::new()))
}

/// Builds the store for the enabled backend.
#[cfg(feature = "dynamodb")]
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store = dynamodb::DynamoDbStore::connect(config).await;
    Ok(Arc::new(store))
}
