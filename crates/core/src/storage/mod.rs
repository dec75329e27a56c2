mod entity;
mod error;
mod http_mapping;
mod memory;
mod repository;
mod traits;
mod types;

pub use entity::timestamp_now;
pub use error::{RepositoryError, Result, StoreError};
pub use http_mapping::repository_error_to_status_code;
pub use memory::MemoryStore;
pub use repository::{Repository, CATEGORY_ATTRIBUTE};
pub use traits::{Entity, KeyValueStore};
pub use types::{KeyCondition, StoreOperation, TableDescription};
