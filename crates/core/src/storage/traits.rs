use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::attribute::Item;

use super::error::StoreError;
use super::types::{KeyCondition, TableDescription};

/// The schemaless key-value store the repositories persist to.
///
/// Keys are single-attribute maps built by [`crate::keys::item_key`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Writes the whole item, replacing any existing item with the same key.
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError>;

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError>;

    /// Returns every item in the table, following pagination to the end.
    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError>;

    /// Returns the items of a secondary index matching `condition`.
    async fn query(
        &self,
        table: &str,
        index: &str,
        condition: &KeyCondition,
    ) -> Result<Vec<Item>, StoreError>;

    /// Deletes the item, returning whether it existed.
    async fn delete(&self, table: &str, key: Item) -> Result<bool, StoreError>;

    /// Sets the attributes in `changes` on an existing item.
    ///
    /// Returns the updated item, or `None` without writing when the key does
    /// not exist.
    async fn update(&self, table: &str, key: Item, changes: Item)
        -> Result<Option<Item>, StoreError>;

    async fn describe(&self, table: &str) -> Result<TableDescription, StoreError>;
}

/// A record persisted through a [`Repository`](super::Repository).
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity name used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Called once before the first write.
    fn on_create(&mut self, _now: &str) {}

    /// Called before overwriting `existing`.
    fn on_update(&mut self, _existing: &Self, _now: &str) {}
}
