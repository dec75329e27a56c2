//! In-memory store for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::attribute::{AttributeValue, Item};
use crate::keys::KEY_ATTRIBUTE;

use super::error::StoreError;
use super::traits::KeyValueStore;
use super::types::{KeyCondition, TableDescription};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<String, HashMap<String, Item>>,
    denied_scans: HashSet<String>,
}

/// A [`KeyValueStore`] keeping items in `Arc<RwLock<_>>` maps.
///
/// Tables are created on first write. Data is lost when the last clone is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls (`put`, `delete`, `update`) that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every later scan of `table` fail with an access-denied error.
    pub async fn deny_scan(&self, table: &str) {
        self.tables.write().await.denied_scans.insert(table.to_string());
    }

    /// Stores `item` under `id` verbatim, bypassing key extraction and the
    /// write counter.
    pub async fn seed(&self, table: &str, id: &str, item: Item) {
        self.tables
            .write()
            .await
            .items
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), item);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn key_of(item: &Item) -> Result<String, StoreError> {
    item.get(KEY_ATTRIBUTE)
        .and_then(AttributeValue::as_s)
        .map(str::to_string)
        .ok_or_else(|| {
            StoreError::InvalidData(format!("missing string key attribute `{KEY_ATTRIBUTE}`"))
        })
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let id = key_of(&item)?;
        self.record_write();
        self.tables
            .write()
            .await
            .items
            .entry(table.to_string())
            .or_default()
            .insert(id, item);
        Ok(())
    }

    async fn get(&self, table: &str, key: Item) -> Result<Option<Item>, StoreError> {
        let id = key_of(&key)?;
        let tables = self.tables.read().await;
        Ok(tables.items.get(table).and_then(|t| t.get(&id)).cloned())
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read().await;
        if tables.denied_scans.contains(table) {
            return Err(StoreError::AccessDenied {
                table: table.to_string(),
                message: "scan is not permitted".to_string(),
            });
        }
        Ok(tables
            .items
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query(
        &self,
        table: &str,
        _index: &str,
        condition: &KeyCondition,
    ) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(table)
            .map(|t| {
                t.values()
                    .filter(|item| item.get(&condition.attribute) == Some(&condition.value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, table: &str, key: Item) -> Result<bool, StoreError> {
        let id = key_of(&key)?;
        self.record_write();
        let mut tables = self.tables.write().await;
        Ok(tables
            .items
            .get_mut(table)
            .and_then(|t| t.remove(&id))
            .is_some())
    }

    async fn update(
        &self,
        table: &str,
        key: Item,
        changes: Item,
    ) -> Result<Option<Item>, StoreError> {
        let id = key_of(&key)?;
        let mut tables = self.tables.write().await;
        let Some(item) = tables.items.get_mut(table).and_then(|t| t.get_mut(&id)) else {
            return Ok(None);
        };
        self.record_write();
        item.extend(changes);
        Ok(Some(item.clone()))
    }

    async fn describe(&self, table: &str) -> Result<TableDescription, StoreError> {
        let tables = self.tables.read().await;
        let count = tables.items.get(table).map_or(0, HashMap::len);
        Ok(TableDescription {
            name: table.to_string(),
            status: "ACTIVE".to_string(),
            item_count: Some(count as i64),
        })
    }
}
