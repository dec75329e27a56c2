//! Generic CRUD orchestration over a [`KeyValueStore`].

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::attribute::{self, AttributeValue, Item};
use crate::catalog::Product;
use crate::keys;
use crate::orders::Order;

use super::entity::timestamp_now;
use super::error::{RepositoryError, Result, StoreError};
use super::traits::{Entity, KeyValueStore};
use super::types::{KeyCondition, StoreOperation, TableDescription};

/// Attribute the products-by-category index is keyed on.
pub const CATEGORY_ATTRIBUTE: &str = "categoryId";

const ALL_ITEMS: &str = "*";

/// Repository for one entity type stored in one table.
pub struct Repository<E> {
    store: Arc<dyn KeyValueStore>,
    table: String,
    index: Option<String>,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
            index: self.index.clone(),
            entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn KeyValueStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            index: None,
            entity: PhantomData,
        }
    }

    /// Sets the secondary index used by [`Repository::find_by_index`].
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Persists a new entity.
    ///
    /// A blank id is replaced with a fresh one; a supplied id must be
    /// UUID-shaped or nothing is written.
    pub async fn create(&self, mut entity: E) -> Result<E> {
        let id = keys::ensure_valid_id(entity.id(), "id")?;
        entity.set_id(id);
        entity.on_create(&timestamp_now());

        let item = self.marshal(&entity)?;
        self.store
            .put(&self.table, item)
            .await
            .map_err(|e| self.store_failure(StoreOperation::Put, entity.id(), e))?;

        tracing::info!(entity = E::KIND, id = entity.id(), table = %self.table, "created");
        Ok(entity)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<E>> {
        keys::validate_id(id, "id")?;
        let item = self
            .store
            .get(&self.table, keys::item_key(id))
            .await
            .map_err(|e| self.store_failure(StoreOperation::Get, id, e))?;

        match item {
            Some(item) if !item.is_empty() => self.unmarshal(item).map(Some),
            _ => Ok(None),
        }
    }

    /// Loads every entity in the table.
    ///
    /// When the scan is denied, the table is probed with a describe call so
    /// the log tells a missing scan permission apart from a missing table.
    pub async fn find_all(&self) -> Result<Vec<E>> {
        let items = match self.store.scan(&self.table).await {
            Ok(items) => items,
            Err(err) => {
                if matches!(err, StoreError::AccessDenied { .. }) {
                    self.probe_access().await;
                }
                return Err(self.store_failure(StoreOperation::Scan, ALL_ITEMS, err));
            }
        };

        tracing::debug!(entity = E::KIND, count = items.len(), "scanned table");
        items
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(|item| self.unmarshal(item))
            .collect()
    }

    /// Replaces an existing entity, keeping the id from `id`.
    pub async fn update(&self, id: &str, mut entity: E) -> Result<E> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| self.not_found(id))?;

        entity.set_id(id.to_string());
        entity.on_update(&existing, &timestamp_now());

        let item = self.marshal(&entity)?;
        self.store
            .put(&self.table, item)
            .await
            .map_err(|e| self.store_failure(StoreOperation::Put, id, e))?;

        tracing::info!(entity = E::KIND, id, "updated");
        Ok(entity)
    }

    /// Deletes an entity, returning false when it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        keys::validate_id(id, "id")?;
        let deleted = self
            .store
            .delete(&self.table, keys::item_key(id))
            .await
            .map_err(|e| self.store_failure(StoreOperation::Delete, id, e))?;

        tracing::info!(entity = E::KIND, id, deleted, "delete");
        Ok(deleted)
    }

    /// Sets the serialized fields of `changes` on an existing entity and
    /// returns the stored result. Fields absent from `changes` are untouched.
    pub async fn update_fields<C>(&self, id: &str, changes: &C) -> Result<E>
    where
        C: Serialize + ?Sized,
    {
        keys::validate_id(id, "id")?;
        let changes = attribute::to_item(changes).map_err(|source| RepositoryError::Marshal {
            entity_type: E::KIND,
            id: id.to_string(),
            source,
        })?;

        let updated = self
            .store
            .update(&self.table, keys::item_key(id), changes)
            .await
            .map_err(|e| self.store_failure(StoreOperation::Update, id, e))?;

        match updated {
            Some(item) => self.unmarshal(item),
            None => Err(self.not_found(id)),
        }
    }

    /// Loads the entities whose `attribute` equals `value` through the
    /// configured secondary index.
    pub async fn find_by_index(
        &self,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<Vec<E>> {
        let index = self.index.as_deref().ok_or_else(|| {
            RepositoryError::Validation(format!("{} has no secondary index", E::KIND))
        })?;
        let condition = KeyCondition::equals(attribute, value);
        let items = self
            .store
            .query(&self.table, index, &condition)
            .await
            .map_err(|e| self.store_failure(StoreOperation::Query, ALL_ITEMS, e))?;

        items.into_iter().map(|item| self.unmarshal(item)).collect()
    }

    pub async fn describe(&self) -> Result<TableDescription> {
        self.store
            .describe(&self.table)
            .await
            .map_err(|e| self.store_failure(StoreOperation::Describe, ALL_ITEMS, e))
    }

    async fn probe_access(&self) {
        match self.store.describe(&self.table).await {
            Ok(description) => tracing::warn!(
                entity = E::KIND,
                table = %self.table,
                status = %description.status,
                "scan denied although the table is reachable; check the scan permission"
            ),
            Err(err) => tracing::warn!(
                entity = E::KIND,
                table = %self.table,
                error = %err,
                "scan denied and the table could not be described"
            ),
        }
    }

    fn marshal(&self, entity: &E) -> Result<Item> {
        attribute::to_item(entity).map_err(|source| RepositoryError::Marshal {
            entity_type: E::KIND,
            id: entity.id().to_string(),
            source,
        })
    }

    fn unmarshal(&self, item: Item) -> Result<E> {
        let id = item
            .get(keys::KEY_ATTRIBUTE)
            .and_then(AttributeValue::as_s)
            .unwrap_or_default()
            .to_string();
        attribute::from_item(item).map_err(|source| {
            tracing::error!(entity = E::KIND, %id, error = %source, "stored item does not match");
            RepositoryError::Unmarshal {
                entity_type: E::KIND,
                id,
                source,
            }
        })
    }

    fn not_found(&self, id: &str) -> RepositoryError {
        RepositoryError::NotFound {
            entity_type: E::KIND,
            id: id.to_string(),
        }
    }

    fn store_failure(
        &self,
        operation: StoreOperation,
        id: &str,
        source: StoreError,
    ) -> RepositoryError {
        tracing::error!(
            entity = E::KIND,
            table = %self.table,
            %operation,
            id,
            error = %source,
            "store call failed"
        );
        RepositoryError::Store {
            entity_type: E::KIND,
            operation,
            id: id.to_string(),
            source,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange<'a> {
    status: &'a str,
    updated_at: String,
}

impl Repository<Order> {
    /// Sets `status` and refreshes `updatedAt`, leaving every other field as stored.
    ///
    /// No transition rules apply; any status text is written.
    pub async fn update_status(&self, id: &str, status: &str) -> Result<Order> {
        let change = StatusChange {
            status,
            updated_at: timestamp_now(),
        };
        let order = self.update_fields(id, &change).await?;
        tracing::info!(id, status, "order status changed");
        Ok(order)
    }
}

impl Repository<Product> {
    pub async fn find_by_category(&self, category_id: &str) -> Result<Vec<Product>> {
        self.find_by_index(CATEGORY_ATTRIBUTE, category_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::Category;
    use crate::orders::{Customer, Modifier, OrderItem};
    use crate::storage::MemoryStore;

    const ORDERS: &str = "orders";
    const VALID_ID: &str = "8f14e45f-ceea-467a-9575-8f2b7e4c9d11";
    const MISSING_ID: &str = "00000000-0000-4000-8000-000000000000";

    fn setup() -> (MemoryStore, Repository<Order>) {
        let store = MemoryStore::new();
        let repo = Repository::new(Arc::new(store.clone()), ORDERS);
        (store, repo)
    }

    fn sample_order() -> Order {
        Order::new(vec![
            OrderItem::new("p1", 3, 8.5).with_modifier(Modifier::new("extra cheese", 1.25)),
            OrderItem::new("p2", 1, 2.0),
        ])
        .with_customer(Customer::new("Ana"))
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let (store, repo) = setup();

        let order = repo.create(sample_order()).await.unwrap();

        assert!(keys::is_valid_id(&order.id));
        assert!(!order.created_at.is_empty());
        assert_eq!(order.created_at, order.updated_at);
        assert_eq!(store.write_count(), 1);

        let other = repo.create(sample_order()).await.unwrap();
        assert_ne!(order.id, other.id);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_valid_id() {
        let (_, repo) = setup();
        let order = repo.create(sample_order().with_id(VALID_ID)).await.unwrap();
        assert_eq!(order.id, VALID_ID);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_id_without_writing() {
        let (store, repo) = setup();

        let err = repo.create(sample_order().with_id("order-1")).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Validation(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_find_by_id_round_trips_all_fields() {
        let (_, repo) = setup();
        let created = repo.create(sample_order()).await.unwrap();

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(found.items[0].quantity, 3);
        assert_eq!(found.items[0].unit_price, 8.5);
        assert_eq!(found.eta_minutes, None);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_and_invalid() {
        let (store, repo) = setup();
        assert_eq!(repo.find_by_id(MISSING_ID).await.unwrap(), None);

        store.seed(ORDERS, VALID_ID, HashMap::new()).await;
        assert_eq!(repo.find_by_id(VALID_ID).await.unwrap(), None);

        assert!(matches!(
            repo.find_by_id("nope").await,
            Err(RepositoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_id_reports_corrupt_item() {
        let (store, repo) = setup();
        let mut item = attribute::to_item(&sample_order().with_id(VALID_ID)).unwrap();
        item.insert("status".to_string(), AttributeValue::N("7".to_string()));
        store.seed(ORDERS, VALID_ID, item).await;

        let err = repo.find_by_id(VALID_ID).await.unwrap_err();

        match err {
            RepositoryError::Unmarshal { id, source, .. } => {
                assert_eq!(id, VALID_ID);
                assert_eq!(source.path.to_string(), "status");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_find_all() {
        let (_, repo) = setup();
        repo.create(sample_order()).await.unwrap();
        repo.create(sample_order()).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_all_denied_surfaces_access_error() {
        let (store, repo) = setup();
        store.deny_scan(ORDERS).await;

        let err = repo.find_all().await.unwrap_err();

        match err {
            RepositoryError::Store {
                operation, source, ..
            } => {
                assert_eq!(operation, StoreOperation::Scan);
                assert!(matches!(source, StoreError::AccessDenied { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_update_missing_fails_without_writing() {
        let (store, repo) = setup();

        let err = repo.update(MISSING_ID, sample_order()).await.unwrap_err();

        assert_eq!(
            err,
            RepositoryError::NotFound {
                entity_type: "Order",
                id: MISSING_ID.to_string(),
            }
        );
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let (_, repo) = setup();
        let created = repo.create(sample_order()).await.unwrap();

        let mut replacement = sample_order().with_notes("no onions");
        replacement.created_at = "1999-01-01T00:00:00.000Z".to_string();
        let updated = repo.update(&created.id, replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("no onions"));
    }

    #[tokio::test]
    async fn test_update_status_touches_only_status_and_updated_at() {
        let (_, repo) = setup();
        let created = repo.create(sample_order()).await.unwrap();

        let updated = repo.update_status(&created.id, "READY").await.unwrap();

        assert_eq!(updated.status, "READY");
        let expected = Order {
            status: "READY".to_string(),
            updated_at: updated.updated_at.clone(),
            ..created
        };
        assert_eq!(updated, expected);
    }

    #[tokio::test]
    async fn test_update_status_missing_order() {
        let (store, repo) = setup();
        let err = repo.update_status(MISSING_ID, "READY").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_, repo) = setup();
        let created = repo.create(sample_order()).await.unwrap();

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(!repo.delete(&created.id).await.unwrap());
        assert_eq!(repo.find_by_id(&created.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_by_category_uses_index() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let categories: Repository<Category> = Repository::new(Arc::clone(&store), "categories");
        let products: Repository<Product> =
            Repository::new(Arc::clone(&store), "products").with_index("categoryId-index");

        let burgers = categories.create(Category::new("Burgers")).await.unwrap();
        let drinks = categories.create(Category::new("Drinks")).await.unwrap();
        products
            .create(Product::new(&burgers.id, "Classic", 9.0))
            .await
            .unwrap();
        products
            .create(Product::new(&drinks.id, "Lemonade", 3.0))
            .await
            .unwrap();

        let found = products.find_by_category(&burgers.id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Classic");
    }

    #[tokio::test]
    async fn test_find_by_index_requires_configured_index() {
        let products: Repository<Product> =
            Repository::new(Arc::new(MemoryStore::new()), "products");
        assert!(matches!(
            products.find_by_category("c1").await,
            Err(RepositoryError::Validation(_))
        ));
    }
}
