//! Shared application state.
//!
//! Holds one repository per table, the order broadcaster, and the shutdown
//! signal for open order streams. The storage backend is chosen at compile
//! time via feature flags.

use std::sync::Arc;

use tokio::sync::broadcast;

use raven_core::broadcast::OrderBroadcaster;
use raven_core::catalog::{Category, Product};
use raven_core::orders::Order;
use raven_core::storage::{KeyValueStore, Repository};

use crate::config::Config;

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "dynamodb", feature = "inmemory"))]
compile_error!("Cannot enable both 'dynamodb' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "dynamodb")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'dynamodb'");

/// Shared application state, cloned for each request handler.
#[derive(Clone)]
pub struct AppState {
    pub orders: Repository<Order>,
    pub categories: Repository<Category>,
    pub products: Repository<Product>,
    /// Fan-out of created and updated orders to stream subscribers.
    pub broadcaster: OrderBroadcaster,
    pub config: Arc<Config>,
    /// Shutdown signal sender for order stream connections.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Creates the state over `store` using the table names in `config`.
    pub fn new(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            orders: Repository::new(Arc::clone(&store), config.orders_table.clone()),
            categories: Repository::new(Arc::clone(&store), config.categories_table.clone()),
            products: Repository::new(store, config.products_table.clone())
                .with_index(config.products_by_category_index.clone()),
            broadcaster: OrderBroadcaster::new(config.subscriber_buffer),
            config: Arc::new(config),
            shutdown_tx,
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals open streams to close and stops accepting subscribers.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.broadcaster.close();
    }
}

#[cfg(feature = "inmemory")]
impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Arc::new(raven_core::storage::MemoryStore::new()),
            Config::from_env(),
        )
    }
}
