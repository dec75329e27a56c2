//! Process-wide fan-out of order events to streaming subscribers.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a full
//! queue loses that one event for that one subscriber, and a closed queue is
//! pruned from the registry.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::task::{Context, Poll};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::Stream;

use crate::orders::Order;

/// Queue length used when none is configured.
pub const DEFAULT_BUFFER: usize = 64;

/// Broadcaster of stored orders.
pub type OrderBroadcaster = Broadcaster<Order>;

struct Registry<T> {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<T>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<T> Registry<T> {
    fn remove(&self, id: u64) -> bool {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

/// Publisher side of the fan-out. Cheap to clone; clones share subscribers.
pub struct Broadcaster<T> {
    registry: Arc<Registry<T>>,
    buffer: usize,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            buffer: self.buffer,
        }
    }
}

impl<T: Clone + Send + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Creates a broadcaster whose subscribers each buffer up to `buffer` events.
    pub fn new(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
            buffer: buffer.max(1),
        }
    }

    /// Registers a new subscriber.
    ///
    /// After [`Broadcaster::close`] the returned subscription is already ended.
    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);

        {
            // `closed` is only flipped under this lock, so a subscriber is
            // either cleared by `close` or never registered.
            let mut subscribers = self
                .registry
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.is_closed() {
                subscribers.insert(id, sender);
                tracing::debug!(subscriber = id, "subscribed");
            }
        }

        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
            active: true,
        }
    }

    /// Offers `event` to every subscriber and returns how many accepted it.
    pub fn broadcast(&self, event: &T) -> usize {
        let snapshot: Vec<(u64, mpsc::Sender<T>)> = self
            .registry
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut departed = Vec::new();
        for (id, sender) in snapshot {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = id, "subscriber queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => departed.push(id),
            }
        }

        for id in departed {
            if self.registry.remove(id) {
                tracing::debug!(subscriber = id, "pruned closed subscriber");
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Ends every subscription and refuses new ones.
    pub fn close(&self) {
        let dropped = {
            let mut subscribers = self
                .registry
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            self.registry.closed.store(true, Ordering::SeqCst);
            let count = subscribers.len();
            subscribers.clear();
            count
        };
        tracing::info!(subscribers = dropped, "broadcaster closed");
    }

    pub fn is_closed(&self) -> bool {
        self.registry.closed.load(Ordering::SeqCst)
    }
}

/// Receiving side of one subscriber.
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription<T> {
    id: u64,
    receiver: mpsc::Receiver<T>,
    registry: Weak<Registry<T>>,
    active: bool,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event; `None` once unsubscribed or closed.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Removes this subscriber from the registry. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.receiver.close();
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                tracing::debug!(subscriber = self.id, "unsubscribed");
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::orders::OrderItem;

    fn order(id: &str) -> Order {
        Order::new(vec![OrderItem::new("p1", 1, 2.5)]).with_id(id)
    }

    async fn next(subscription: &mut Subscription<Order>) -> Option<Order> {
        timeout(Duration::from_secs(1), subscription.recv())
            .await
            .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_each_event() {
        let broadcaster = OrderBroadcaster::new(8);
        let mut subscriptions: Vec<_> = (0..3).map(|_| broadcaster.subscribe()).collect();

        assert_eq!(broadcaster.broadcast(&order("o1")), 3);

        for subscription in &mut subscriptions {
            assert_eq!(next(subscription).await.unwrap().id, "o1");
        }
    }

    #[tokio::test]
    async fn test_unsubscribed_subscriber_is_skipped() {
        let broadcaster = OrderBroadcaster::new(8);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        let mut c = broadcaster.subscribe();

        b.unsubscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);
        assert_eq!(broadcaster.broadcast(&order("o1")), 2);

        assert_eq!(next(&mut a).await.unwrap().id, "o1");
        assert_eq!(next(&mut c).await.unwrap().id, "o1");
        assert_eq!(b.recv().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_drop_unsubscribes() {
        let broadcaster = OrderBroadcaster::new(8);
        let mut a = broadcaster.subscribe();
        let b = broadcaster.subscribe();
        let _c = broadcaster.subscribe();

        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(b);
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(a);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let broadcaster = OrderBroadcaster::new(1);
        let _stalled = broadcaster.subscribe();
        let mut live = broadcaster.subscribe();

        assert_eq!(broadcaster.broadcast(&order("o1")), 2);
        assert_eq!(next(&mut live).await.unwrap().id, "o1");

        // The stalled queue is full now; only the live subscriber gets it.
        assert_eq!(broadcaster.broadcast(&order("o2")), 1);
        assert_eq!(next(&mut live).await.unwrap().id, "o2");
        assert_eq!(broadcaster.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_close_ends_all_streams() {
        let broadcaster = OrderBroadcaster::new(8);
        let mut a = broadcaster.subscribe();

        broadcaster.close();

        assert!(broadcaster.is_closed());
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(next(&mut a).await, None);

        let mut late = broadcaster.subscribe();
        assert_eq!(next(&mut late).await, None);
        assert_eq!(broadcaster.broadcast(&order("o1")), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribe_racing_close_never_leaves_open_subscription() {
        for _ in 0..50 {
            let broadcaster = OrderBroadcaster::new(4);

            let subscribers: Vec<_> = (0..4)
                .map(|_| {
                    let broadcaster = broadcaster.clone();
                    tokio::spawn(async move {
                        let mut subscriptions = Vec::new();
                        for _ in 0..20 {
                            subscriptions.push(broadcaster.subscribe());
                            tokio::task::yield_now().await;
                        }
                        subscriptions
                    })
                })
                .collect();
            let closer = {
                let broadcaster = broadcaster.clone();
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    broadcaster.close();
                })
            };

            closer.await.unwrap();
            for handle in subscribers {
                for mut subscription in handle.await.unwrap() {
                    assert_eq!(next(&mut subscription).await, None);
                }
            }
            assert_eq!(broadcaster.subscriber_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_subscription_is_a_stream() {
        let broadcaster = OrderBroadcaster::new(8);
        let subscription = broadcaster.subscribe();

        broadcaster.broadcast(&order("o1"));
        broadcaster.broadcast(&order("o2"));
        broadcaster.close();

        let ids: Vec<String> = subscription.map(|o| o.id).collect().await;
        assert_eq!(ids, vec!["o1", "o2"]);
    }

    #[tokio::test]
    async fn test_subscription_outliving_broadcaster() {
        let broadcaster = OrderBroadcaster::new(8);
        let mut subscription = broadcaster.subscribe();
        drop(broadcaster);

        assert_eq!(next(&mut subscription).await, None);
        subscription.unsubscribe();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_subscribe_and_broadcast() {
        let broadcaster = OrderBroadcaster::new(4);

        let churn = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let mut subscription = broadcaster.subscribe();
                    tokio::task::yield_now().await;
                    subscription.unsubscribe();
                }
            })
        };
        let publish = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    broadcaster.broadcast(&order(&format!("o{i}")));
                    tokio::task::yield_now().await;
                }
            })
        };

        churn.await.unwrap();
        publish.await.unwrap();
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
