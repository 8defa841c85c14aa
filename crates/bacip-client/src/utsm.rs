//! Subscriptions for unconfirmed replies.
//!
//! A Who-Is is answered by any number of I-Am broadcasts trickling in over
//! a few seconds. Callers subscribe before sending, and the dispatcher
//! publishes every I-Am it decodes. A subscription ends after its overall
//! lifetime, or earlier once no value has arrived for the idle timeout.

use futures_util::stream::{self, Stream};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SubscriberConfig {
    /// Lifetime of a subscription, however busy it is.
    pub subscriber_timeout: Duration,
    /// Gap after which a quiet subscription ends.
    pub last_received_timeout: Duration,
    /// Values queued per subscription before publishes start dropping.
    pub buffer: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            subscriber_timeout: Duration::from_secs(10),
            last_received_timeout: Duration::from_secs(2),
            buffer: 64,
        }
    }
}

impl SubscriberConfig {
    pub fn with_subscriber_timeout(mut self, timeout: Duration) -> Self {
        self.subscriber_timeout = timeout;
        self
    }

    pub fn with_last_received_timeout(mut self, timeout: Duration) -> Self {
        self.last_received_timeout = timeout;
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

/// Which published keys reach a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberFilter {
    Key(u32),
    Range(RangeInclusive<u32>),
    All,
}

impl SubscriberFilter {
    pub fn matches(&self, key: u32) -> bool {
        match self {
            Self::Key(k) => *k == key,
            Self::Range(range) => range.contains(&key),
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Expired,
    Cancelled,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct Entry<T> {
    id: u64,
    filter: SubscriberFilter,
    tx: Mutex<Option<mpsc::Sender<T>>>,
    expires_at: Instant,
    idle: Duration,
    last_received: Mutex<Instant>,
    cancelled: AtomicBool,
}

impl<T> Entry<T> {
    fn deadline(&self) -> Instant {
        let idle_deadline = *lock(&self.last_received) + self.idle;
        idle_deadline.min(self.expires_at)
    }

    fn state(&self, now: Instant) -> SubscriptionState {
        if self.cancelled.load(Ordering::Acquire) {
            SubscriptionState::Cancelled
        } else if now >= self.deadline() {
            SubscriptionState::Expired
        } else {
            SubscriptionState::Active
        }
    }

    /// Closes the channel. Only an active entry becomes `Cancelled`.
    fn cancel(&self) {
        if self.state(Instant::now()) == SubscriptionState::Active {
            self.cancelled.store(true, Ordering::Release);
        }
        lock(&self.tx).take();
    }
}

#[derive(Debug)]
struct Registry<T> {
    next_id: AtomicU64,
    entries: RwLock<HashMap<u64, Arc<Entry<T>>>>,
}

impl<T> Registry<T> {
    fn remove(&self, ids: &[u64]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            if let Some(entry) = entries.remove(id) {
                lock(&entry.tx).take();
            }
        }
    }
}

/// Fan-out point between the dispatcher and discovery callers.
#[derive(Debug)]
pub struct Manager<T> {
    config: SubscriberConfig,
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Manager<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            registry: self.registry.clone(),
        }
    }
}

impl<T: Clone + Send> Manager<T> {
    pub fn new(config: SubscriberConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(0),
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    pub fn subscribe(&self, filter: SubscriberFilter) -> Subscription<T> {
        self.subscribe_with(filter, self.config)
    }

    pub fn subscribe_with(&self, filter: SubscriberFilter, config: SubscriberConfig) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(config.buffer.max(1));
        let now = Instant::now();
        let entry = Arc::new(Entry {
            id: self.registry.next_id.fetch_add(1, Ordering::Relaxed),
            filter,
            tx: Mutex::new(Some(tx)),
            expires_at: now + config.subscriber_timeout,
            idle: config.last_received_timeout,
            last_received: Mutex::new(now),
            cancelled: AtomicBool::new(false),
        });
        self.registry
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.id, entry.clone());
        log::trace!("subscription {} registered for {:?}", entry.id, entry.filter);

        Subscription {
            entry,
            rx,
            registry: self.registry.clone(),
        }
    }

    /// Offers `value` to every active subscription whose filter matches
    /// `key` and returns how many took it.
    ///
    /// Never waits: a subscriber with a full queue misses this value.
    pub fn publish(&self, key: u32, value: T) -> usize {
        let now = Instant::now();
        let mut delivered = 0;
        let mut finished = Vec::new();
        {
            let entries = self
                .registry
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for entry in entries.values() {
                if entry.state(now) != SubscriptionState::Active {
                    finished.push(entry.id);
                    continue;
                }
                if !entry.filter.matches(key) {
                    continue;
                }
                let sender = lock(&entry.tx);
                let Some(tx) = sender.as_ref() else {
                    finished.push(entry.id);
                    continue;
                };
                match tx.try_send(value.clone()) {
                    Ok(()) => {
                        *lock(&entry.last_received) = now;
                        delivered += 1;
                    }
                    Err(TrySendError::Full(_)) => {
                        log::warn!("subscription {} is full, dropping value for key {key}", entry.id);
                    }
                    Err(TrySendError::Closed(_)) => finished.push(entry.id),
                }
            }
        }
        if !finished.is_empty() {
            log::trace!("pruning {} finished subscriptions", finished.len());
            self.registry.remove(&finished);
        }
        delivered
    }

    pub fn unsubscribe(&self, subscription: &Subscription<T>) {
        subscription.entry.cancel();
        self.registry.remove(&[subscription.entry.id]);
    }

    /// Registered subscriptions, including finished ones not yet pruned.
    pub fn len(&self) -> usize {
        self.registry
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiving side of one subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    entry: Arc<Entry<T>>,
    rx: mpsc::Receiver<T>,
    registry: Arc<Registry<T>>,
}

impl<T> Subscription<T> {
    pub fn state(&self) -> SubscriptionState {
        self.entry.state(Instant::now())
    }

    pub fn filter(&self) -> &SubscriberFilter {
        &self.entry.filter
    }

    /// Next published value, or `None` once the subscription has expired
    /// or been cancelled.
    ///
    /// Values accepted before expiry are still handed out; a cancelled
    /// subscription discards whatever is queued.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.state() {
                SubscriptionState::Active => {}
                SubscriptionState::Expired => {
                    self.detach();
                    self.rx.close();
                    return self.rx.try_recv().ok();
                }
                SubscriptionState::Cancelled => {
                    self.detach();
                    return None;
                }
            }
            // A publish moves the deadline, so re-check rather than trust
            // the one computed here.
            if let Ok(value) = tokio::time::timeout_at(self.entry.deadline(), self.rx.recv()).await {
                return value;
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.detach();
        self.rx.close();
    }

    pub fn into_stream(self) -> impl Stream<Item = T> {
        stream::unfold(self, |mut sub| async move {
            let value = sub.recv().await?;
            Some((value, sub))
        })
    }

    fn detach(&self) {
        self.entry.cancel();
        self.registry.remove(&[self.entry.id]);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::{Manager, SubscriberConfig, SubscriberFilter, SubscriptionState};
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio::time::{advance, timeout};

    fn manager() -> Manager<&'static str> {
        Manager::new(SubscriberConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn idle_gap_ends_subscription() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);

        advance(Duration::from_secs(1)).await;
        assert_eq!(manager.publish(1, "a"), 1);
        assert_eq!(sub.recv().await, Some("a"));

        advance(Duration::from_millis(1500)).await;
        assert_eq!(manager.publish(2, "b"), 1);
        assert_eq!(sub.recv().await, Some("b"));

        advance(Duration::from_millis(1900)).await;
        assert_eq!(sub.state(), SubscriptionState::Active);
        advance(Duration::from_millis(200)).await;
        assert_eq!(sub.state(), SubscriptionState::Expired);

        assert_eq!(manager.publish(3, "c"), 0);
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.state(), SubscriptionState::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn values_queued_before_expiry_are_still_received() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);

        advance(Duration::from_millis(1900)).await;
        assert_eq!(manager.publish(1, "a"), 1);
        assert_eq!(manager.publish(2, "b"), 1);

        // Idle gap measured from the last publish runs out here.
        advance(Duration::from_millis(2100)).await;
        assert_eq!(sub.state(), SubscriptionState::Expired);
        assert_eq!(manager.publish(3, "c"), 0);

        assert_eq!(sub.recv().await, Some("a"));
        assert_eq!(sub.recv().await, Some("b"));
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.state(), SubscriptionState::Expired);
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_values_survive_lifetime_in_stream() {
        let manager = manager();
        let sub = manager.subscribe(SubscriberFilter::Key(4));
        for _ in 0..9 {
            advance(Duration::from_secs(1)).await;
            manager.publish(4, "tick");
        }
        advance(Duration::from_secs(2)).await;
        assert_eq!(sub.state(), SubscriptionState::Expired);

        let values: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(values, vec!["tick"; 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_subscription_discards_queue() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);
        assert_eq!(manager.publish(1, "a"), 1);
        sub.unsubscribe();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn recv_returns_none_at_idle_deadline() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);
        let start = tokio::time::Instant::now();
        assert_eq!(sub.recv().await, None);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_millis(2010));
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_ends_busy_subscription() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::Key(7));
        for _ in 0..9 {
            advance(Duration::from_secs(1)).await;
            assert_eq!(manager.publish(7, "tick"), 1);
            assert_eq!(sub.recv().await, Some("tick"));
        }
        advance(Duration::from_secs(1)).await;
        assert_eq!(manager.publish(7, "late"), 0);
        assert_eq!(sub.state(), SubscriptionState::Expired);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn filters_select_keys() {
        let manager = manager();
        let mut key = manager.subscribe(SubscriberFilter::Key(5));
        let mut range = manager.subscribe(SubscriberFilter::Range(10..=20));
        let mut all = manager.subscribe(SubscriberFilter::All);

        assert_eq!(manager.publish(5, "five"), 2);
        assert_eq!(manager.publish(15, "fifteen"), 2);
        assert_eq!(manager.publish(30, "thirty"), 1);

        assert_eq!(key.recv().await, Some("five"));
        assert_eq!(range.recv().await, Some("fifteen"));
        assert_eq!(all.recv().await, Some("five"));
        assert_eq!(all.recv().await, Some("fifteen"));
        assert_eq!(all.recv().await, Some("thirty"));

        let quiet = Duration::from_millis(10);
        assert!(timeout(quiet, key.recv()).await.is_err());
        assert!(timeout(quiet, range.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_only_for_that_subscriber() {
        let manager = manager();
        let mut small = manager.subscribe_with(
            SubscriberFilter::All,
            SubscriberConfig::default().with_buffer(1),
        );
        let mut roomy = manager.subscribe(SubscriberFilter::All);

        assert_eq!(manager.publish(1, "first"), 2);
        assert_eq!(manager.publish(2, "second"), 1);

        assert_eq!(small.recv().await, Some("first"));
        assert_eq!(roomy.recv().await, Some("first"));
        assert_eq!(roomy.recv().await, Some("second"));
        assert!(timeout(Duration::from_millis(10), small.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_is_terminal_and_idempotent() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);
        let other = manager.subscribe(SubscriberFilter::All);
        assert_eq!(manager.len(), 2);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(sub.state(), SubscriptionState::Cancelled);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.publish(1, "x"), 1);
        assert_eq!(sub.recv().await, None);

        manager.unsubscribe(&other);
        manager.unsubscribe(&other);
        assert_eq!(other.state(), SubscriptionState::Cancelled);
        assert!(manager.is_empty());
        assert_eq!(manager.publish(1, "y"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manager_unsubscribe_wakes_receiver() {
        let manager = manager();
        let mut sub = manager.subscribe(SubscriberFilter::All);
        manager.unsubscribe(&sub);
        let start = tokio::time::Instant::now();
        assert_eq!(sub.recv().await, None);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_subscriptions_are_pruned() {
        let manager = manager();
        let sub = manager.subscribe(SubscriberFilter::All);
        let dropped = manager.subscribe(SubscriberFilter::All);
        drop(dropped);
        assert_eq!(manager.len(), 1);

        advance(Duration::from_secs(3)).await;
        assert_eq!(sub.state(), SubscriptionState::Expired);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.publish(1, "x"), 0);
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_until_quiet() {
        let manager = manager();
        let sub = manager.subscribe(SubscriberFilter::All);
        for value in ["a", "b", "c"] {
            manager.publish(1, value);
        }
        let values: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(values, vec!["a", "b", "c"]);
        assert!(manager.is_empty());
    }
}
