//! In-process topic bus with latest-message semantics.
//!
//! Stands in for the real message transport: producers [`publish`] typed
//! messages onto named topics; consumers hold a [`Subscriber`] and either
//! poll [`Subscriber::latest`] or register a callback that runs on the
//! publishing thread — the "network callback" side of the sync/async
//! protocol. Each topic keeps only its most recent message; callbacks see
//! every message.
//!
//! [`publish`]: TopicBus::publish

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

type Payload = Arc<dyn Any + Send + Sync>;

struct Listener {
    id: u64,
    callback: Box<dyn Fn(&Payload) + Send + Sync>,
}

struct TopicState {
    name: String,
    latest: Mutex<Option<Payload>>,
    listeners: Mutex<Vec<Listener>>,
    revision: AtomicU64,
    next_listener_id: AtomicU64,
}

impl TopicState {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            latest: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
            next_listener_id: AtomicU64::new(1),
        })
    }

    fn deliver(&self, payload: Payload) {
        *self.latest.lock() = Some(payload.clone());
        self.revision.fetch_add(1, Ordering::Release);
        // Listeners run under the listener lock on the publishing thread,
        // so unsubscribing (which takes the same lock) cannot race a
        // callback that is still executing. Callbacks must not publish to
        // their own topic.
        let listeners = self.listeners.lock();
        for listener in listeners.iter() {
            (listener.callback)(&payload);
        }
    }
}

/// Registry of named topics. Cheap to share; hand an `Arc<TopicBus>` to every
/// producer and display instead of going through global state.
#[derive(Default)]
pub struct TopicBus {
    topics: DashMap<String, Arc<TopicState>>,
}

impl TopicBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn topic(&self, name: &str) -> Arc<TopicState> {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| TopicState::new(name))
            .clone()
    }

    /// Publishes a message, waking all current subscribers' callbacks on
    /// this thread.
    pub fn publish<T: Any + Send + Sync>(&self, topic: &str, message: T) {
        let payload: Payload = Arc::new(message);
        self.topic(topic).deliver(payload);
    }

    /// Creates a subscription handle. Subscribing never fails; a topic with
    /// no publisher simply has no latest message yet.
    pub fn subscribe<T: Any + Send + Sync>(&self, topic: &str) -> Subscriber<T> {
        Subscriber {
            state: self.topic(topic),
            listener_id: Mutex::new(None),
            _message: PhantomData,
        }
    }

    /// Creates a reusable publishing handle for one topic.
    pub fn advertise<T: Any + Send + Sync>(&self, topic: &str) -> Publisher<T> {
        Publisher {
            state: self.topic(topic),
            _message: PhantomData,
        }
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Typed publishing handle bound to one topic.
pub struct Publisher<T> {
    state: Arc<TopicState>,
    _message: PhantomData<fn(T)>,
}

impl<T: Any + Send + Sync> Publisher<T> {
    pub fn publish(&self, message: T) {
        self.state.deliver(Arc::new(message));
    }

    pub fn topic(&self) -> &str {
        &self.state.name
    }
}

/// Typed subscription handle. Dropping it unregisters its callback under the
/// topic's listener lock, so no callback outlives the subscriber.
pub struct Subscriber<T> {
    state: Arc<TopicState>,
    listener_id: Mutex<Option<u64>>,
    _message: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Subscriber<T> {
    /// The most recent message on this topic, if any. A payload of a
    /// different type (topic reused with another message type) reads as
    /// absent.
    pub fn latest(&self) -> Option<Arc<T>> {
        let payload = self.state.latest.lock().clone()?;
        match payload.downcast::<T>() {
            Ok(message) => Some(message),
            Err(_) => {
                tracing::debug!(topic = %self.state.name, "latest message has unexpected type");
                None
            }
        }
    }

    /// Monotonic counter bumped on every publish; pair with [`Watcher`] to
    /// detect new messages.
    pub fn revision(&self) -> u64 {
        self.state.revision.load(Ordering::Acquire)
    }

    pub fn topic(&self) -> &str {
        &self.state.name
    }

    /// Installs the message callback, replacing any previous one. The
    /// callback runs on the publishing thread for every message.
    pub fn set_callback(&self, callback: impl Fn(Arc<T>) + Send + Sync + 'static) {
        let id = self.state.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let topic = self.state.name.clone();
        let wrapped = Box::new(move |payload: &Payload| {
            match payload.clone().downcast::<T>() {
                Ok(message) => callback(message),
                Err(_) => {
                    tracing::debug!(topic = %topic, "dropping message with unexpected type")
                }
            }
        });

        let mut guard = self.listener_id.lock();
        let mut listeners = self.state.listeners.lock();
        if let Some(old) = guard.take() {
            listeners.retain(|l| l.id != old);
        }
        listeners.push(Listener {
            id,
            callback: wrapped,
        });
        *guard = Some(id);
    }

}

impl<T> Drop for Subscriber<T> {
    fn drop(&mut self) {
        if let Some(id) = self.listener_id.lock().take() {
            self.state.listeners.lock().retain(|l| l.id != id);
        }
    }
}

/// Change detector: remembers the last observed value and reports whether a
/// new observation differs.
#[derive(Debug, Default)]
pub struct Watcher<T> {
    last: Option<T>,
}

impl<T: PartialEq> Watcher<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// True exactly when `current` differs from the previously observed
    /// value (or on the first observation).
    pub fn changed(&mut self, current: T) -> bool {
        if self.last.as_ref() == Some(&current) {
            false
        } else {
            self.last = Some(current);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn latest_message_semantics() {
        let bus = TopicBus::new();
        let sub = bus.subscribe::<i32>("numbers");
        assert!(sub.latest().is_none());

        bus.publish("numbers", 1i32);
        bus.publish("numbers", 2i32);
        assert_eq!(*sub.latest().unwrap(), 2);
        assert_eq!(sub.revision(), 2);
    }

    #[test]
    fn callbacks_see_every_message() {
        let bus = TopicBus::new();
        let sub = bus.subscribe::<i32>("numbers");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sub.set_callback(move |n| sink.lock().push(*n));

        bus.publish("numbers", 1i32);
        bus.publish("numbers", 2i32);
        bus.publish("numbers", 3i32);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn dropping_subscriber_stops_delivery() {
        let bus = TopicBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let sub = bus.subscribe::<i32>("numbers");
            let count = count.clone();
            sub.set_callback(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            bus.publish("numbers", 1i32);
        }
        bus.publish("numbers", 2i32);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mismatched_payload_type_reads_as_absent() {
        let bus = TopicBus::new();
        bus.publish("mixed", "text".to_string());
        let sub = bus.subscribe::<i32>("mixed");
        assert!(sub.latest().is_none());
    }

    #[test]
    fn watcher_reports_each_change_once() {
        let mut watcher = Watcher::new();
        assert!(watcher.changed(1u64));
        assert!(!watcher.changed(1u64));
        assert!(watcher.changed(2u64));
        assert!(!watcher.changed(2u64));
    }
}
