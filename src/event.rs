//! Host event contract
//!
//! The host publishes store mutations as [`StoreNotification`]s. The regeneration
//! scheduler consumes them through the [`EventSource`] capability instead of reading
//! a global store, and checks the contract version before subscribing.

use crate::schema::SchemaSnapshot;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Version of the notification contract understood by this crate
pub const EVENT_CONTRACT_VERSION: u32 = 1;

/// Kind of mutation reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A page or component query was extracted from source
    QueryExtracted,
    /// A static query's text changed
    ReplaceStaticQuery,
    /// Any other host action
    Other(String),
}

impl ActionKind {
    /// Parse the host's action type string
    pub fn from_type(action_type: &str) -> Self {
        match action_type {
            "QUERY_EXTRACTED" => ActionKind::QueryExtracted,
            "REPLACE_STATIC_QUERY" => ActionKind::ReplaceStaticQuery,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::QueryExtracted => "QUERY_EXTRACTED",
            ActionKind::ReplaceStaticQuery => "REPLACE_STATIC_QUERY",
            ActionKind::Other(other) => other,
        }
    }

    /// Whether this action belongs to the regeneration allow-list
    pub fn triggers_regeneration(&self) -> bool {
        matches!(self, ActionKind::QueryExtracted | ActionKind::ReplaceStaticQuery)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single store mutation together with the schema current after it
#[derive(Debug, Clone)]
pub struct StoreNotification {
    pub action: ActionKind,
    pub schema: SchemaSnapshot,
}

/// Capability to observe the host store
pub trait EventSource: Send + Sync {
    /// Contract version implemented by the host
    fn contract_version(&self) -> u32;

    /// Subscribe to all subsequent notifications. The receiver yields `None`
    /// once the source shuts down.
    fn subscribe(&self) -> UnboundedReceiver<StoreNotification>;

    /// Schema that is current right now
    fn current_schema(&self) -> SchemaSnapshot;
}

struct StoreInner {
    schema: RwLock<SchemaSnapshot>,
    subscribers: Mutex<Vec<UnboundedSender<StoreNotification>>>,
    closed: RwLock<bool>,
}

/// In-process host store: holds the current schema and fans notifications out
/// to subscribers.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

impl StateStore {
    pub fn new(schema: SchemaSnapshot) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                schema: RwLock::new(schema),
                subscribers: Mutex::new(Vec::new()),
                closed: RwLock::new(false),
            }),
        }
    }

    /// Record an action and notify every live subscriber
    pub fn dispatch(&self, action: ActionKind) {
        let schema = self.inner.schema.read().clone();
        let notification = StoreNotification { action, schema };
        trace!(action = %notification.action, "Dispatching store notification");

        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    /// Swap the current schema without notifying
    pub fn replace_schema(&self, schema: SchemaSnapshot) {
        *self.inner.schema.write() = schema;
    }

    /// Drop all subscriptions; receivers observe end of stream
    pub fn close(&self) {
        *self.inner.closed.write() = true;
        self.inner.subscribers.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl EventSource for StateStore {
    fn contract_version(&self) -> u32 {
        EVENT_CONTRACT_VERSION
    }

    fn subscribe(&self) -> UnboundedReceiver<StoreNotification> {
        let (tx, rx) = unbounded_channel();
        if !*self.inner.closed.read() {
            self.inner.subscribers.lock().push(tx);
        }
        rx
    }

    fn current_schema(&self) -> SchemaSnapshot {
        self.inner.schema.read().clone()
    }
}
