//! Document store adapter.
//!
//! A path-addressed hierarchical store with point reads and writes, change subscriptions, and a
//! versioned conditional commit. The commit is the only primitive that spans several paths; plain
//! [`DocumentStore::set`] calls are independent of each other.

mod any;
mod memory;
mod redis_store;

pub use any::AnyStore;
pub use memory::{FaultOp, MemoryStore};
pub use redis_store::RedisStore;

use std::{any::Any, future::Future};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::watch;

use crate::{errors::RepoError, keys::StorePath};

/// A document together with the version it was read at. Version `0` means never written.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Option<Value>,
    pub version: u64,
}

/// One path of a conditional commit. `value: None` deletes the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWrite {
    pub path: StorePath,
    pub value: Option<Value>,
    /// Version the caller read; `None` writes unconditionally.
    pub expected_version: Option<u64>,
}

impl ConditionalWrite {
    pub fn put(path: StorePath, value: Value, expected_version: Option<u64>) -> Self {
        Self {
            path,
            value: Some(value),
            expected_version,
        }
    }

    pub fn delete(path: StorePath, expected_version: Option<u64>) -> Self {
        Self {
            path,
            value: None,
            expected_version,
        }
    }
}

pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Reads the document at `path`, or the object of its children when only descendants exist.
    fn get(&self, path: &StorePath) -> impl Future<Output = Result<Option<Value>, RepoError>> + Send;

    /// Replaces the subtree at `path`. `Value::Null` deletes it.
    fn set(&self, path: &StorePath, value: Value) -> impl Future<Output = Result<(), RepoError>> + Send;

    fn get_versioned(&self, path: &StorePath) -> impl Future<Output = Result<Versioned, RepoError>> + Send;

    /// Applies every write or none of them. Fails with [`RepoError::VersionConflict`] when an
    /// expected version is stale. Returns the new version of each path, in order.
    fn commit(&self, writes: Vec<ConditionalWrite>) -> impl Future<Output = Result<Vec<u64>, RepoError>> + Send;

    /// Opens a watch on `path`. The first value delivered is the current snapshot.
    fn subscribe(&self, path: &StorePath) -> impl Future<Output = Result<Subscription, RepoError>> + Send;

    /// Resolves with the first value the watch delivers and closes the watch before returning.
    fn subscribe_once(&self, path: &StorePath) -> impl Future<Output = Result<Option<Value>, RepoError>> + Send {
        async move {
            let mut subscription = self.subscribe(path).await?;
            let value = subscription.next().await;
            drop(subscription);
            value
        }
    }
}

pub(crate) fn encode<T: Serialize>(path: &StorePath, document: &T) -> Result<Value, RepoError> {
    serde_json::to_value(document).map_err(|err| RepoError::Other {
        message: format!("failed to serialize document at {path}: {err}").into(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(path: &StorePath, value: Value) -> Result<T, RepoError> {
    serde_json::from_value(value).map_err(|err| RepoError::corrupt(&path.to_string(), err))
}

/// A live watch on one path. Dropping it unregisters the watch.
pub struct Subscription {
    path: StorePath,
    receiver: watch::Receiver<Option<Value>>,
    delivered_initial: bool,
    _guard: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    pub(crate) fn new(
        path: StorePath,
        receiver: watch::Receiver<Option<Value>>,
        guard: Box<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            path,
            receiver,
            delivered_initial: false,
            _guard: guard,
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// The current snapshot on the first call, then one value per observed change.
    pub async fn next(&mut self) -> Result<Option<Value>, RepoError> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Ok(self.receiver.borrow_and_update().clone());
        }
        self.receiver
            .changed()
            .await
            .map_err(|_| RepoError::unavailable(format!("watch on {} closed", self.path)))?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("delivered_initial", &self.delivered_initial)
            .finish()
    }
}
