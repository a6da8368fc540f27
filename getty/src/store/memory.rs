use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, Weak},
};

use log::debug;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, watch};

use super::{ConditionalWrite, DocumentStore, Subscription, Versioned};
use crate::{errors::RepoError, keys::StorePath};

/// Which operations an injected fault breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    Read,
    Write,
}

/// In-process document store.
///
/// Cloning shares the underlying data. Besides serving tests and single-process deployments it
/// can inject transport faults (per path, or after a budget of successful writes) so that
/// failure handling in the repositories can be exercised deterministically.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    watchers: Mutex<Watchers>,
    faults: Mutex<Faults>,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<StorePath, Value>,
    versions: HashMap<StorePath, u64>,
}

#[derive(Default)]
struct Watchers {
    next_id: u64,
    entries: Vec<Watcher>,
}

struct Watcher {
    id: u64,
    path: StorePath,
    sender: watch::Sender<Option<Value>>,
}

#[derive(Default)]
struct Faults {
    paths: Vec<(StorePath, FaultOp)>,
    writes_remaining: Option<usize>,
}

struct WatchGuard {
    inner: Weak<Inner>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade()
            && let Ok(mut watchers) = inner.watchers.lock()
        {
            watchers.entries.retain(|watcher| watcher.id != self.id);
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `op` on `path` or below it fail with a transport error.
    pub fn fail_path(&self, path: StorePath, op: FaultOp) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.paths.push((path, op));
        }
    }

    /// Lets `count` more writes succeed, then fails every write.
    pub fn fail_writes_after(&self, count: usize) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.writes_remaining = Some(count);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            *faults = Faults::default();
        }
    }

    /// Number of open watches, across all paths.
    pub fn watcher_count(&self) -> usize {
        self.inner
            .watchers
            .lock()
            .map(|watchers| watchers.entries.len())
            .unwrap_or_default()
    }

    fn check_fault(&self, path: &StorePath, op: FaultOp) -> Result<(), RepoError> {
        let mut faults = self
            .inner
            .faults
            .lock()
            .map_err(|_| RepoError::unavailable("fault registry poisoned"))?;
        let broken = faults
            .paths
            .iter()
            .any(|(fault_path, fault_op)| *fault_op == op && (fault_path == path || fault_path.is_ancestor_of(path)));
        if broken {
            return Err(RepoError::unavailable(format!("injected {op:?} fault on {path}")));
        }
        if op == FaultOp::Write
            && let Some(remaining) = faults.writes_remaining.as_mut()
        {
            if *remaining == 0 {
                return Err(RepoError::unavailable(format!("injected write fault on {path}")));
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn notify(&self, state: &State, changed: &[StorePath]) {
        let Ok(watchers) = self.inner.watchers.lock() else {
            return;
        };
        for watcher in &watchers.entries {
            if changed.iter().any(|path| path.overlaps(&watcher.path)) {
                watcher.sender.send_replace(state.snapshot(&watcher.path));
            }
        }
    }
}

impl State {
    fn snapshot(&self, path: &StorePath) -> Option<Value> {
        if let Some(value) = self.documents.get(path) {
            return Some(value.clone());
        }
        let depth = path.segments().len();
        let mut root = Map::new();
        for (child_path, value) in self
            .documents
            .range(path.clone()..)
            .skip_while(|(candidate, _)| *candidate == path)
            .take_while(|(candidate, _)| path.is_ancestor_of(candidate))
        {
            insert_nested(&mut root, &child_path.segments()[depth..], value.clone());
        }
        if root.is_empty() { None } else { Some(Value::Object(root)) }
    }

    fn version(&self, path: &StorePath) -> u64 {
        self.versions.get(path).copied().unwrap_or_default()
    }

    fn write(&mut self, path: &StorePath, value: Option<Value>) -> u64 {
        let descendants: Vec<StorePath> = self
            .documents
            .range(path.clone()..)
            .take_while(|(candidate, _)| *candidate == path || path.is_ancestor_of(candidate))
            .map(|(candidate, _)| candidate.clone())
            .collect();
        for descendant in descendants {
            self.documents.remove(&descendant);
            if descendant != *path {
                *self.versions.entry(descendant).or_default() += 1;
            }
        }
        if let Some(value) = value.filter(|value| !value.is_null()) {
            self.documents.insert(path.clone(), value);
        }
        let version = self.versions.entry(path.clone()).or_default();
        *version += 1;
        *version
    }
}

fn insert_nested(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.clone(), value);
        return;
    }
    let entry = map
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(child) = entry {
        insert_nested(child, rest, value);
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, RepoError> {
        self.check_fault(path, FaultOp::Read)?;
        let state = self.inner.state.read().await;
        Ok(state.snapshot(path))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RepoError> {
        self.check_fault(path, FaultOp::Write)?;
        let mut state = self.inner.state.write().await;
        let version = state.write(path, Some(value));
        debug!("memory set {path} -> v{version}");
        self.notify(&state, std::slice::from_ref(path));
        Ok(())
    }

    async fn get_versioned(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        self.check_fault(path, FaultOp::Read)?;
        let state = self.inner.state.read().await;
        Ok(Versioned {
            value: state.snapshot(path),
            version: state.version(path),
        })
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<u64>, RepoError> {
        for write in &writes {
            self.check_fault(&write.path, FaultOp::Write)?;
        }
        let mut state = self.inner.state.write().await;
        for write in &writes {
            let actual = state.version(&write.path);
            if let Some(expected) = write.expected_version
                && expected != actual
            {
                debug!("memory commit rejected at {}: expected v{expected}, found v{actual}", write.path);
                return Err(RepoError::VersionConflict {
                    path: write.path.to_string(),
                    expected: Some(expected),
                    actual,
                });
            }
        }
        let mut versions = Vec::with_capacity(writes.len());
        let mut changed = Vec::with_capacity(writes.len());
        for write in writes {
            versions.push(state.write(&write.path, write.value));
            changed.push(write.path);
        }
        self.notify(&state, &changed);
        Ok(versions)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RepoError> {
        self.check_fault(path, FaultOp::Read)?;
        let state = self.inner.state.read().await;
        let (sender, receiver) = watch::channel(state.snapshot(path));
        let mut watchers = self
            .inner
            .watchers
            .lock()
            .map_err(|_| RepoError::unavailable("watch registry poisoned"))?;
        let id = watchers.next_id;
        watchers.next_id += 1;
        watchers.entries.push(Watcher {
            id,
            path: path.clone(),
            sender,
        });
        drop(watchers);
        drop(state);
        let guard = WatchGuard {
            inner: Arc::downgrade(&self.inner),
            id,
        };
        Ok(Subscription::new(path.clone(), receiver, Box::new(guard)))
    }
}
