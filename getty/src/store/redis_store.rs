use std::collections::HashMap;

use futures_util::StreamExt;
use log::{debug, warn};
use redis::aio::ConnectionManager;
use serde_json::{Map, Value};
use tokio::{sync::watch, task::JoinHandle};

use super::{ConditionalWrite, DocumentStore, Subscription, Versioned};
use crate::{
    errors::RepoError,
    keys::{KeyContext, StorePath},
    runtime::{commands::CommitCommand, executor::execute_commit},
};

/// Redis-backed document store.
///
/// Each document is a JSON string stored as one field of the hash named after its parent path,
/// so reading a user's posts is a single `HGETALL`. Versions sit in a parallel hash and every
/// write goes through the batch commit script, which also publishes the written paths for
/// subscribers. Reads of a path return its own document or, failing that, its direct children.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, RepoError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            prefix: prefix.into(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    fn channel(&self) -> String {
        format!("{}:__changes", self.prefix)
    }

    async fn read(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        let keys = self.keys();
        let (hash, versions, field) = keys.document(path);
        let mut conn = self.conn.clone();
        let (document, version, children): (Option<String>, Option<u64>, HashMap<String, String>) = redis::pipe()
            .atomic()
            .hget(&hash, &field)
            .hget(&versions, &field)
            .hgetall(keys.hash_key(Some(path)))
            .query_async(&mut conn)
            .await?;

        let value = match document {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| RepoError::corrupt(&path.to_string(), err))?),
            None if children.is_empty() => None,
            None => {
                let mut object = Map::new();
                for (child, raw) in children {
                    let value = serde_json::from_str(&raw)
                        .map_err(|err| RepoError::corrupt(&format!("{path}/{child}"), err))?;
                    object.insert(child, value);
                }
                Some(Value::Object(object))
            }
        };
        Ok(Versioned {
            value,
            version: version.unwrap_or_default(),
        })
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl DocumentStore for RedisStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, RepoError> {
        Ok(self.read(path).await?.value)
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RepoError> {
        let write = if value.is_null() {
            ConditionalWrite::delete(path.clone(), None)
        } else {
            ConditionalWrite::put(path.clone(), value, None)
        };
        self.commit(vec![write]).await.map(|_| ())
    }

    async fn get_versioned(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        self.read(path).await
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<u64>, RepoError> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        let command = CommitCommand::build(&self.keys(), self.channel(), &writes)?;
        let mut conn = self.conn.clone();
        let versions = execute_commit(&mut conn, &command).await?;
        debug!("redis commit of {} path(s) -> {versions:?}", writes.len());
        Ok(versions)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RepoError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(self.channel()).await?;
        // Subscribed before the snapshot so no write between the two is missed.
        let initial = self.get(path).await?;
        let (sender, receiver) = watch::channel(initial);

        let store = self.clone();
        let watched = path.clone();
        let task = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(message) = messages.next().await {
                if sender.is_closed() {
                    break;
                }
                let Ok(raw) = message.get_payload::<String>() else {
                    continue;
                };
                let Ok(changed) = StorePath::parse(&raw) else {
                    continue;
                };
                if !changed.overlaps(&watched) {
                    continue;
                }
                match store.get(&watched).await {
                    Ok(value) => {
                        sender.send_replace(value);
                    }
                    Err(err) => {
                        warn!("watch on {watched} stopped: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(path.clone(), receiver, Box::new(AbortOnDrop(task))))
    }
}
