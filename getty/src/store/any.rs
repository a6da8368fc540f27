use serde_json::Value;

use super::{ConditionalWrite, DocumentStore, MemoryStore, RedisStore, Subscription, Versioned};
use crate::{
    config::{StoreBackend, StoreConfig},
    errors::RepoError,
    keys::StorePath,
};

/// The store selected at runtime from configuration.
#[derive(Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl AnyStore {
    pub async fn from_config(config: &StoreConfig) -> Result<Self, RepoError> {
        match config.backend {
            StoreBackend::Memory => Ok(AnyStore::Memory(MemoryStore::new())),
            StoreBackend::Redis => {
                let url = config
                    .redis_url()
                    .map_err(|err| RepoError::unavailable(err.to_string()))?;
                Ok(AnyStore::Redis(RedisStore::connect(&url, config.prefix.clone()).await?))
            }
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            AnyStore::Memory(_) => StoreBackend::Memory,
            AnyStore::Redis(_) => StoreBackend::Redis,
        }
    }
}

impl DocumentStore for AnyStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, RepoError> {
        match self {
            AnyStore::Memory(store) => store.get(path).await,
            AnyStore::Redis(store) => store.get(path).await,
        }
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RepoError> {
        match self {
            AnyStore::Memory(store) => store.set(path, value).await,
            AnyStore::Redis(store) => store.set(path, value).await,
        }
    }

    async fn get_versioned(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        match self {
            AnyStore::Memory(store) => store.get_versioned(path).await,
            AnyStore::Redis(store) => store.get_versioned(path).await,
        }
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<u64>, RepoError> {
        match self {
            AnyStore::Memory(store) => store.commit(writes).await,
            AnyStore::Redis(store) => store.commit(writes).await,
        }
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RepoError> {
        match self {
            AnyStore::Memory(store) => store.subscribe(path).await,
            AnyStore::Redis(store) => store.subscribe(path).await,
        }
    }
}
