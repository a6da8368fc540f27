#![allow(dead_code, unused_imports)]

pub(crate) use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

pub(crate) use getty::{
    DateKey, DocumentStore, EdgeIssue, FeedAggregator, FeedPolicy, GettyConfig, GettyService, ImageSource,
    LikeStrategy, MemoryStore, Post, PostDraft, PostImage, PostRepository, RepoError, SocialGraph, WriteMode,
    errors::ErrorKind,
    keys::{friends_path, post_path, posts_path},
    store::{ConditionalWrite, FaultOp, Subscription, Versioned},
};
pub(crate) use serde_json::{Value, json};
pub(crate) use tokio::sync::Barrier;

use getty::keys::StorePath;

pub(crate) fn draft(prompt: &str) -> PostDraft {
    PostDraft {
        user_prompt: prompt.to_string(),
        given_prompt: Some("today's theme".to_string()),
        image: Some(PostImage {
            created: 1_704_412_800,
            source: ImageSource::Url {
                url: format!("https://img.example/{}.png", prompt.replace(' ', "-")),
            },
        }),
    }
}

pub(crate) fn day(year: i32, month: u32, day: u32) -> DateKey {
    DateKey::from_ymd(year, month, day).expect("valid date")
}

pub(crate) async fn publish(repo: &PostRepository<impl DocumentStore>, user_id: &str, key: DateKey) -> Post {
    repo.create_or_replace_post(user_id, Some(key), draft(&format!("{user_id} {key}")))
        .await
        .expect("publish post")
}

pub(crate) async fn friend_doc(store: &MemoryStore, user_id: &str) -> Option<Value> {
    store
        .get(&friends_path(user_id).expect("legal id"))
        .await
        .expect("read friend record")
}

/// Wraps a store so that the first `parties` reads block until all of them have been issued.
///
/// Two concurrent read-modify-write operations driven through it are guaranteed to both read
/// before either writes.
#[derive(Clone)]
pub(crate) struct InterleavingStore<S> {
    inner: S,
    barrier: Arc<Barrier>,
    parties: usize,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl<S: DocumentStore> InterleavingStore<S> {
    pub(crate) fn new(inner: S, parties: usize) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties)),
            parties,
            reads: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn gate(&self) {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait().await;
        }
    }
}

impl<S: DocumentStore> DocumentStore for InterleavingStore<S> {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, RepoError> {
        self.gate().await;
        self.inner.get(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(path, value).await
    }

    async fn get_versioned(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        self.gate().await;
        self.inner.get_versioned(path).await
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<u64>, RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(writes).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RepoError> {
        self.inner.subscribe(path).await
    }
}

/// Wraps a memory store so that one `unfollow` lands just before the first commit issued
/// through the wrapper, after the caller has finished reading.
#[derive(Clone)]
pub(crate) struct UnfollowBeforeCommit {
    inner: MemoryStore,
    pending: Arc<std::sync::Mutex<Option<(String, String)>>>,
}

impl UnfollowBeforeCommit {
    pub(crate) fn new(inner: MemoryStore, user_id: &str, target_id: &str) -> Self {
        Self {
            inner,
            pending: Arc::new(std::sync::Mutex::new(Some((user_id.to_string(), target_id.to_string())))),
        }
    }

    pub(crate) fn fired(&self) -> bool {
        self.pending.lock().expect("pending lock").is_none()
    }
}

impl DocumentStore for UnfollowBeforeCommit {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, RepoError> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), RepoError> {
        self.inner.set(path, value).await
    }

    async fn get_versioned(&self, path: &StorePath) -> Result<Versioned, RepoError> {
        self.inner.get_versioned(path).await
    }

    async fn commit(&self, writes: Vec<ConditionalWrite>) -> Result<Vec<u64>, RepoError> {
        let pending = self.pending.lock().expect("pending lock").take();
        if let Some((user_id, target_id)) = pending {
            SocialGraph::new(self.inner.clone())
                .unfollow(&user_id, &target_id)
                .await
                .expect("interleaved unfollow");
        }
        self.inner.commit(writes).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, RepoError> {
        self.inner.subscribe(path).await
    }
}
