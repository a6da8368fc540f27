//! getty core library.
//!
//! Daily posts, likes, comments and follow edges kept consistent on top of a path-addressed
//! document store. Repositories return `Result<_, RepoError>`; [`service::GettyService`] turns
//! them into [`envelope::Envelope`] values and [`api::make_router`] serves those over HTTP.

pub mod api;
pub mod config;
pub mod date_key;
pub mod envelope;
pub mod errors;
pub mod feed;
pub mod graph;
pub mod keys;
pub mod models;
pub mod posts;
pub mod runtime;
pub mod service;
pub mod store;

pub use config::GettyConfig;
pub use date_key::{Calendar, DateKey};
pub use envelope::{Envelope, ErrorBody};
pub use errors::{ErrorKind, RepoError, ValidationError, ValidationIssue, ValidationResult};
pub use feed::{FeedAggregator, FeedPolicy, HomeFeed};
pub use graph::{Edge, EdgeIssue, RepairReport, SocialGraph, WriteMode};
pub use models::{Comment, FriendRecord, ImageSource, Post, PostDraft, PostImage};
pub use posts::{LikeStrategy, PostRepository};
pub use service::GettyService;
pub use store::{AnyStore, DocumentStore, MemoryStore, RedisStore};
