//! Home feed: the posts of everyone a user follows, fetched per request.

use futures_util::future::join_all;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::FeedConfig,
    errors::RepoError,
    graph::SocialGraph,
    keys::validate_segment,
    models::Post,
    posts::PostRepository,
    store::DocumentStore,
};

/// What happens when one followed user's posts cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FeedPolicy {
    /// The whole feed fails.
    #[default]
    AllOrNothing,
    /// The feed is returned without that user's posts, and the failure is listed.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFailure {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub posts: Vec<Post>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<FeedFailure>,
}

#[derive(Clone)]
pub struct FeedAggregator<S> {
    graph: SocialGraph<S>,
    posts: PostRepository<S>,
    policy: FeedPolicy,
    include_own_posts: bool,
}

impl<S: DocumentStore> FeedAggregator<S> {
    pub fn new(graph: SocialGraph<S>, posts: PostRepository<S>) -> Self {
        Self::from_config(graph, posts, &FeedConfig::default())
    }

    pub fn from_config(graph: SocialGraph<S>, posts: PostRepository<S>, config: &FeedConfig) -> Self {
        Self {
            graph,
            posts,
            policy: config.policy,
            include_own_posts: config.include_own_posts,
        }
    }

    pub fn with_policy(mut self, policy: FeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_own_posts(mut self, include: bool) -> Self {
        self.include_own_posts = include;
        self
    }

    /// Posts of every followed user, grouped per user in `following` order, each group oldest
    /// first. With `include_own_posts` the requester's posts come first.
    pub async fn get_home_feed(&self, user_id: &str) -> Result<HomeFeed, RepoError> {
        let record = self.graph.get_friend_record(user_id).await?;

        let mut sources = Vec::with_capacity(record.following.len() + 1);
        if self.include_own_posts {
            sources.push(user_id.to_string());
        }
        for followed in record.following {
            match validate_segment("user_id", &followed) {
                Ok(()) if followed != user_id || !self.include_own_posts => sources.push(followed),
                Ok(()) => {}
                Err(err) => warn!("skipping {followed:?} in the feed of {user_id}: {}", err.summary()),
            }
        }

        let fetched = join_all(sources.iter().map(|source| self.posts.get_all_posts(source))).await;

        let mut feed = HomeFeed::default();
        for (source, result) in sources.into_iter().zip(fetched) {
            match result {
                Ok(posts) => feed.posts.extend(posts),
                Err(err) if self.policy == FeedPolicy::BestEffort => {
                    warn!("leaving {source} out of the feed of {user_id}: {err}");
                    feed.skipped.push(FeedFailure {
                        user_id: source,
                        message: err.message(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(feed)
    }
}
