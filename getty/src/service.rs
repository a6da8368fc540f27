use log::{error, warn};

use crate::{
    config::GettyConfig,
    date_key::DateKey,
    envelope::Envelope,
    errors::{ErrorKind, RepoError},
    feed::{FeedAggregator, HomeFeed},
    graph::{EdgeIssue, RepairReport, SocialGraph},
    models::{FriendRecord, Post, PostDraft},
    posts::PostRepository,
    store::DocumentStore,
};

/// Entry point for callers: every operation of the repositories, answered with an [`Envelope`].
#[derive(Clone)]
pub struct GettyService<S> {
    posts: PostRepository<S>,
    graph: SocialGraph<S>,
    feed: FeedAggregator<S>,
}

impl<S: DocumentStore> GettyService<S> {
    pub fn new(store: S, config: &GettyConfig) -> Self {
        let posts = PostRepository::from_config(store.clone(), &config.posts);
        let graph = SocialGraph::from_config(store, &config.graph);
        let feed = FeedAggregator::from_config(graph.clone(), posts.clone(), &config.feed);
        Self { posts, graph, feed }
    }

    pub fn from_parts(posts: PostRepository<S>, graph: SocialGraph<S>, feed: FeedAggregator<S>) -> Self {
        Self { posts, graph, feed }
    }

    pub fn posts(&self) -> &PostRepository<S> {
        &self.posts
    }

    pub fn graph(&self) -> &SocialGraph<S> {
        &self.graph
    }

    pub fn feed(&self) -> &FeedAggregator<S> {
        &self.feed
    }

    pub async fn create_post(&self, user_id: &str, date_key: Option<&str>, draft: PostDraft) -> Envelope<Post> {
        let result: Result<Post, RepoError> = async {
            let date_key = date_key.map(str::parse::<DateKey>).transpose()?;
            self.posts.create_or_replace_post(user_id, date_key, draft).await
        }
        .await;
        wrap("createPost", result)
    }

    pub async fn get_post(&self, user_id: &str, post_id: &str) -> Envelope<Option<Post>> {
        wrap("getPost", self.posts.get_post(user_id, post_id).await)
    }

    pub async fn get_all_posts(&self, user_id: &str) -> Envelope<Vec<Post>> {
        wrap("getAllPosts", self.posts.get_all_posts(user_id).await)
    }

    pub async fn post_exists(&self, user_id: &str, post_id: &str) -> Envelope<bool> {
        wrap("postExists", self.posts.post_exists(user_id, post_id).await)
    }

    pub async fn like_post(&self, owner_id: &str, post_id: &str, liker_id: &str) -> Envelope<Post> {
        wrap("likePost", self.posts.set_like(owner_id, post_id, liker_id, true).await)
    }

    pub async fn unlike_post(&self, owner_id: &str, post_id: &str, liker_id: &str) -> Envelope<Post> {
        wrap("unlikePost", self.posts.set_like(owner_id, post_id, liker_id, false).await)
    }

    pub async fn user_likes_post(&self, owner_id: &str, post_id: &str, liker_id: &str) -> Envelope<bool> {
        wrap("userLikesPost", self.posts.user_has_liked(owner_id, post_id, liker_id).await)
    }

    pub async fn add_comment(
        &self,
        owner_id: &str,
        post_id: &str,
        user_id: &str,
        username: &str,
        comment: &str,
    ) -> Envelope<Post> {
        wrap(
            "addComment",
            self.posts.add_comment(owner_id, post_id, user_id, username, comment).await,
        )
    }

    pub async fn home_feed(&self, user_id: &str) -> Envelope<HomeFeed> {
        wrap("getHomefeed", self.feed.get_home_feed(user_id).await)
    }

    pub async fn follow(&self, user_id: &str, target_id: &str) -> Envelope<FriendRecord> {
        wrap("followUser", self.graph.follow(user_id, target_id).await)
    }

    pub async fn unfollow(&self, user_id: &str, target_id: &str) -> Envelope<FriendRecord> {
        wrap("unfollowUser", self.graph.unfollow(user_id, target_id).await)
    }

    pub async fn is_following(&self, user_id: &str, target_id: &str) -> Envelope<bool> {
        wrap("isFollowing", self.graph.is_following(user_id, target_id).await)
    }

    pub async fn friends(&self, user_id: &str) -> Envelope<FriendRecord> {
        wrap("getFriends", self.graph.get_friend_record(user_id).await)
    }

    pub async fn audit(&self, user_id: &str) -> Envelope<Vec<EdgeIssue>> {
        wrap("audit", self.graph.audit(user_id).await)
    }

    pub async fn repair(&self, user_id: &str) -> Envelope<RepairReport> {
        wrap("repair", self.graph.repair(user_id).await)
    }
}

fn wrap<T>(operation: &str, result: Result<T, RepoError>) -> Envelope<T> {
    if let Err(err) = &result {
        match err.kind() {
            ErrorKind::Internal | ErrorKind::PartialConsistency | ErrorKind::Transport => {
                error!("{operation} failed: {err}")
            }
            _ => warn!("{operation} rejected: {err}"),
        }
    }
    result.into()
}
