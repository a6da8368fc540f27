//! Daily posts: one document per user per calendar day, likes and comments.

use std::collections::BTreeMap;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::PostsConfig,
    date_key::{Calendar, DateKey},
    errors::{RepoError, ValidationError, ValidationIssue},
    keys::{StorePath, post_path, posts_path, validate_segment},
    models::{Comment, Post, PostDraft},
    store::{ConditionalWrite, DocumentStore, decode, encode},
};

/// How likes and comments are written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LikeStrategy {
    /// Read, modify, whole-document `set`. Concurrent writers can overwrite each other.
    Naive,
    /// Versioned read, modify, conditional commit, retried on conflict.
    #[default]
    Conditional,
}

#[derive(Clone)]
pub struct PostRepository<S> {
    store: S,
    strategy: LikeStrategy,
    calendar: Calendar,
    max_retries: u32,
}

/// A post together with where and at which version it was read.
struct Located {
    path: StorePath,
    post: Post,
    version: u64,
}

impl<S: DocumentStore> PostRepository<S> {
    pub fn new(store: S) -> Self {
        Self::from_config(store, &PostsConfig::default())
    }

    pub fn from_config(store: S, config: &PostsConfig) -> Self {
        Self {
            store,
            strategy: config.like_strategy,
            calendar: config.calendar,
            max_retries: config.max_retries,
        }
    }

    pub fn with_strategy(mut self, strategy: LikeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn strategy(&self) -> LikeStrategy {
        self.strategy
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Writes the post for `date_key` (today when `None`), replacing whatever was there.
    ///
    /// Likes and comments of a replaced post are discarded. A document stored under the unpadded
    /// spelling of the same day is removed in the same commit.
    pub async fn create_or_replace_post(
        &self,
        user_id: &str,
        date_key: Option<DateKey>,
        draft: PostDraft,
    ) -> Result<Post, RepoError> {
        let mut issues: Vec<ValidationIssue> = Vec::new();
        if let Err(err) = validate_segment("user_id", user_id) {
            issues.extend(err.issues);
        }
        match &draft.image {
            None => issues.push(ValidationIssue::new("image", "validation.required", "field is required")),
            Some(image) if image.source.payload().trim().is_empty() => issues.push(ValidationIssue::new(
                "image",
                "validation.required",
                "image must carry a url or b64 payload",
            )),
            Some(_) => {}
        }
        let image = match draft.image {
            Some(image) if issues.is_empty() => image,
            _ => return Err(ValidationError::new(issues).into()),
        };

        let date_key = date_key.unwrap_or_else(|| DateKey::today(self.calendar));
        let post = Post {
            user_id: user_id.to_string(),
            date_key,
            user_prompt: draft.user_prompt,
            given_prompt: draft.given_prompt,
            image,
            likes: Vec::new(),
            comments: Vec::new(),
        };

        let path = post_path(user_id, &date_key.to_string())?;
        let mut writes = vec![ConditionalWrite::put(path.clone(), encode(&path, &post)?, None)];
        let legacy = date_key.legacy_form();
        if legacy != date_key.to_string() {
            writes.push(ConditionalWrite::delete(post_path(user_id, &legacy)?, None));
        }
        self.store.commit(writes).await?;
        info!("stored post {path}");
        Ok(post)
    }

    /// The post for `date_key`, or `None` when there is none. Keys that are not dates are absent.
    pub async fn get_post(&self, user_id: &str, date_key: &str) -> Result<Option<Post>, RepoError> {
        posts_path(user_id)?;
        let Ok(key) = date_key.parse::<DateKey>() else {
            debug!("'{date_key}' is not a date key; treating post as absent");
            return Ok(None);
        };
        Ok(self.locate(user_id, key, false).await?.map(|found| found.post))
    }

    pub async fn post_exists(&self, user_id: &str, date_key: &str) -> Result<bool, RepoError> {
        Ok(self.get_post(user_id, date_key).await?.is_some())
    }

    /// Every post of `user_id`, oldest first.
    pub async fn get_all_posts(&self, user_id: &str) -> Result<Vec<Post>, RepoError> {
        let path = posts_path(user_id)?;
        let Some(value) = self.store.get(&path).await? else {
            return Ok(Vec::new());
        };
        let Value::Object(children) = value else {
            return Err(RepoError::Other {
                message: format!("expected an object of posts at {path}").into(),
            });
        };

        let mut by_day: BTreeMap<DateKey, (bool, Post)> = BTreeMap::new();
        for (raw_key, document) in children {
            let Ok(key) = raw_key.parse::<DateKey>() else {
                warn!("skipping {path}/{raw_key}: not a date key");
                continue;
            };
            let child = path.child(&raw_key)?;
            let post = decode_post(&child, user_id, key, document)?;
            let canonical = raw_key == key.to_string();
            match by_day.get(&key) {
                Some((true, _)) => {}
                Some((false, _)) if !canonical => {}
                _ => {
                    by_day.insert(key, (canonical, post));
                }
            }
        }
        Ok(by_day.into_values().map(|(_, post)| post).collect())
    }

    /// Adds or removes `liker_id` from the post's like set and returns the post as written.
    pub async fn set_like(&self, user_id: &str, date_key: &str, liker_id: &str, liked: bool) -> Result<Post, RepoError> {
        validate_segment("liker_id", liker_id)?;
        let post = self
            .mutate(user_id, date_key, |post| post.set_liked(liker_id, liked))
            .await?;
        debug!(
            "{} {liker_id} on posts/{user_id}/{date_key} ({} like(s))",
            if liked { "like" } else { "unlike" },
            post.likes.len()
        );
        Ok(post)
    }

    /// `false` when the post does not exist.
    pub async fn user_has_liked(&self, user_id: &str, date_key: &str, liker_id: &str) -> Result<bool, RepoError> {
        Ok(self
            .get_post(user_id, date_key)
            .await?
            .is_some_and(|post| post.has_liked(liker_id)))
    }

    /// Appends a comment by `author_id` to the post of `user_id`.
    pub async fn add_comment(
        &self,
        user_id: &str,
        date_key: &str,
        author_id: &str,
        username: &str,
        text: &str,
    ) -> Result<Post, RepoError> {
        let mut issues = Vec::new();
        if let Err(err) = validate_segment("user_id", author_id) {
            issues.extend(err.issues);
        }
        if text.trim().is_empty() {
            issues.push(ValidationIssue::new("comment", "validation.required", "comment must not be empty"));
        }
        if !issues.is_empty() {
            return Err(ValidationError::new(issues).into());
        }

        let comment = Comment {
            time: Utc::now(),
            user_id: author_id.to_string(),
            username: username.to_string(),
            comment: text.to_string(),
        };
        self.mutate(user_id, date_key, |post| {
            post.comments.push(comment.clone());
            true
        })
        .await
    }

    /// Applies `change` to the stored post. `change` returns whether it modified the post;
    /// unchanged posts are not written.
    async fn mutate<F>(&self, user_id: &str, date_key: &str, change: F) -> Result<Post, RepoError>
    where
        F: Fn(&mut Post) -> bool + Send + Sync,
    {
        posts_path(user_id)?;
        let not_found = || RepoError::NotFound {
            entity: "post",
            id: format!("{user_id}/{date_key}"),
        };
        let key: DateKey = date_key.parse().map_err(|_| not_found())?;
        let conditional = self.strategy == LikeStrategy::Conditional;

        let mut attempt = 0;
        loop {
            let Some(Located { path, mut post, version }) = self.locate(user_id, key, conditional).await? else {
                return Err(not_found());
            };
            if !change(&mut post) {
                return Ok(post);
            }
            let value = encode(&path, &post)?;
            if !conditional {
                self.store.set(&path, value).await?;
                return Ok(post);
            }
            match self
                .store
                .commit(vec![ConditionalWrite::put(path.clone(), value, Some(version))])
                .await
            {
                Ok(_) => return Ok(post),
                Err(err) if err.is_version_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("{path} changed concurrently, retrying ({attempt}/{})", self.max_retries);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Finds the post under its canonical key, falling back to the unpadded spelling.
    async fn locate(&self, user_id: &str, key: DateKey, versioned: bool) -> Result<Option<Located>, RepoError> {
        let canonical = key.to_string();
        let legacy = key.legacy_form();
        let mut candidates = vec![canonical.as_str()];
        if legacy != canonical {
            candidates.push(legacy.as_str());
        }

        for candidate in candidates {
            let path = post_path(user_id, candidate)?;
            let (value, version) = if versioned {
                let read = self.store.get_versioned(&path).await?;
                (read.value, read.version)
            } else {
                (self.store.get(&path).await?, 0)
            };
            if let Some(value) = value {
                let post = decode_post(&path, user_id, key, value)?;
                return Ok(Some(Located { path, post, version }));
            }
        }
        Ok(None)
    }
}

/// Decodes a stored post, filling the identity fields older documents left out.
fn decode_post(path: &StorePath, user_id: &str, key: DateKey, mut value: Value) -> Result<Post, RepoError> {
    if let Value::Object(fields) = &mut value {
        fields
            .entry("user_id")
            .or_insert_with(|| Value::String(user_id.to_string()));
        if !fields.contains_key("date_key") && !fields.contains_key("id") {
            fields.insert("date_key".to_string(), Value::String(key.to_string()));
        }
    }
    decode(path, value)
}
