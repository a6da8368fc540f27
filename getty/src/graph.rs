//! Follow edges.
//!
//! An edge `A -> B` is stored twice: `B` in `friends/A.following` and `A` in
//! `friends/B.followers`. Every mutation here writes both sides or neither; [`SocialGraph::audit`]
//! and [`SocialGraph::repair`] deal with records left asymmetric by earlier writers.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::GraphConfig,
    errors::{RepoError, ValidationError, ValidationIssue},
    keys::{StorePath, friends_path, validate_segment},
    models::FriendRecord,
    store::{ConditionalWrite, DocumentStore, decode, encode},
};

/// How the two records of an edge are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One conditional commit covering both records.
    #[default]
    Atomic,
    /// Two writes, initiator first, with a compensating write if the second one fails.
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub follower: String,
    pub followee: String,
}

/// One side of an edge without its mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum EdgeIssue {
    /// `followee` is in the follower's `following`, but the follower is missing from
    /// `followee.followers`.
    MissingFollower(Edge),
    /// `follower` is in the followee's `followers` without a matching `following` entry.
    StaleFollower(Edge),
}

impl EdgeIssue {
    pub fn edge(&self) -> &Edge {
        match self {
            EdgeIssue::MissingFollower(edge) | EdgeIssue::StaleFollower(edge) => edge,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub user_id: String,
    /// Follower entries added to mirror an existing `following` entry.
    pub added_followers: Vec<Edge>,
    /// Follower entries removed because nothing on the other side backed them.
    pub removed_followers: Vec<Edge>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.added_followers.is_empty() && self.removed_followers.is_empty()
    }
}

#[derive(Clone)]
pub struct SocialGraph<S> {
    store: S,
    mode: WriteMode,
    max_retries: u32,
}

/// A record as read, plus the edits made to it.
struct Loaded {
    path: StorePath,
    record: FriendRecord,
    original: Option<Value>,
    version: u64,
}

impl<S: DocumentStore> SocialGraph<S> {
    pub fn new(store: S) -> Self {
        Self::from_config(store, &GraphConfig::default())
    }

    pub fn from_config(store: S, config: &GraphConfig) -> Self {
        Self {
            store,
            mode: config.write_mode,
            max_retries: config.max_retries,
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// The record of `user_id`; users nobody has followed yet get empty sets.
    pub async fn get_friend_record(&self, user_id: &str) -> Result<FriendRecord, RepoError> {
        let path = friends_path(user_id)?;
        let value = self.store.get(&path).await?;
        record_from(&path, user_id, value)
    }

    pub async fn followers(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        Ok(self.get_friend_record(user_id).await?.followers)
    }

    pub async fn following(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        Ok(self.get_friend_record(user_id).await?.following)
    }

    pub async fn is_following(&self, user_id: &str, target_id: &str) -> Result<bool, RepoError> {
        validate_segment("target_id", target_id)?;
        Ok(self.get_friend_record(user_id).await?.is_following(target_id))
    }

    /// Makes `user_id` follow `target_id` and returns the initiator's updated record.
    ///
    /// Fails with a conflict when either side already records the edge.
    pub async fn follow(&self, user_id: &str, target_id: &str) -> Result<FriendRecord, RepoError> {
        validate_pair(user_id, target_id)?;
        let mut attempt = 0;
        loop {
            let mut initiator = self.load(user_id).await?;
            if initiator.record.is_following(target_id) {
                return Err(RepoError::conflict("already following"));
            }
            initiator.record.add_following(target_id);

            let mut target = self.load(target_id).await?;
            if target.record.is_followed_by(user_id) {
                return Err(RepoError::conflict("already following"));
            }
            target.record.add_follower(user_id);

            match self.write(vec![&initiator, &target]).await {
                Err(err) if self.should_retry(&err, &mut attempt) => continue,
                Err(err) => return Err(err),
                Ok(()) => {
                    info!("{user_id} now follows {target_id}");
                    return Ok(initiator.record);
                }
            }
        }
    }

    /// Removes the edge from both sides. Removing an edge that does not exist succeeds.
    pub async fn unfollow(&self, user_id: &str, target_id: &str) -> Result<FriendRecord, RepoError> {
        validate_pair(user_id, target_id)?;
        let mut attempt = 0;
        loop {
            let mut initiator = self.load(user_id).await?;
            let mut target = self.load(target_id).await?;
            let mut changed = Vec::with_capacity(2);
            if initiator.record.remove_following(target_id) {
                changed.push(&initiator);
            }
            if target.record.remove_follower(user_id) {
                changed.push(&target);
            }
            if changed.is_empty() {
                return Ok(initiator.record);
            }

            match self.write(changed).await {
                Err(err) if self.should_retry(&err, &mut attempt) => continue,
                Err(err) => return Err(err),
                Ok(()) => {
                    info!("{user_id} unfollowed {target_id}");
                    return Ok(initiator.record);
                }
            }
        }
    }

    /// Lists every edge touching `user_id` that is recorded on one side only. Read-only.
    pub async fn audit(&self, user_id: &str) -> Result<Vec<EdgeIssue>, RepoError> {
        let record = self.get_friend_record(user_id).await?;
        let mut issues = Vec::new();
        for followee in &record.following {
            if !legal_reference(user_id, followee) {
                continue;
            }
            if !self.get_friend_record(followee).await?.is_followed_by(user_id) {
                issues.push(EdgeIssue::MissingFollower(Edge {
                    follower: user_id.to_string(),
                    followee: followee.clone(),
                }));
            }
        }
        for follower in &record.followers {
            if !legal_reference(user_id, follower) {
                continue;
            }
            if !self.get_friend_record(follower).await?.is_following(user_id) {
                issues.push(EdgeIssue::StaleFollower(Edge {
                    follower: follower.clone(),
                    followee: user_id.to_string(),
                }));
            }
        }
        Ok(issues)
    }

    /// Brings every edge touching `user_id` back into agreement.
    ///
    /// `following` lists are treated as the source of truth: a missing follower entry is added,
    /// a follower entry without a matching `following` entry is dropped. All fixes land in one
    /// conditional commit.
    pub async fn repair(&self, user_id: &str) -> Result<RepairReport, RepoError> {
        let mut attempt = 0;
        loop {
            let mut owner = self.load(user_id).await?;
            let mut others: Vec<Loaded> = Vec::new();
            let mut report = RepairReport {
                user_id: user_id.to_string(),
                ..RepairReport::default()
            };

            for followee in owner.record.following.clone() {
                if !legal_reference(user_id, &followee) || followee == user_id {
                    continue;
                }
                let mut other = self.load(&followee).await?;
                if other.record.add_follower(user_id) {
                    report.added_followers.push(Edge {
                        follower: user_id.to_string(),
                        followee: followee.clone(),
                    });
                    others.push(other);
                }
            }
            for follower in owner.record.followers.clone() {
                if !legal_reference(user_id, &follower) {
                    continue;
                }
                let backed = if follower == user_id {
                    owner.record.is_following(user_id)
                } else {
                    self.get_friend_record(&follower).await?.is_following(user_id)
                };
                if !backed {
                    owner.record.remove_follower(&follower);
                    report.removed_followers.push(Edge {
                        follower: follower.clone(),
                        followee: user_id.to_string(),
                    });
                }
            }

            if report.is_clean() {
                return Ok(report);
            }
            // The owner is always rewritten so its version guards the `following` list read above.
            let mut writes = Vec::with_capacity(others.len() + 1);
            writes.push(conditional_put(&owner)?);
            for other in &others {
                writes.push(conditional_put(other)?);
            }
            match self.store.commit(writes).await {
                Err(err) if err.is_version_conflict() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("friend records changed during repair of {user_id}, retrying");
                }
                Err(err) => return Err(err),
                Ok(_) => {
                    warn!(
                        "repaired {user_id}: {} follower entr(ies) added, {} removed",
                        report.added_followers.len(),
                        report.removed_followers.len()
                    );
                    return Ok(report);
                }
            }
        }
    }

    async fn load(&self, user_id: &str) -> Result<Loaded, RepoError> {
        let path = friends_path(user_id)?;
        let read = self.store.get_versioned(&path).await?;
        let record = record_from(&path, user_id, read.value.clone())?;
        Ok(Loaded {
            path,
            record,
            original: read.value,
            version: read.version,
        })
    }

    fn should_retry(&self, err: &RepoError, attempt: &mut u32) -> bool {
        if !err.is_version_conflict() || *attempt >= self.max_retries {
            return false;
        }
        *attempt += 1;
        warn!("{err}; retrying ({attempt}/{})", self.max_retries);
        true
    }

    async fn write(&self, records: Vec<&Loaded>) -> Result<(), RepoError> {
        match self.mode {
            WriteMode::Atomic => {
                let writes = records
                    .iter()
                    .map(|loaded| conditional_put(loaded))
                    .collect::<Result<Vec<_>, _>>()?;
                self.store.commit(writes).await.map(|_| ())
            }
            WriteMode::Sequential => self.write_sequential(&records).await,
        }
    }

    /// Writes `records` one after another. When a write fails, the records already written are
    /// restored to what was read; a restore that fails too is reported as partial consistency.
    async fn write_sequential(&self, records: &[&Loaded]) -> Result<(), RepoError> {
        for (index, loaded) in records.iter().enumerate() {
            let value = encode(&loaded.path, &loaded.record)?;
            let Err(err) = self.store.set(&loaded.path, value).await else {
                continue;
            };
            warn!("write of {} failed: {err}; rolling back", loaded.path);

            let mut still_written = Vec::new();
            let mut rollback_errors = Vec::new();
            for written in records[..index].iter().rev() {
                let restore = written.original.clone().unwrap_or(Value::Null);
                if let Err(rollback_err) = self.store.set(&written.path, restore).await {
                    still_written.push(written.path.to_string());
                    rollback_errors.push(rollback_err.to_string());
                }
            }
            if still_written.is_empty() {
                return Err(err);
            }
            return Err(RepoError::PartialConsistency {
                written: still_written,
                failed: loaded.path.to_string(),
                message: format!("{err}; rollback failed: {}", rollback_errors.join("; ")),
            });
        }
        Ok(())
    }
}

fn validate_pair(user_id: &str, target_id: &str) -> Result<(), RepoError> {
    let mut issues: Vec<ValidationIssue> = Vec::new();
    for (field, value) in [("user_id", user_id), ("target_id", target_id)] {
        if let Err(err) = validate_segment(field, value) {
            issues.extend(err.issues);
        }
    }
    if issues.is_empty() && user_id == target_id {
        issues.push(ValidationIssue::new(
            "target_id",
            "validation.self_follow",
            "users cannot follow themselves",
        ));
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues).into())
    }
}

/// Ids in friend lists are dereferenced only when they are usable as a key.
fn legal_reference(owner: &str, id: &str) -> bool {
    match validate_segment("user_id", id) {
        Ok(()) => true,
        Err(err) => {
            warn!("skipping id {id:?} in friends/{owner}: {}", err.summary());
            false
        }
    }
}

fn record_from(path: &StorePath, user_id: &str, value: Option<Value>) -> Result<FriendRecord, RepoError> {
    let mut record = match value {
        Some(value) => decode::<FriendRecord>(path, value)?,
        None => FriendRecord::empty(user_id),
    };
    if record.id.is_empty() {
        record.id = user_id.to_string();
    }
    Ok(record)
}

fn conditional_put(loaded: &Loaded) -> Result<ConditionalWrite, RepoError> {
    Ok(ConditionalWrite::put(
        loaded.path.clone(),
        encode(&loaded.path, &loaded.record)?,
        Some(loaded.version),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn self_follow_is_rejected_before_any_write() {
        let store = MemoryStore::new();
        let graph = SocialGraph::new(store.clone());
        let err = graph.follow("alice", "alice").await.unwrap_err();
        assert_eq!(err.param(), "target_id");
        assert!(store.get(&friends_path("alice").unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn absent_record_is_normalized() {
        let graph = SocialGraph::new(MemoryStore::new());
        let record = graph.get_friend_record("ghost").await.unwrap();
        assert_eq!(record, FriendRecord::empty("ghost"));
    }

    #[tokio::test]
    async fn unfollow_without_edge_does_not_write() {
        let store = MemoryStore::new();
        let graph = SocialGraph::new(store.clone());
        graph.unfollow("alice", "bob").await.unwrap();
        assert_eq!(
            store.get_versioned(&friends_path("alice").unwrap()).await.unwrap().version,
            0
        );
    }
}
