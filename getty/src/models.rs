//! Documents stored under `posts/` and `friends/`.
//!
//! Field names on the wire follow the documents the web client already writes
//! (`userPrompt`, `givenPrompt`, ...), so existing data deserializes unchanged. Collections that
//! the store may drop when empty or that older writers may have duplicated are normalized on
//! read: absent or `null` becomes empty, repeated ids collapse to their first occurrence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_key::DateKey;

/// One user's post for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub user_id: String,
    #[serde(alias = "id")]
    pub date_key: DateKey,
    #[serde(rename = "userPrompt", default)]
    pub user_prompt: String,
    #[serde(rename = "givenPrompt", default, skip_serializing_if = "Option::is_none")]
    pub given_prompt: Option<String>,
    pub image: PostImage,
    #[serde(default, deserialize_with = "id_set")]
    pub likes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn has_liked(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Inserts or removes `user_id` from the like set. Returns whether anything changed.
    pub fn set_liked(&mut self, user_id: &str, liked: bool) -> bool {
        if liked {
            insert_unique(&mut self.likes, user_id)
        } else {
            remove_all(&mut self.likes, user_id)
        }
    }
}

/// Generated image attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostImage {
    /// Unix timestamp reported by the image generator.
    pub created: i64,
    #[serde(flatten)]
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    Url { url: String },
    B64 {
        #[serde(alias = "b64_json")]
        b64: String,
    },
}

impl ImageSource {
    pub fn payload(&self) -> &str {
        match self {
            ImageSource::Url { url } => url,
            ImageSource::B64 { b64 } => b64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub time: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    pub comment: String,
}

/// Caller-supplied fields of a post. Likes and comments always start empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostDraft {
    #[serde(rename = "userPrompt", default)]
    pub user_prompt: String,
    #[serde(rename = "givenPrompt", default)]
    pub given_prompt: Option<String>,
    #[serde(default)]
    pub image: Option<PostImage>,
}

/// Both sides of a user's follow edges. `B ∈ A.following` iff `A ∈ B.followers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FriendRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "id_set")]
    pub followers: Vec<String>,
    #[serde(default, deserialize_with = "id_set")]
    pub following: Vec<String>,
}

impl FriendRecord {
    pub fn empty(user_id: &str) -> Self {
        Self {
            id: user_id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }

    pub fn is_followed_by(&self, user_id: &str) -> bool {
        self.followers.iter().any(|id| id == user_id)
    }

    pub fn add_following(&mut self, user_id: &str) -> bool {
        insert_unique(&mut self.following, user_id)
    }

    pub fn remove_following(&mut self, user_id: &str) -> bool {
        remove_all(&mut self.following, user_id)
    }

    pub fn add_follower(&mut self, user_id: &str) -> bool {
        insert_unique(&mut self.followers, user_id)
    }

    pub fn remove_follower(&mut self, user_id: &str) -> bool {
        remove_all(&mut self.followers, user_id)
    }
}

fn insert_unique(ids: &mut Vec<String>, user_id: &str) -> bool {
    if ids.iter().any(|id| id == user_id) {
        return false;
    }
    ids.push(user_id.to_string());
    true
}

fn remove_all(ids: &mut Vec<String>, user_id: &str) -> bool {
    let before = ids.len();
    ids.retain(|id| id != user_id);
    ids.len() != before
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn id_set<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = null_as_empty(deserializer)?;
    let mut ids = Vec::with_capacity(raw.len());
    for id in raw {
        insert_unique(&mut ids, &id);
    }
    Ok(ids)
}
