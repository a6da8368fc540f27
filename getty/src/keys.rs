//! Store paths and the key layouts derived from them.
//!
//! Every document lives at a `/`-separated path such as `posts/{user_id}/{date_key}` or
//! `friends/{user_id}`. Segments follow the hosted database's key rules, so ids coming from
//! the outside are validated here before they are ever used to address a document.

use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::errors::{ValidationError, ValidationResult};

pub const POSTS_ROOT: &str = "posts";
pub const FRIENDS_ROOT: &str = "friends";

const MAX_SEGMENT_BYTES: usize = 768;

static SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/.#$\[\]\x00-\x1F\x7F]+$").expect("valid segment pattern"));

/// Checks that `value` can be used as a single path segment, reporting issues against `field`.
pub fn validate_segment(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::single(field, "validation.required", "field is required"));
    }
    if value.len() > MAX_SEGMENT_BYTES {
        return Err(ValidationError::single(
            field,
            "validation.length",
            format!("length must be at most {MAX_SEGMENT_BYTES} bytes"),
        ));
    }
    if !SEGMENT_PATTERN.is_match(value) {
        return Err(ValidationError::single(
            field,
            "validation.path_segment",
            "must not contain '/', '.', '#', '$', '[', ']' or control characters",
        ));
    }
    Ok(())
}

/// A validated, non-empty document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let trimmed = raw.trim_matches('/');
        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            validate_segment("path", segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn root(segment: &str) -> ValidationResult<Self> {
        validate_segment("path", segment)?;
        Ok(Self {
            segments: vec![segment.to_string()],
        })
    }

    pub fn child(&self, segment: &str) -> ValidationResult<Self> {
        validate_segment("path", segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn parent(&self) -> Option<StorePath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when `other` lives strictly below `self`.
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        other.segments.len() > self.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// True when a write to one path changes what a read of the other returns.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// `posts/{user_id}`
pub fn posts_path(user_id: &str) -> ValidationResult<StorePath> {
    validate_segment("user_id", user_id)?;
    StorePath::root(POSTS_ROOT)?.child(user_id)
}

/// `posts/{user_id}/{date_key}`
pub fn post_path(user_id: &str, date_key: &str) -> ValidationResult<StorePath> {
    validate_segment("date_key", date_key)?;
    posts_path(user_id)?.child(date_key)
}

/// `friends/{user_id}`
pub fn friends_path(user_id: &str) -> ValidationResult<StorePath> {
    validate_segment("user_id", user_id)?;
    StorePath::root(FRIENDS_ROOT)?.child(user_id)
}

/// Redis key construction. A document is a field of the hash named after its parent path;
/// versions live in a sibling hash so that a whole subtree can be read with one `HGETALL`.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    /// Hash holding the children of `parent` (`None` is the root hash).
    pub fn hash_key(&self, parent: Option<&StorePath>) -> String {
        match parent {
            Some(parent) => format!("{}:{}", self.prefix, parent),
            None => format!("{}:", self.prefix),
        }
    }

    pub fn version_key(&self, parent: Option<&StorePath>) -> String {
        match parent {
            Some(parent) => format!("{}:__v:{}", self.prefix, parent),
            None => format!("{}:__v:", self.prefix),
        }
    }

    /// `(hash, version hash, field)` addressing the document at `path`.
    pub fn document(&self, path: &StorePath) -> (String, String, String) {
        let parent = path.parent();
        (
            self.hash_key(parent.as_ref()),
            self.version_key(parent.as_ref()),
            path.leaf().to_string(),
        )
    }
}
