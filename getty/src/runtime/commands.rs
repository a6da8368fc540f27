use serde::Serialize;
use serde_json::Value;

use crate::{errors::RepoError, keys::KeyContext, store::ConditionalWrite};

/// Payload of the batch commit script.
#[derive(Debug, Serialize)]
pub struct CommitCommand {
    /// Pub/sub channel that receives the path of every written document.
    pub channel: String,
    pub writes: Vec<DocumentWrite>,
}

#[derive(Debug, Serialize)]
pub struct DocumentWrite {
    pub path: String,
    /// Hash holding the document as one field.
    pub hash_key: String,
    pub version_key: String,
    /// Hash holding the document's own children; replaced along with the document.
    pub subtree_key: String,
    /// Version hash of the children in `subtree_key`; bumped for every child the write removes.
    pub subtree_version_key: String,
    pub field: String,
    /// Serialized document. Absent for deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl CommitCommand {
    pub fn build(keys: &KeyContext<'_>, channel: String, writes: &[ConditionalWrite]) -> Result<Self, RepoError> {
        let writes = writes
            .iter()
            .map(|write| {
                let (hash_key, version_key, field) = keys.document(&write.path);
                let value_json = match &write.value {
                    Some(Value::Null) | None => None,
                    Some(value) => Some(serde_json::to_string(value).map_err(|err| RepoError::Other {
                        message: format!("failed to serialize document {}: {err}", write.path).into(),
                    })?),
                };
                Ok(DocumentWrite {
                    path: write.path.to_string(),
                    hash_key,
                    version_key,
                    subtree_key: keys.hash_key(Some(&write.path)),
                    subtree_version_key: keys.version_key(Some(&write.path)),
                    field,
                    value_json,
                    expected_version: write.expected_version,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;
        Ok(Self { channel, writes })
    }
}
