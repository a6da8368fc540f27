use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{commands::CommitCommand, scripts::COMMIT_BATCH_SCRIPT},
};

/// Runs the batch commit script and returns the new version of every written path.
pub async fn execute_commit<C>(conn: &mut C, command: &CommitCommand) -> Result<Vec<u64>, RepoError>
where
    C: ConnectionLike + Send,
{
    let payload = serde_json::to_string(command).map_err(|err| RepoError::Other {
        message: format!("failed to serialize commit: {err}").into(),
    })?;

    let mut invocation = COMMIT_BATCH_SCRIPT.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await.map_err(RepoError::from)?;

    let value: Value = serde_json::from_str(&raw).map_err(|err| RepoError::Other {
        message: format!("failed to parse lua response: {err}").into(),
    })?;
    parse_response(&value, command.writes.len())
}

fn parse_response(value: &Value, expected_len: usize) -> Result<Vec<u64>, RepoError> {
    if let Some(error) = value.get("error") {
        return match error.as_str() {
            Some("version_conflict") => Err(RepoError::VersionConflict {
                path: value.get("path").and_then(Value::as_str).unwrap_or_default().to_string(),
                expected: value.get("expected").and_then(Value::as_u64),
                actual: value.get("actual").and_then(Value::as_u64).unwrap_or_default(),
            }),
            Some(other) => Err(RepoError::Other {
                message: other.to_string().into(),
            }),
            None => Err(RepoError::Other {
                message: "lua_error".into(),
            }),
        };
    }
    let versions: Vec<u64> = value
        .get("versions")
        .and_then(Value::as_array)
        .map(|versions| versions.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default();
    if versions.len() != expected_len {
        return Err(RepoError::Other {
            message: format!("commit returned {} versions for {expected_len} writes", versions.len()).into(),
        });
    }
    Ok(versions)
}
