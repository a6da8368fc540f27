pub mod graph;
pub mod posts;
pub mod serve;

use anyhow::{Result, anyhow};
use getty::Envelope;

/// Unwraps a service answer, turning a failure envelope into a CLI error.
pub fn settle<T>(envelope: Envelope<T>) -> Result<T> {
    envelope
        .into_result()
        .map_err(|error| anyhow!("{} ({}): {}", error.kind, error.code, error.message))
}
