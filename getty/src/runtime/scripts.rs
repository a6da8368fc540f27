use redis::Script;
use std::sync::LazyLock;

pub const COMMIT_BATCH_SCRIPT_BODY: &str = include_str!("../../lua/commit_batch.lua");

pub static COMMIT_BATCH_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(COMMIT_BATCH_SCRIPT_BODY));
