//! Redis-side execution of batched writes.

pub mod commands;
pub mod executor;
pub mod scripts;
