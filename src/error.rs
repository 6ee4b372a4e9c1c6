//! Error types surfaced by pool construction.

use std::io;

use thiserror::Error;

/// A worker thread could not be spawned while constructing a pool.
///
/// By the time this is returned, every thread the factory did manage to start
/// has been signalled and joined, so no worker outlives the failed
/// construction.
#[derive(Debug, Error)]
#[error("failed to spawn worker thread {index}")]
pub struct SpawnError {
    /// Zero-based index of the worker that failed to start.
    pub index: usize,
    #[source]
    pub source: io::Error,
}
