use thiserror::Error;

/// Error taxonomy for the cluster-graph builder.
///
/// "Not an error" outcomes (unreachable pair, missing opposing entrance,
/// corrupt `walk_data` JSON) are never represented here — they are plain
/// `None`/empty-collection returns at the call site.
#[derive(Debug, Error)]
pub enum ClusterGraphError {
    #[error("input invalid: {0}")]
    InputInvalid(String),

    #[error("write-conflict: database remained locked after {retries} retries")]
    LockBusy { retries: u32 },

    #[error("attempted a write while the store was opened read-only (dry-run)")]
    DryRunWrite,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ClusterGraphError>;
