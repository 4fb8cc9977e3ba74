#![deny(warnings)]

//! Persistence seam: the repository contract used by the game service, an
//! in-memory implementation and portable snapshots.
//!
//! Writes are optimistic. Every read returns the record's version and every
//! write states the version it was derived from; a mismatch is reported as
//! [`RepoError::Conflict`] and the caller re-reads and retries. Player versions
//! are counters kept by the store. The network record uses its `work_height`
//! as version, so a network write is a compare-and-swap on the block height.

pub mod memory;
pub mod snapshot;

pub use memory::InMemoryRepository;
pub use snapshot::{Snapshot, SNAPSHOT_FORMAT};

use idle_core::{NetworkState, Player, PlayerId};
use thiserror::Error;

/// A record together with the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Storage failures.
#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The stored version differs from the one the write was based on.
    /// `None` means "no record".
    #[error("version conflict: expected {expected:?}, found {found:?}")]
    Conflict {
        expected: Option<u64>,
        found: Option<u64>,
    },
    /// Snapshot encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Durable storage for players and the shared network record.
pub trait Repository: Send + Sync {
    fn load_player(&self, id: &PlayerId) -> Result<Versioned<Player>, RepoError>;

    /// Store `player` if its current version equals `expected_version`
    /// (`None` to create). Returns the new version.
    fn save_player(&self, player: &Player, expected_version: Option<u64>)
        -> Result<u64, RepoError>;

    fn load_network(&self) -> Result<Versioned<NetworkState>, RepoError>;

    /// Store `state` if the stored `work_height` equals `expected_version`
    /// (`None` to create). Returns the new version, i.e. `state.work_height`.
    fn save_network(
        &self,
        state: &NetworkState,
        expected_version: Option<u64>,
    ) -> Result<u64, RepoError>;
}
