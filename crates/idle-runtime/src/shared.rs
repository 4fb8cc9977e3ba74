//! In-process handle on the single shared network record.

use crate::network::NetworkSimulator;
use chrono::{DateTime, Utc};
use idle_core::NetworkState;
use persistence::RepoError;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Many readers, one writer. Income and click evaluation read snapshots;
/// simulator steps hold the write lock so two steps never interleave.
#[derive(Debug)]
pub struct SharedNetwork {
    state: RwLock<NetworkState>,
}

impl SharedNetwork {
    pub fn new(state: NetworkState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NetworkState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, NetworkState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> NetworkState {
        self.read().clone()
    }

    pub fn height(&self) -> u64 {
        self.read().work_height
    }

    /// Step the network under the write lock and return the new state.
    pub fn advance(&self, sim: &mut NetworkSimulator, now: DateTime<Utc>) -> NetworkState {
        let mut guard = self.write();
        let next = sim.step(&guard, now);
        *guard = next.clone();
        next
    }

    /// Replace the state only if its height is still `expected_height`.
    pub fn compare_and_swap(&self, expected_height: u64, next: NetworkState) -> Result<(), RepoError> {
        let mut guard = self.write();
        if guard.work_height != expected_height {
            warn!(
                expected = expected_height,
                found = guard.work_height,
                "stale network update rejected"
            );
            return Err(RepoError::Conflict {
                expected: Some(expected_height),
                found: Some(guard.work_height),
            });
        }
        *guard = next;
        Ok(())
    }
}
