//! Mutex-guarded in-process store.

use crate::{RepoError, Repository, Snapshot, Versioned, SNAPSHOT_FORMAT};
use chrono::{DateTime, Utc};
use idle_core::{NetworkState, Player, PlayerId};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Tables {
    players: BTreeMap<PlayerId, Versioned<Player>>,
    network: Option<NetworkState>,
}

/// Repository kept entirely in memory; the reference implementation of the
/// optimistic-concurrency contract.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

fn check(expected: Option<u64>, found: Option<u64>) -> Result<(), RepoError> {
    if expected == found {
        Ok(())
    } else {
        warn!(?expected, ?found, "version conflict");
        Err(RepoError::Conflict { expected, found })
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }

    /// Copy every record into a [`Snapshot`].
    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> Snapshot {
        let tables = self.lock();
        Snapshot {
            format: SNAPSHOT_FORMAT,
            taken_at,
            network: tables.network.clone(),
            players: tables.players.values().map(|v| v.value.clone()).collect(),
        }
    }

    /// Build a store from a snapshot. Every restored player starts at version 1.
    pub fn restore(snapshot: Snapshot) -> Result<Self, RepoError> {
        snapshot.check_format()?;
        let players = snapshot
            .players
            .into_iter()
            .map(|p| (p.id.clone(), Versioned { version: 1, value: p }))
            .collect();
        Ok(Self {
            tables: Mutex::new(Tables {
                players,
                network: snapshot.network,
            }),
        })
    }
}

impl Repository for InMemoryRepository {
    fn load_player(&self, id: &PlayerId) -> Result<Versioned<Player>, RepoError> {
        self.lock()
            .players
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(format!("player {id}")))
    }

    fn save_player(
        &self,
        player: &Player,
        expected_version: Option<u64>,
    ) -> Result<u64, RepoError> {
        let mut tables = self.lock();
        let found = tables.players.get(&player.id).map(|v| v.version);
        check(expected_version, found)?;
        let version = found.map_or(1, |v| v + 1);
        tables.players.insert(
            player.id.clone(),
            Versioned {
                version,
                value: player.clone(),
            },
        );
        debug!(player = %player.id, version, "player saved");
        Ok(version)
    }

    fn load_network(&self) -> Result<Versioned<NetworkState>, RepoError> {
        self.lock()
            .network
            .as_ref()
            .map(|n| Versioned {
                version: n.work_height,
                value: n.clone(),
            })
            .ok_or_else(|| RepoError::NotFound("network".into()))
    }

    fn save_network(
        &self,
        state: &NetworkState,
        expected_version: Option<u64>,
    ) -> Result<u64, RepoError> {
        let mut tables = self.lock();
        check(expected_version, tables.network.as_ref().map(|n| n.work_height))?;
        tables.network = Some(state.clone());
        debug!(height = state.work_height, "network saved");
        Ok(state.work_height)
    }
}
