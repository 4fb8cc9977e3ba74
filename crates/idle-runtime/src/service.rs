//! Command surface used by request handlers.
//!
//! Every player command follows the same sequence: load the record and its
//! version, credit offline earnings up to now, apply the command, unlock
//! achievements, then write back against the version that was read. A
//! concurrent write surfaces as a version conflict and the whole sequence is
//! retried from a fresh read, up to a bounded number of attempts.

use crate::network::NetworkSimulator;
use crate::shared::SharedNetwork;
use chrono::{DateTime, Duration, Utc};
use idle_core::{
    validate_player, AchievementId, AssetType, Clock, GameConfig, NetworkState, Player, PlayerId,
    UpgradeType, ValidationError,
};
use idle_econ::{
    catchup, check_and_grant, click, grant_boost, player_view, prestige, prune_expired_boosts,
    purchase_asset, purchase_upgrade, EconError, PlayerView,
};
use persistence::{RepoError, Repository};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Attempts made before a contended command gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Errors surfaced to request handlers.
#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    /// The stored player record is not a valid state.
    #[error("corrupt player record: {0}")]
    InvalidRecord(ValidationError),
    /// Every attempt lost a version race.
    #[error("gave up after {attempts} conflicting attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Result of a player command.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutcome<T> {
    /// Player record as stored.
    pub player: Player,
    pub view: PlayerView,
    /// Stored version after the write.
    pub version: u64,
    /// Command-specific value (purchase cost, click reward, prestige points, ...).
    pub result: T,
    /// Coins credited by the catch-up that preceded the command.
    pub offline_earnings: Decimal,
    /// Achievements unlocked by this command.
    pub unlocked: Vec<AchievementId>,
    /// Attempts used, 1 when there was no contention.
    pub attempts: u32,
}

pub struct GameService<R: Repository, C: Clock> {
    cfg: GameConfig,
    repo: R,
    clock: C,
    network: SharedNetwork,
    simulator: Mutex<NetworkSimulator>,
    max_attempts: u32,
}

impl<R: Repository, C: Clock> GameService<R, C> {
    /// Validate `cfg` and attach to the stored network, creating genesis if absent.
    pub fn new(cfg: GameConfig, repo: R, clock: C) -> Result<Self, ServiceError> {
        cfg.validate()?;
        let state = match repo.load_network() {
            Ok(stored) => stored.value,
            Err(RepoError::NotFound(_)) => {
                let genesis = NetworkState::genesis(&cfg.network, clock.now());
                match repo.save_network(&genesis, None) {
                    Ok(_) => {
                        info!("network genesis stored");
                        genesis
                    }
                    Err(RepoError::Conflict { .. }) => repo.load_network()?.value,
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        let simulator = Mutex::new(NetworkSimulator::new(cfg.network.clone()));
        Ok(Self {
            cfg,
            repo,
            clock,
            network: SharedNetwork::new(state),
            simulator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn network(&self) -> NetworkState {
        self.network.snapshot()
    }

    fn simulator(&self) -> MutexGuard<'_, NetworkSimulator> {
        self.simulator.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Create the player on first contact; an existing player is just synced.
    pub fn init(&self, id: &PlayerId) -> Result<CommandOutcome<()>, ServiceError> {
        let now = self.clock.now();
        let fresh = Player::new(id.clone(), now);
        match self.repo.save_player(&fresh, None) {
            Ok(version) => {
                info!(player = %id, "player created");
                let network = self.network.snapshot();
                Ok(CommandOutcome {
                    view: player_view(&self.cfg.economy, &fresh, &network, now)?,
                    player: fresh,
                    version,
                    result: (),
                    offline_earnings: Decimal::ZERO,
                    unlocked: Vec::new(),
                    attempts: 1,
                })
            }
            Err(RepoError::Conflict { .. }) => self.sync(id),
            Err(e) => Err(e.into()),
        }
    }

    /// Credit offline earnings and return the current view.
    pub fn sync(&self, id: &PlayerId) -> Result<CommandOutcome<()>, ServiceError> {
        self.execute(id, "sync", |_, player, _, _| Ok((player.clone(), ())))
    }

    /// Buy one asset; the result is the price paid.
    pub fn purchase_asset(
        &self,
        id: &PlayerId,
        asset: AssetType,
    ) -> Result<CommandOutcome<Decimal>, ServiceError> {
        self.execute(id, "purchase_asset", |cfg, player, _, _| {
            let p = purchase_asset(&cfg.economy, player, asset)?;
            Ok((p.player, p.cost))
        })
    }

    /// Buy the next upgrade level; the result is the price paid.
    pub fn purchase_upgrade(
        &self,
        id: &PlayerId,
        upgrade: UpgradeType,
    ) -> Result<CommandOutcome<Decimal>, ServiceError> {
        self.execute(id, "purchase_upgrade", |cfg, player, _, _| {
            let p = purchase_upgrade(&cfg.economy, player, upgrade)?;
            Ok((p.player, p.cost))
        })
    }

    /// Register one click; the result is the reward credited.
    pub fn click(&self, id: &PlayerId) -> Result<CommandOutcome<Decimal>, ServiceError> {
        self.execute(id, "click", |cfg, player, network, now| {
            let c = click(&cfg.economy, player, network, now)?;
            Ok((c.player, c.reward))
        })
    }

    /// Prestige; the result is the number of points gained.
    pub fn prestige(&self, id: &PlayerId) -> Result<CommandOutcome<u64>, ServiceError> {
        self.execute(id, "prestige", |cfg, player, _, now| {
            let p = prestige(&cfg.economy, player, now)?;
            Ok((p.player, p.gained_points))
        })
    }

    /// Attach a timed boost to the player.
    pub fn boost(
        &self,
        id: &PlayerId,
        multiplier: f64,
        duration: Duration,
    ) -> Result<CommandOutcome<()>, ServiceError> {
        self.execute(id, "boost", |_, player, _, now| {
            Ok((grant_boost(player, multiplier, duration, now)?, ()))
        })
    }

    /// Advance the shared network by one step and persist it.
    ///
    /// Local steps are serialized by the simulator lock. A conflict on the
    /// stored record means another process stepped first; the local copy is
    /// refreshed and the step retried.
    pub fn step_network(&self) -> Result<NetworkState, ServiceError> {
        let mut sim = self.simulator();
        for attempt in 1..=self.max_attempts {
            let now = self.clock.now();
            let current = self.network.snapshot();
            let next = sim.step(&current, now);
            match self.repo.save_network(&next, Some(current.work_height)) {
                Ok(_) => {
                    self.network
                        .compare_and_swap(current.work_height, next.clone())?;
                    return Ok(next);
                }
                Err(RepoError::Conflict { .. }) => {
                    warn!(attempt, height = current.work_height, "network step lost race");
                    let stored = self.repo.load_network()?;
                    self.network
                        .compare_and_swap(current.work_height, stored.value)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }

    fn execute<T, F>(
        &self,
        id: &PlayerId,
        command: &'static str,
        op: F,
    ) -> Result<CommandOutcome<T>, ServiceError>
    where
        F: Fn(&GameConfig, &Player, &NetworkState, DateTime<Utc>) -> Result<(Player, T), EconError>,
    {
        let econ = &self.cfg.economy;
        for attempt in 1..=self.max_attempts {
            let stored = self.repo.load_player(id)?;
            validate_player(&stored.value).map_err(ServiceError::InvalidRecord)?;
            let now = self.clock.now();
            let network = self.network.snapshot();

            let caught = catchup(econ, &stored.value, &network, now)?;
            let current = prune_expired_boosts(&caught.player, now);
            let (player, result) = op(&self.cfg, &current, &network, now)?;
            let (player, unlocked) = check_and_grant(econ, &player, now);

            match self.repo.save_player(&player, Some(stored.version)) {
                Ok(version) => {
                    debug!(player = %id, command, version, attempt, "command applied");
                    return Ok(CommandOutcome {
                        view: player_view(econ, &player, &network, now)?,
                        player,
                        version,
                        result,
                        offline_earnings: caught.earnings,
                        unlocked,
                        attempts: attempt,
                    });
                }
                Err(RepoError::Conflict { .. }) => {
                    warn!(player = %id, command, attempt, "concurrent update, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
