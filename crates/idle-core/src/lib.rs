#![deny(warnings)]

//! Core domain models and invariants for Hash Tycoon.
//!
//! This crate defines the serializable records shared by the economy engine,
//! the network simulator and the persistence layer, together with the tunable
//! catalog ([`GameConfig`]), the injected [`Clock`] and validation helpers that
//! guarantee basic invariants.

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AchievementTable, AssetSpec, EconomyConfig, GameConfig, NetworkConfig, RankTier, UpgradeSpec,
    UpgradeTarget,
};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits kept on coin balances (satoshi granularity).
pub const COIN_DP: u32 = 8;

/// Opaque player identifier assigned by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Purchasable, stacking production units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// Entry-level hash rate.
    GpuMiner,
    AsicFarm,
    MiningPool,
    /// Earns fees from the pending work pool.
    CryptoExchange,
    NftMarketplace,
    /// Earns staking rewards on a fraction of the balance.
    DefiPlatform,
}

impl AssetType {
    /// All asset types in catalog order.
    pub const ALL: [AssetType; 6] = [
        AssetType::GpuMiner,
        AssetType::AsicFarm,
        AssetType::MiningPool,
        AssetType::CryptoExchange,
        AssetType::NftMarketplace,
        AssetType::DefiPlatform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::GpuMiner => "gpu_miner",
            AssetType::AsicFarm => "asic_farm",
            AssetType::MiningPool => "mining_pool",
            AssetType::CryptoExchange => "crypto_exchange",
            AssetType::NftMarketplace => "nft_marketplace",
            AssetType::DefiPlatform => "defi_platform",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownAsset(s.to_string()))
    }
}

/// Purchasable modifiers applied to capacity or click power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeType {
    FasterInternet,
    BetterCooling,
    AiOptimization,
    QuantumMining,
    /// The dedicated click-power upgrade.
    ClickUpgrade,
}

impl UpgradeType {
    /// All upgrade types in catalog order.
    pub const ALL: [UpgradeType; 5] = [
        UpgradeType::FasterInternet,
        UpgradeType::BetterCooling,
        UpgradeType::AiOptimization,
        UpgradeType::QuantumMining,
        UpgradeType::ClickUpgrade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeType::FasterInternet => "faster_internet",
            UpgradeType::BetterCooling => "better_cooling",
            UpgradeType::AiOptimization => "ai_optimization",
            UpgradeType::QuantumMining => "quantum_mining",
            UpgradeType::ClickUpgrade => "click_upgrade",
        }
    }
}

impl fmt::Display for UpgradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpgradeType::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownUpgrade(s.to_string()))
    }
}

/// Milestone identifier, e.g. "asset:gpu_miner:10" or "prestige:5".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub String);

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-limited multiplier on income and click rewards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    /// Multiplier (> 0) applied while active.
    pub multiplier: f64,
    /// The boost stops applying at this instant.
    pub expires_at: DateTime<Utc>,
}

impl Boost {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Identity-bearing aggregate root for a single player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Stable identity, preserved across prestige.
    pub id: PlayerId,
    /// Spendable balance (>= 0).
    #[serde(with = "rust_decimal::serde::str")]
    pub coins: Decimal,
    /// Permanent bonus points, never decreasing.
    pub prestige_points: u64,
    /// Permanent multiplier derived from prestige points (> 0).
    pub income_multiplier: f64,
    /// Owned asset counts, one entry per type.
    pub assets: BTreeMap<AssetType, u32>,
    /// Owned upgrade levels, one entry per type (one-time upgrades stay at 1).
    pub upgrades: BTreeMap<UpgradeType, u32>,
    /// Active or not-yet-pruned boosts.
    pub boosts: Vec<Boost>,
    /// Unlocked milestones with their unlock time. Append-only.
    pub achievements: BTreeMap<AchievementId, DateTime<Utc>>,
    /// Every coin ever credited by income, catch-up or clicks.
    #[serde(with = "rust_decimal::serde::str")]
    pub lifetime_earnings: Decimal,
    pub total_clicks: u64,
    pub prestige_count: u32,
    pub last_active_at: DateTime<Utc>,
    /// Start of the window not yet credited by offline catch-up.
    pub last_income_tick_at: DateTime<Utc>,
}

impl Player {
    /// Fresh player with a zero baseline, as created on first contact.
    pub fn new(id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            coins: Decimal::ZERO,
            prestige_points: 0,
            income_multiplier: 1.0,
            assets: BTreeMap::new(),
            upgrades: BTreeMap::new(),
            boosts: Vec::new(),
            achievements: BTreeMap::new(),
            lifetime_earnings: Decimal::ZERO,
            total_clicks: 0,
            prestige_count: 0,
            last_active_at: now,
            last_income_tick_at: now,
        }
    }

    pub fn asset_count(&self, asset: AssetType) -> u32 {
        self.assets.get(&asset).copied().unwrap_or(0)
    }

    pub fn upgrade_level(&self, upgrade: UpgradeType) -> u32 {
        self.upgrades.get(&upgrade).copied().unwrap_or(0)
    }

    /// Sum of all owned upgrade levels.
    pub fn total_upgrade_levels(&self) -> u64 {
        self.upgrades.values().map(|&l| l as u64).sum()
    }

    pub fn has_achievement(&self, id: &AchievementId) -> bool {
        self.achievements.contains_key(id)
    }
}

/// The single shared simulated network all players mine against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Block height; also the record version for compare-and-swap writes.
    pub work_height: u64,
    /// Mining difficulty (>= configured minimum).
    pub difficulty: f64,
    /// Aggregate capacity across all players.
    pub global_capacity: f64,
    /// Noisy per-step sample of `global_capacity`.
    pub observed_capacity: f64,
    /// Queued transactions feeding fee income.
    pub pending_work_pool: u64,
    /// Coin market price (>= floor).
    pub market_price: f64,
    pub last_step_at: DateTime<Utc>,
    /// Start of the current difficulty adjustment window.
    pub window_started_at: DateTime<Utc>,
}

impl NetworkState {
    /// Initial state from the configured constants.
    pub fn genesis(cfg: &NetworkConfig, now: DateTime<Utc>) -> Self {
        Self {
            work_height: 0,
            difficulty: cfg.initial_difficulty,
            global_capacity: cfg.initial_capacity,
            observed_capacity: cfg.initial_capacity,
            pending_work_pool: 0,
            market_price: cfg.initial_price,
            last_step_at: now,
            window_started_at: now,
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Asset type missing from the catalog or not a known name.
    #[error("unknown asset type: {0}")]
    UnknownAsset(String),
    /// Upgrade type missing from the catalog or not a known name.
    #[error("unknown upgrade type: {0}")]
    UnknownUpgrade(String),
    /// One-time upgrade purchased twice.
    #[error("upgrade already owned: {0}")]
    AlreadyOwned(UpgradeType),
    /// Balance or price must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// A tunable is out of its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Round a balance to coin granularity.
pub fn round_coins(value: Decimal) -> Decimal {
    value.round_dp(COIN_DP)
}

/// Convert a non-negative floating amount into a coin balance.
pub fn coins_from_f64(value: f64) -> Result<Decimal, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeMoney);
    }
    Decimal::from_f64(value)
        .map(round_coins)
        .ok_or(ValidationError::NonFinite)
}

/// Validate a player record.
pub fn validate_player(p: &Player) -> Result<(), ValidationError> {
    if p.coins < Decimal::ZERO || p.lifetime_earnings < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if !p.income_multiplier.is_finite() || p.income_multiplier <= 0.0 {
        return Err(ValidationError::NonFinite);
    }
    for b in &p.boosts {
        if !b.multiplier.is_finite() || b.multiplier <= 0.0 {
            return Err(ValidationError::NonFinite);
        }
    }
    Ok(())
}

/// Validate the network record against its configured floors.
pub fn validate_network_state(
    n: &NetworkState,
    cfg: &NetworkConfig,
) -> Result<(), ValidationError> {
    let reals = [
        n.difficulty,
        n.global_capacity,
        n.observed_capacity,
        n.market_price,
    ];
    if reals.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ValidationError::NonFinite);
    }
    if n.difficulty < cfg.initial_difficulty {
        return Err(ValidationError::InvalidConfig(format!(
            "difficulty {} below minimum {}",
            n.difficulty, cfg.initial_difficulty
        )));
    }
    if n.market_price < cfg.price_floor {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}
