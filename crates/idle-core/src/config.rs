//! Tunables and the purchasable catalog.
//!
//! Every field has a default taken from the live game balance, so an empty
//! YAML document yields a playable configuration.

use crate::{AssetType, UpgradeType, ValidationError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Static data for one asset type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Display name.
    pub name: String,
    /// Price of the first unit.
    pub base_cost: Decimal,
    /// Hash rate contributed per unit.
    #[serde(default)]
    pub capacity: f64,
    /// Share of the pending work pool earned per unit.
    #[serde(default)]
    pub fee_rate: f64,
    /// Staking yield per unit on the staked fraction of the balance.
    #[serde(default)]
    pub staking_rate: f64,
}

/// What an upgrade multiplies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeTarget {
    Capacity,
    Click,
}

/// Static data for one upgrade type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeSpec {
    pub name: String,
    /// One-time price, or the price of the first level when repeatable.
    pub cost: Decimal,
    /// Multiplicative effect per level (> 1).
    pub effect: f64,
    pub target: UpgradeTarget,
    /// Repeatable upgrades stack and double in price per level.
    #[serde(default)]
    pub repeatable: bool,
}

/// Thresholds for milestone badges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementTable {
    pub asset_counts: Vec<u32>,
    pub coin_milestones: Vec<Decimal>,
    pub upgrade_counts: Vec<u64>,
    pub prestige_points: Vec<u64>,
}

impl Default for AchievementTable {
    fn default() -> Self {
        Self {
            asset_counts: vec![10, 50, 100],
            coin_milestones: vec![
                Decimal::from(1_000u64),
                Decimal::from(1_000_000u64),
                Decimal::from(1_000_000_000u64),
            ],
            upgrade_counts: vec![5, 10],
            prestige_points: vec![1, 5, 10],
        }
    }
}

/// One rung of the rank ladder, keyed by lifetime earnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankTier {
    pub name: String,
    pub threshold: Decimal,
}

fn default_ranks() -> Vec<RankTier> {
    [
        ("Novice Miner", 0u64),
        ("Blockchain Pioneer", 100_000),
        ("Crypto Enthusiast", 10_000_000),
        ("Mining Magnate", 1_000_000_000),
        ("Blockchain Tycoon", 100_000_000_000),
        ("Crypto Whale", 10_000_000_000_000),
        ("Digital Asset Mogul", 1_000_000_000_000_000),
        ("Crypto Overlord", 100_000_000_000_000_000),
    ]
    .into_iter()
    .map(|(name, threshold)| RankTier {
        name: name.to_string(),
        threshold: Decimal::from(threshold),
    })
    .collect()
}

fn default_assets() -> BTreeMap<AssetType, AssetSpec> {
    let spec = |name: &str, cost: u64, capacity: f64, fee_rate: f64, staking_rate: f64| AssetSpec {
        name: name.to_string(),
        base_cost: Decimal::from(cost),
        capacity,
        fee_rate,
        staking_rate,
    };
    BTreeMap::from([
        (AssetType::GpuMiner, spec("GPU Miner", 15, 1.0, 0.0, 0.0)),
        (AssetType::AsicFarm, spec("ASIC Farm", 100, 10.0, 0.0, 0.0)),
        (AssetType::MiningPool, spec("Mining Pool", 1_100, 100.0, 0.0, 0.0)),
        (
            AssetType::CryptoExchange,
            spec("Crypto Exchange", 12_000, 0.0, 0.001, 0.0),
        ),
        (
            AssetType::NftMarketplace,
            spec("NFT Marketplace", 130_000, 0.0, 0.025, 0.0),
        ),
        (
            AssetType::DefiPlatform,
            spec("DeFi Platform", 1_400_000, 0.0, 0.0, 0.0001),
        ),
    ])
}

fn default_upgrades() -> BTreeMap<UpgradeType, UpgradeSpec> {
    let spec = |name: &str, cost: u64, effect: f64, target: UpgradeTarget, repeatable: bool| {
        UpgradeSpec {
            name: name.to_string(),
            cost: Decimal::from(cost),
            effect,
            target,
            repeatable,
        }
    };
    BTreeMap::from([
        (
            UpgradeType::FasterInternet,
            spec("Faster Internet", 1_000, 1.05, UpgradeTarget::Capacity, false),
        ),
        (
            UpgradeType::BetterCooling,
            spec("Better Cooling", 5_000, 1.07, UpgradeTarget::Capacity, false),
        ),
        (
            UpgradeType::AiOptimization,
            spec("AI Optimization", 20_000, 1.1, UpgradeTarget::Capacity, false),
        ),
        (
            UpgradeType::QuantumMining,
            spec("Quantum Mining", 1_000_000, 2.0, UpgradeTarget::Capacity, false),
        ),
        (
            UpgradeType::ClickUpgrade,
            spec("Click Power", 500, 1.25, UpgradeTarget::Click, true),
        ),
    ])
}

/// Player-side economy tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Price growth per owned unit of an asset.
    pub asset_growth_factor: f64,
    pub assets: BTreeMap<AssetType, AssetSpec>,
    pub upgrades: BTreeMap<UpgradeType, UpgradeSpec>,
    /// Balance required to prestige.
    pub prestige_threshold: Decimal,
    /// Income multiplier gained per prestige point.
    pub prestige_multiplier_rate: f64,
    /// Additional income bonus per prestige point.
    pub prestige_bonus_rate: f64,
    pub initial_block_reward: f64,
    /// Blocks between reward halvings.
    pub halving_interval: u64,
    pub fee_scale: f64,
    /// Fraction of the balance treated as staked.
    pub stake_fraction: f64,
    pub base_click: f64,
    /// Shorter catch-up windows are left to accumulate.
    pub min_catchup_secs: f64,
    /// Optional cap on the credited offline window.
    pub max_offline_secs: Option<f64>,
    pub achievements: AchievementTable,
    pub ranks: Vec<RankTier>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            asset_growth_factor: 1.15,
            assets: default_assets(),
            upgrades: default_upgrades(),
            prestige_threshold: Decimal::from(1_000_000u64),
            prestige_multiplier_rate: 0.1,
            prestige_bonus_rate: 0.02,
            initial_block_reward: 50.0,
            halving_interval: 210_000,
            fee_scale: 0.0001,
            stake_fraction: 0.1,
            base_click: 0.001,
            min_catchup_secs: 1.0,
            max_offline_secs: None,
            achievements: AchievementTable::default(),
            ranks: default_ranks(),
        }
    }
}

impl EconomyConfig {
    pub fn asset(&self, asset: AssetType) -> Result<&AssetSpec, ValidationError> {
        self.assets
            .get(&asset)
            .ok_or_else(|| ValidationError::UnknownAsset(asset.to_string()))
    }

    pub fn upgrade(&self, upgrade: UpgradeType) -> Result<&UpgradeSpec, ValidationError> {
        self.upgrades
            .get(&upgrade)
            .ok_or_else(|| ValidationError::UnknownUpgrade(upgrade.to_string()))
    }
}

/// Shared network simulation tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Starting difficulty, also the floor for retargeting.
    pub initial_difficulty: f64,
    pub initial_capacity: f64,
    pub initial_price: f64,
    /// Steps between difficulty retargets.
    pub difficulty_adjustment_interval: u64,
    /// Intended wall-clock seconds between steps.
    pub target_step_secs: f64,
    /// Optional bound on a single retarget in either direction.
    pub max_adjustment_factor: Option<f64>,
    /// Per-step growth of global capacity.
    pub capacity_growth: f64,
    /// Observed capacity is sampled in `[1 - noise, 1 + noise]` of the global value.
    pub observed_noise: f64,
    /// Expected transactions mined out of the pool per step.
    pub drain_amount: u64,
    /// Largest relative price move per step.
    pub price_change_bound: f64,
    pub price_floor: f64,
    /// Seed for the deterministic simulator RNG.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 1.0,
            initial_capacity: 1000.0,
            initial_price: 1.0,
            difficulty_adjustment_interval: 2016,
            target_step_secs: 600.0,
            max_adjustment_factor: None,
            capacity_growth: 1.0001,
            observed_noise: 0.1,
            drain_amount: 1000,
            price_change_bound: 0.01,
            price_floor: 0.01,
            seed: 42,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub economy: EconomyConfig,
    pub network: NetworkConfig,
}

fn positive(name: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidConfig(format!("{name} must be > 0, got {v}")))
    }
}

fn non_negative(name: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidConfig(format!("{name} must be >= 0, got {v}")))
    }
}

impl GameConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        let cfg: GameConfig = serde_yaml::from_str(text)
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        debug!(
            assets = cfg.economy.assets.len(),
            upgrades = cfg.economy.upgrades.len(),
            "loaded game config"
        );
        Ok(cfg)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ValidationError::InvalidConfig(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Reject tunables that would make the formulas ill-defined.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let e = &self.economy;
        if !(e.asset_growth_factor.is_finite() && e.asset_growth_factor > 1.0) {
            return Err(ValidationError::InvalidConfig(
                "asset_growth_factor must be > 1".into(),
            ));
        }
        if e.prestige_threshold <= Decimal::ZERO {
            return Err(ValidationError::InvalidConfig(
                "prestige_threshold must be > 0".into(),
            ));
        }
        if e.halving_interval == 0 {
            return Err(ValidationError::InvalidConfig(
                "halving_interval must be > 0".into(),
            ));
        }
        non_negative("prestige_multiplier_rate", e.prestige_multiplier_rate)?;
        non_negative("prestige_bonus_rate", e.prestige_bonus_rate)?;
        non_negative("initial_block_reward", e.initial_block_reward)?;
        non_negative("fee_scale", e.fee_scale)?;
        non_negative("stake_fraction", e.stake_fraction)?;
        non_negative("base_click", e.base_click)?;
        non_negative("min_catchup_secs", e.min_catchup_secs)?;
        if let Some(cap) = e.max_offline_secs {
            positive("max_offline_secs", cap)?;
        }
        for (asset, spec) in &e.assets {
            if spec.base_cost <= Decimal::ZERO {
                return Err(ValidationError::InvalidConfig(format!(
                    "{asset}: base_cost must be > 0"
                )));
            }
            // each unit must add at least one whole coin or floor() flattens the curve
            let step = spec.base_cost.to_f64().unwrap_or(0.0) * (e.asset_growth_factor - 1.0);
            if step < 1.0 {
                return Err(ValidationError::InvalidConfig(format!(
                    "{asset}: base_cost × (asset_growth_factor - 1) must be >= 1, got {step}"
                )));
            }
            non_negative("capacity", spec.capacity)?;
            non_negative("fee_rate", spec.fee_rate)?;
            non_negative("staking_rate", spec.staking_rate)?;
        }
        for (upgrade, spec) in &e.upgrades {
            if spec.cost <= Decimal::ZERO {
                return Err(ValidationError::InvalidConfig(format!(
                    "{upgrade}: cost must be > 0"
                )));
            }
            positive("effect", spec.effect)?;
        }

        let n = &self.network;
        positive("initial_difficulty", n.initial_difficulty)?;
        positive("initial_capacity", n.initial_capacity)?;
        positive("target_step_secs", n.target_step_secs)?;
        positive("capacity_growth", n.capacity_growth)?;
        positive("price_floor", n.price_floor)?;
        if n.initial_price < n.price_floor {
            return Err(ValidationError::InvalidConfig(
                "initial_price below price_floor".into(),
            ));
        }
        if n.difficulty_adjustment_interval == 0 {
            return Err(ValidationError::InvalidConfig(
                "difficulty_adjustment_interval must be > 0".into(),
            ));
        }
        if let Some(bound) = n.max_adjustment_factor {
            if !(bound.is_finite() && bound >= 1.0) {
                return Err(ValidationError::InvalidConfig(
                    "max_adjustment_factor must be >= 1".into(),
                ));
            }
        }
        if !(0.0..1.0).contains(&n.observed_noise) {
            return Err(ValidationError::InvalidConfig(
                "observed_noise must be in [0, 1)".into(),
            ));
        }
        if !(0.0..1.0).contains(&n.price_change_bound) {
            return Err(ValidationError::InvalidConfig(
                "price_change_bound must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}
