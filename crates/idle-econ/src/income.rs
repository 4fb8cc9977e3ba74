//! Per-second income and click rewards.
//!
//! Income is expressed in coins per second. Both income and click power share
//! the same permanent multiplier chain (prestige multiplier, prestige bonus,
//! market price); boosts are layered on top by [`boosted_income`] and the click
//! action so the base formulas stay independent of the clock.

use crate::production::{capacity, fee_income, level_exp, staking_income};
use crate::EconError;
use chrono::{DateTime, Utc};
use idle_core::{EconomyConfig, NetworkState, Player, UpgradeTarget};
use serde::Serialize;
use tracing::debug;

/// Breakdown of one income evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IncomeReport {
    /// Reward for a whole block at the current height.
    pub block_reward: f64,
    /// Player hash rate.
    pub capacity: f64,
    /// Player share of the observed network capacity.
    pub mining_share: f64,
    pub mining: f64,
    pub fees: f64,
    pub staking: f64,
    /// Permanent multiplier chain excluding market price.
    pub multiplier: f64,
    /// Final coins per second.
    pub per_second: f64,
}

/// Block reward after `floor(height / halving_interval)` halvings.
pub fn block_reward(cfg: &EconomyConfig, height: u64) -> f64 {
    let halvings = height / cfg.halving_interval.max(1);
    let divisor = 2f64.powi(i32::try_from(halvings).unwrap_or(i32::MAX));
    if divisor.is_finite() {
        cfg.initial_block_reward / divisor
    } else {
        0.0
    }
}

/// `income_multiplier × (1 + prestige_points × prestige_bonus_rate)`.
pub(crate) fn permanent_multiplier(cfg: &EconomyConfig, player: &Player) -> f64 {
    player.income_multiplier * (1.0 + player.prestige_points as f64 * cfg.prestige_bonus_rate)
}

fn finite(what: &str, v: f64) -> Result<f64, EconError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(EconError::InvariantViolation(format!("{what} evaluated to {v}")))
    }
}

/// Full income evaluation with every intermediate term.
pub fn income_report(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
) -> Result<IncomeReport, EconError> {
    let reward = block_reward(cfg, network.work_height);
    let cap = capacity(cfg, player)?;
    // Zero observed capacity is reachable at game start.
    let share = if network.observed_capacity > 0.0 && network.observed_capacity.is_finite() {
        cap / network.observed_capacity
    } else {
        0.0
    };
    let mining = reward * share;
    let fees = fee_income(cfg, player, network)?;
    let staking = staking_income(cfg, player)?;
    let total = (mining + fees + staking) * network.market_price;
    let multiplier = permanent_multiplier(cfg, player);
    let per_second = finite("income", total * multiplier)?;
    debug!(
        player = %player.id,
        mining,
        fees,
        staking,
        per_second,
        "income calculated"
    );
    Ok(IncomeReport {
        block_reward: reward,
        capacity: cap,
        mining_share: share,
        mining,
        fees,
        staking,
        multiplier,
        per_second,
    })
}

/// Coins per second earned by `player` against `network`.
pub fn income(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
) -> Result<f64, EconError> {
    Ok(income_report(cfg, player, network)?.per_second)
}

/// Reward for a single click.
///
/// The base term grows with `sqrt(global_capacity / difficulty)`. The click
/// upgrade applies its full effect per level while every other upgrade only
/// contributes `sqrt(effect)` per level.
pub fn click_power(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
) -> Result<f64, EconError> {
    let mut power = if network.difficulty > 0.0 && network.global_capacity > 0.0 {
        cfg.base_click * (network.global_capacity / network.difficulty).sqrt()
    } else {
        0.0
    };
    for (&upgrade, &level) in &player.upgrades {
        let spec = cfg.upgrade(upgrade)?;
        let per_level = match spec.target {
            UpgradeTarget::Click => spec.effect,
            UpgradeTarget::Capacity => spec.effect.sqrt(),
        };
        power *= per_level.powi(level_exp(level));
    }
    let value = power * permanent_multiplier(cfg, player) * network.market_price;
    debug!(player = %player.id, base = power, value, "click power calculated");
    finite("click power", value)
}

/// Product of all boosts still active at `now`.
pub fn boost_factor(player: &Player, now: DateTime<Utc>) -> f64 {
    player
        .boosts
        .iter()
        .filter(|b| b.is_active(now))
        .map(|b| b.multiplier)
        .product()
}

/// [`income`] with active boosts applied.
pub fn boosted_income(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
    now: DateTime<Utc>,
) -> Result<f64, EconError> {
    finite("boosted income", income(cfg, player, network)? * boost_factor(player, now))
}
