//! Cost curves for assets and upgrades.

use crate::EconError;
use idle_core::{AssetType, EconomyConfig, Player, UpgradeType};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::debug;

/// Price of the next unit of `asset` when `owned` units are already held.
///
/// `floor(base_cost × growth^owned)`; strictly increasing in `owned` for any
/// validated catalog, which requires each unit to add at least one coin.
///
/// Example:
/// base 15, growth 1.15: owned 0 → 15, owned 5 → 30.
pub fn asset_cost(cfg: &EconomyConfig, asset: AssetType, owned: u32) -> Result<Decimal, EconError> {
    let spec = cfg.asset(asset)?;
    let base = spec
        .base_cost
        .to_f64()
        .ok_or_else(|| EconError::InvariantViolation(format!("{asset}: base cost")))?;
    let exp = i32::try_from(owned)
        .map_err(|_| EconError::InvariantViolation(format!("{asset}: count {owned}")))?;
    let raw = (base * cfg.asset_growth_factor.powi(exp)).floor();
    let cost = Decimal::from_f64(raw).ok_or_else(|| {
        EconError::InvariantViolation(format!("{asset} cost out of range at count {owned}"))
    })?;
    debug!(%asset, owned, %cost, "asset cost");
    Ok(cost)
}

/// Price of the next level of `upgrade` when `owned` levels are held.
///
/// One-time upgrades have a fixed price; repeatable ones cost `cost × 2^owned`.
/// Whether a one-time upgrade may be bought again is decided at purchase time.
pub fn upgrade_cost(
    cfg: &EconomyConfig,
    upgrade: UpgradeType,
    owned: u32,
) -> Result<Decimal, EconError> {
    let spec = cfg.upgrade(upgrade)?;
    if !spec.repeatable {
        return Ok(spec.cost);
    }
    let overflow =
        || EconError::InvariantViolation(format!("{upgrade} cost out of range at level {owned}"));
    if owned >= 96 {
        return Err(overflow());
    }
    let factor = Decimal::from_u128(1u128 << owned).ok_or_else(overflow)?;
    spec.cost.checked_mul(factor).ok_or_else(overflow)
}

/// Whether `player` can pay `cost` without going negative.
pub fn can_afford(player: &Player, cost: Decimal) -> bool {
    player.coins >= cost
}
