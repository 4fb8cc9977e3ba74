//! Production capacity and the non-mining income streams.

use crate::EconError;
use idle_core::{EconomyConfig, NetworkState, Player, UpgradeTarget};
use rust_decimal::prelude::ToPrimitive;

pub(crate) fn level_exp(level: u32) -> i32 {
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// Product of `effect^level` over owned upgrades aimed at capacity.
pub fn capacity_multiplier(cfg: &EconomyConfig, player: &Player) -> Result<f64, EconError> {
    let mut mult = 1.0;
    for (&upgrade, &level) in &player.upgrades {
        let spec = cfg.upgrade(upgrade)?;
        if spec.target == UpgradeTarget::Capacity {
            mult *= spec.effect.powi(level_exp(level));
        }
    }
    Ok(mult)
}

/// Hash rate of the player's assets after capacity upgrades.
///
/// Click upgrades never contribute here.
pub fn capacity(cfg: &EconomyConfig, player: &Player) -> Result<f64, EconError> {
    let mut total = 0.0;
    for (&asset, &count) in &player.assets {
        total += cfg.asset(asset)?.capacity * count as f64;
    }
    Ok(total * capacity_multiplier(cfg, player)?)
}

/// Fee income earned from the shared pending work pool.
pub fn fee_income(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
) -> Result<f64, EconError> {
    let pool = network.pending_work_pool as f64;
    let mut total = 0.0;
    for (&asset, &count) in &player.assets {
        let rate = cfg.asset(asset)?.fee_rate;
        if rate > 0.0 {
            total += rate * count as f64 * pool * cfg.fee_scale;
        }
    }
    Ok(total)
}

/// Staking yield on the fraction of the balance treated as staked.
pub fn staking_income(cfg: &EconomyConfig, player: &Player) -> Result<f64, EconError> {
    let coins = player
        .coins
        .to_f64()
        .ok_or_else(|| EconError::InvariantViolation("balance not representable".into()))?;
    let mut total = 0.0;
    for (&asset, &count) in &player.assets {
        let rate = cfg.asset(asset)?.staking_rate;
        if rate > 0.0 {
            total += rate * count as f64 * coins * cfg.stake_fraction;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use idle_core::{AssetType, UpgradeType};
    use rust_decimal::Decimal;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn empty_player_has_no_capacity() {
        let cfg = testutil::cfg().economy;
        assert_eq!(capacity(&cfg, &testutil::player()).unwrap(), 0.0);
    }

    #[test]
    fn capacity_sums_assets_and_applies_upgrades() {
        let cfg = testutil::cfg().economy;
        let mut p = testutil::player();
        p.assets.insert(AssetType::GpuMiner, 10);
        p.assets.insert(AssetType::AsicFarm, 2);
        p.assets.insert(AssetType::CryptoExchange, 5);
        assert!(approx(capacity(&cfg, &p).unwrap(), 30.0));

        p.upgrades.insert(UpgradeType::FasterInternet, 1);
        p.upgrades.insert(UpgradeType::QuantumMining, 1);
        assert!(approx(capacity(&cfg, &p).unwrap(), 30.0 * 1.05 * 2.0));
    }

    #[test]
    fn click_upgrades_do_not_touch_capacity() {
        let cfg = testutil::cfg().economy;
        let mut p = testutil::player();
        p.assets.insert(AssetType::MiningPool, 1);
        p.upgrades.insert(UpgradeType::ClickUpgrade, 4);
        assert!(approx(capacity(&cfg, &p).unwrap(), 100.0));
    }

    #[test]
    fn fees_scale_with_pool() {
        let cfg = testutil::cfg().economy;
        let mut n = testutil::network();
        let mut p = testutil::player();
        p.assets.insert(AssetType::CryptoExchange, 2);
        p.assets.insert(AssetType::NftMarketplace, 1);
        p.assets.insert(AssetType::GpuMiner, 50);
        assert_eq!(fee_income(&cfg, &p, &n).unwrap(), 0.0);
        n.pending_work_pool = 10_000;
        let expected = (0.001 * 2.0 + 0.025) * 10_000.0 * 0.0001;
        assert!(approx(fee_income(&cfg, &p, &n).unwrap(), expected));
    }

    #[test]
    fn staking_uses_a_tenth_of_balance() {
        let cfg = testutil::cfg().economy;
        let mut p = testutil::player();
        p.coins = Decimal::from(1_000_000);
        assert_eq!(staking_income(&cfg, &p).unwrap(), 0.0);
        p.assets.insert(AssetType::DefiPlatform, 3);
        assert!(approx(
            staking_income(&cfg, &p).unwrap(),
            0.0001 * 3.0 * 1_000_000.0 * 0.1
        ));
    }

    #[test]
    fn unknown_owned_asset_fails_loudly() {
        let mut cfg = testutil::cfg().economy;
        cfg.assets.remove(&AssetType::GpuMiner);
        let mut p = testutil::player();
        p.assets.insert(AssetType::GpuMiner, 1);
        assert!(matches!(capacity(&cfg, &p), Err(EconError::Validation(_))));
    }
}
