//! Prestige: trade the current run for permanent bonus points.

use crate::EconError;
use chrono::{DateTime, Utc};
use idle_core::{EconomyConfig, Player};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::info;

/// Result of a successful prestige.
#[derive(Clone, Debug, PartialEq)]
pub struct PrestigeOutcome {
    /// Player after the reset.
    pub player: Player,
    /// Points added by this prestige (may be zero just above the threshold).
    pub gained_points: u64,
    /// Balance given up by the reset.
    pub forfeited_coins: Decimal,
}

/// Whether the balance has reached the prestige threshold.
pub fn can_prestige(cfg: &EconomyConfig, player: &Player) -> bool {
    player.coins >= cfg.prestige_threshold
}

/// `max(0, floor(log10(coins / threshold)))`, evaluated exactly on the balance.
///
/// Examples with a threshold of 1e6:
/// 5e6 → 0, 15e6 → 1, 1e8 → 2.
pub fn prestige_points_for(cfg: &EconomyConfig, coins: Decimal) -> u64 {
    if cfg.prestige_threshold <= Decimal::ZERO {
        return 0;
    }
    let ten = Decimal::TEN;
    let mut points = 0;
    let mut bar = cfg.prestige_threshold.checked_mul(ten);
    while let Some(b) = bar {
        if coins < b {
            break;
        }
        points += 1;
        bar = b.checked_mul(ten);
    }
    points
}

/// Reset the run in exchange for prestige points.
///
/// Coins, assets, upgrades and boosts are cleared. Identity, achievements,
/// lifetime counters and the tick timestamps are kept. The income multiplier is
/// recomputed from the new point total and never lowered.
pub fn prestige(
    cfg: &EconomyConfig,
    player: &Player,
    now: DateTime<Utc>,
) -> Result<PrestigeOutcome, EconError> {
    if !can_prestige(cfg, player) {
        return Err(EconError::InsufficientFunds {
            required: cfg.prestige_threshold,
            available: player.coins,
        });
    }
    let gained = prestige_points_for(cfg, player.coins);
    let points = player
        .prestige_points
        .checked_add(gained)
        .ok_or_else(|| EconError::InvariantViolation("prestige points overflow".into()))?;
    let derived = 1.0 + points as f64 * cfg.prestige_multiplier_rate;

    let mut next = player.clone();
    next.prestige_points = points;
    next.income_multiplier = player.income_multiplier.max(derived);
    next.coins = Decimal::ZERO;
    next.assets = BTreeMap::new();
    next.upgrades = BTreeMap::new();
    next.boosts.clear();
    next.prestige_count = player.prestige_count.saturating_add(1);
    next.last_active_at = now;

    info!(
        player = %player.id,
        forfeited = %player.coins,
        gained,
        points,
        multiplier = next.income_multiplier,
        "prestige"
    );
    Ok(PrestigeOutcome {
        player: next,
        gained_points: gained,
        forfeited_coins: player.coins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use idle_core::{AchievementId, AssetType, UpgradeType};
    use proptest::prelude::*;

    fn rich(coins: i64) -> Player {
        let mut p = testutil::player();
        p.coins = Decimal::from(coins);
        p.lifetime_earnings = Decimal::from(coins);
        p.assets.insert(AssetType::AsicFarm, 12);
        p.upgrades.insert(UpgradeType::ClickUpgrade, 3);
        p
    }

    #[test]
    fn points_follow_decades_above_threshold() {
        let cfg = testutil::cfg().economy;
        assert_eq!(prestige_points_for(&cfg, Decimal::from(999_999)), 0);
        assert_eq!(prestige_points_for(&cfg, Decimal::from(5_000_000)), 0);
        assert_eq!(prestige_points_for(&cfg, Decimal::from(9_999_999)), 0);
        assert_eq!(prestige_points_for(&cfg, Decimal::from(10_000_000)), 1);
        assert_eq!(prestige_points_for(&cfg, Decimal::from(15_000_000)), 1);
        assert_eq!(prestige_points_for(&cfg, Decimal::from(100_000_000)), 2);
        assert_eq!(prestige_points_for(&cfg, Decimal::MAX), 22);
    }

    #[test]
    fn below_threshold_is_rejected() {
        let cfg = testutil::cfg().economy;
        let p = rich(999_999);
        assert!(!can_prestige(&cfg, &p));
        assert_eq!(
            prestige(&cfg, &p, testutil::t0()),
            Err(EconError::InsufficientFunds {
                required: Decimal::from(1_000_000),
                available: Decimal::from(999_999),
            })
        );
    }

    #[test]
    fn eligible_with_zero_gain_still_resets() {
        let cfg = testutil::cfg().economy;
        let out = prestige(&cfg, &rich(5_000_000), testutil::t0()).unwrap();
        assert_eq!(out.gained_points, 0);
        assert_eq!(out.forfeited_coins, Decimal::from(5_000_000));
        assert_eq!(out.player.coins, Decimal::ZERO);
        assert!(out.player.assets.is_empty());
        assert_eq!(out.player.income_multiplier, 1.0);
        assert_eq!(out.player.prestige_count, 1);
    }

    #[test]
    fn reset_keeps_identity_and_history() {
        let cfg = testutil::cfg().economy;
        let mut p = rich(15_000_000);
        p.prestige_points = 4;
        p.total_clicks = 77;
        p.achievements
            .insert(AchievementId("coins:1000".into()), testutil::t0());
        let out = prestige(&cfg, &p, testutil::t0()).unwrap();
        assert_eq!(out.gained_points, 1);
        assert_eq!(out.player.prestige_points, 5);
        assert!((out.player.income_multiplier - 1.5).abs() < 1e-12);
        assert!(out.player.upgrades.is_empty());
        assert_eq!(out.player.id, p.id);
        assert_eq!(out.player.total_clicks, 77);
        assert_eq!(out.player.lifetime_earnings, p.lifetime_earnings);
        assert_eq!(out.player.achievements, p.achievements);
    }

    #[test]
    fn multiplier_is_never_lowered() {
        let cfg = testutil::cfg().economy;
        let mut p = rich(15_000_000);
        p.income_multiplier = 3.0;
        let out = prestige(&cfg, &p, testutil::t0()).unwrap();
        assert_eq!(out.player.income_multiplier, 3.0);
    }

    proptest! {
        #[test]
        fn prestige_postconditions(
            coins in 1_000_000i64..1_000_000_000_000,
            points in 0u64..1_000,
        ) {
            let cfg = testutil::cfg().economy;
            let mut p = rich(coins);
            p.prestige_points = points;
            p.income_multiplier = 1.0 + points as f64 * cfg.prestige_multiplier_rate;
            let out = prestige(&cfg, &p, testutil::t0()).unwrap();
            prop_assert!(out.player.prestige_points >= p.prestige_points);
            if p.coins >= cfg.prestige_threshold * Decimal::TEN {
                prop_assert!(out.player.prestige_points > p.prestige_points);
            }
            prop_assert!(out.player.income_multiplier >= p.income_multiplier);
            prop_assert_eq!(out.player.coins, Decimal::ZERO);
            prop_assert!(out.player.assets.is_empty());
        }
    }
}
