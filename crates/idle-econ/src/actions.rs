//! Player-initiated actions: purchases, clicks and boosts.
//!
//! Every action validates before mutating; a rejected action leaves the input
//! record untouched and returns an error instead of a partially applied copy.

use crate::cost::{asset_cost, can_afford, upgrade_cost};
use crate::income::{boost_factor, click_power};
use crate::{credit, to_coins, EconError};
use chrono::{DateTime, Duration, Utc};
use idle_core::{AssetType, Boost, EconomyConfig, NetworkState, Player, UpgradeType, ValidationError};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

/// What a purchase bought.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PurchaseKind {
    Asset(AssetType),
    Upgrade(UpgradeType),
}

/// Result of a successful purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct Purchase {
    pub player: Player,
    pub kind: PurchaseKind,
    /// Coins deducted.
    pub cost: Decimal,
    /// Count or level held after the purchase.
    pub owned: u32,
}

/// Result of a click.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickOutcome {
    pub player: Player,
    /// Coins credited for this click.
    pub reward: Decimal,
}

fn debit(player: &mut Player, cost: Decimal) -> Result<(), EconError> {
    if !can_afford(player, cost) {
        return Err(EconError::InsufficientFunds {
            required: cost,
            available: player.coins,
        });
    }
    player.coins -= cost;
    Ok(())
}

fn bump(owned: u32, what: &str) -> Result<u32, EconError> {
    owned
        .checked_add(1)
        .ok_or_else(|| EconError::InvariantViolation(format!("{what} count overflow")))
}

/// Buy one unit of `asset` at its current price.
pub fn purchase_asset(
    cfg: &EconomyConfig,
    player: &Player,
    asset: AssetType,
) -> Result<Purchase, EconError> {
    let owned = player.asset_count(asset);
    let cost = asset_cost(cfg, asset, owned)?;
    let count = bump(owned, asset.as_str())?;
    let mut next = player.clone();
    debit(&mut next, cost)?;
    next.assets.insert(asset, count);
    info!(player = %player.id, %asset, %cost, count, "asset purchased");
    Ok(Purchase {
        player: next,
        kind: PurchaseKind::Asset(asset),
        cost,
        owned: count,
    })
}

/// Buy the next level of `upgrade`.
///
/// One-time upgrades can only be bought once; a second attempt is rejected
/// with [`ValidationError::AlreadyOwned`] before the balance is checked.
pub fn purchase_upgrade(
    cfg: &EconomyConfig,
    player: &Player,
    upgrade: UpgradeType,
) -> Result<Purchase, EconError> {
    let spec = cfg.upgrade(upgrade)?;
    let level = player.upgrade_level(upgrade);
    if !spec.repeatable && level > 0 {
        return Err(ValidationError::AlreadyOwned(upgrade).into());
    }
    let cost = upgrade_cost(cfg, upgrade, level)?;
    let new_level = bump(level, upgrade.as_str())?;
    let mut next = player.clone();
    debit(&mut next, cost)?;
    next.upgrades.insert(upgrade, new_level);
    info!(player = %player.id, %upgrade, %cost, level = new_level, "upgrade purchased");
    Ok(Purchase {
        player: next,
        kind: PurchaseKind::Upgrade(upgrade),
        cost,
        owned: new_level,
    })
}

/// Credit one click's reward, including active boosts.
pub fn click(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
    now: DateTime<Utc>,
) -> Result<ClickOutcome, EconError> {
    let power = click_power(cfg, player, network)? * boost_factor(player, now);
    let reward = to_coins(power)?;
    let mut next = player.clone();
    credit(&mut next, reward)?;
    next.total_clicks = next.total_clicks.saturating_add(1);
    next.last_active_at = now;
    debug!(player = %player.id, %reward, clicks = next.total_clicks, "click");
    Ok(ClickOutcome {
        player: next,
        reward,
    })
}

/// Attach a boost of `multiplier` lasting `duration` from `now`.
pub fn grant_boost(
    player: &Player,
    multiplier: f64,
    duration: Duration,
    now: DateTime<Utc>,
) -> Result<Player, EconError> {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(ValidationError::NonFinite.into());
    }
    if duration <= Duration::zero() {
        return Err(EconError::InvariantViolation(format!(
            "boost duration {duration} is not positive"
        )));
    }
    let mut next = player.clone();
    next.boosts.push(Boost {
        multiplier,
        expires_at: now + duration,
    });
    info!(player = %player.id, multiplier, secs = duration.num_seconds(), "boost granted");
    Ok(next)
}

/// Drop every boost that has expired by `now`.
pub fn prune_expired_boosts(player: &Player, now: DateTime<Utc>) -> Player {
    let mut next = player.clone();
    next.boosts.retain(|b| b.is_active(now));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn funded(coins: i64) -> Player {
        let mut p = testutil::player();
        p.coins = Decimal::from(coins);
        p
    }

    #[test]
    fn buying_assets_walks_the_cost_curve() {
        let cfg = testutil::cfg().economy;
        let first = purchase_asset(&cfg, &funded(32), AssetType::GpuMiner).unwrap();
        assert_eq!(first.cost, Decimal::from(15));
        assert_eq!(first.owned, 1);
        assert_eq!(first.player.coins, Decimal::from(17));
        let second = purchase_asset(&cfg, &first.player, AssetType::GpuMiner).unwrap();
        assert_eq!(second.cost, Decimal::from(17));
        assert_eq!(second.player.coins, Decimal::ZERO);
        assert_eq!(second.player.asset_count(AssetType::GpuMiner), 2);
        assert_eq!(second.kind, PurchaseKind::Asset(AssetType::GpuMiner));
    }

    #[test]
    fn insufficient_funds_rejects_without_change() {
        let cfg = testutil::cfg().economy;
        let p = funded(14);
        assert_eq!(
            purchase_asset(&cfg, &p, AssetType::GpuMiner),
            Err(EconError::InsufficientFunds {
                required: Decimal::from(15),
                available: Decimal::from(14),
            })
        );
        assert_eq!(p.asset_count(AssetType::GpuMiner), 0);
        assert_eq!(p.coins, Decimal::from(14));
    }

    #[test]
    fn one_time_upgrade_cannot_be_rebought() {
        let cfg = testutil::cfg().economy;
        let bought = purchase_upgrade(&cfg, &funded(5_000), UpgradeType::FasterInternet).unwrap();
        assert_eq!(bought.cost, Decimal::from(1_000));
        assert_eq!(bought.player.upgrade_level(UpgradeType::FasterInternet), 1);
        assert_eq!(
            purchase_upgrade(&cfg, &bought.player, UpgradeType::FasterInternet),
            Err(EconError::Validation(ValidationError::AlreadyOwned(
                UpgradeType::FasterInternet
            )))
        );
    }

    #[test]
    fn repeatable_upgrade_levels_up() {
        let cfg = testutil::cfg().economy;
        let a = purchase_upgrade(&cfg, &funded(1_500), UpgradeType::ClickUpgrade).unwrap();
        let b = purchase_upgrade(&cfg, &a.player, UpgradeType::ClickUpgrade).unwrap();
        assert_eq!(a.cost + b.cost, Decimal::from(1_500));
        assert_eq!(b.owned, 2);
        assert!(purchase_upgrade(&cfg, &b.player, UpgradeType::ClickUpgrade).is_err());
    }

    #[test]
    fn click_credits_reward_and_counts() {
        let cfg = testutil::cfg().economy;
        let mut n = testutil::network();
        n.global_capacity = 10_000.0;
        n.difficulty = 4.0;
        let now = testutil::t0();
        let out = click(&cfg, &testutil::player(), &n, now).unwrap();
        assert_eq!(out.reward, Decimal::new(5, 2));
        assert_eq!(out.player.coins, out.reward);
        assert_eq!(out.player.lifetime_earnings, out.reward);
        assert_eq!(out.player.total_clicks, 1);

        let boosted = grant_boost(&out.player, 3.0, Duration::minutes(5), now).unwrap();
        let out = click(&cfg, &boosted, &n, now).unwrap();
        assert_eq!(out.reward, Decimal::new(15, 2));
        assert_eq!(out.player.total_clicks, 2);
    }

    #[test]
    fn boosts_validate_and_prune() {
        let now = testutil::t0();
        let p = testutil::player();
        assert!(grant_boost(&p, 0.0, Duration::minutes(1), now).is_err());
        assert!(grant_boost(&p, f64::NAN, Duration::minutes(1), now).is_err());
        assert!(grant_boost(&p, 2.0, Duration::zero(), now).is_err());

        let p = grant_boost(&p, 2.0, Duration::minutes(1), now).unwrap();
        let p = grant_boost(&p, 2.0, Duration::minutes(10), now).unwrap();
        let pruned = prune_expired_boosts(&p, now + Duration::minutes(1));
        assert_eq!(pruned.boosts.len(), 1);
        assert_eq!(prune_expired_boosts(&pruned, now + Duration::hours(1)).boosts.len(), 0);
    }
}
