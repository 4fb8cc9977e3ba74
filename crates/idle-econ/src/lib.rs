#![deny(warnings)]

//! Economic models for Hash Tycoon.
//!
//! This crate provides the pure, deterministic pieces of the progression loop:
//! - cost curves for assets and upgrades
//! - production capacity and per-second income (mining, fees, staking)
//! - click rewards, purchases and time-limited boosts
//! - lump-sum offline catch-up
//! - prestige resets and milestone achievements
//!
//! Nothing here performs I/O or reads the clock; callers pass snapshots and the
//! current instant in and persist the returned records.

pub mod achievements;
pub mod actions;
pub mod cost;
pub mod income;
pub mod offline;
pub mod prestige;
pub mod production;
pub mod view;

pub use achievements::check_and_grant;
pub use actions::{
    click, grant_boost, prune_expired_boosts, purchase_asset, purchase_upgrade, ClickOutcome,
    Purchase, PurchaseKind,
};
pub use cost::{asset_cost, can_afford, upgrade_cost};
pub use income::{
    block_reward, boost_factor, boosted_income, click_power, income, income_report, IncomeReport,
};
pub use offline::{catchup, CatchupOutcome};
pub use prestige::{can_prestige, prestige, prestige_points_for, PrestigeOutcome};
pub use production::{capacity, fee_income, staking_income};
pub use view::{player_view, rank_for, AssetOffer, PlayerView, PrestigePreview, UpgradeOffer};

use idle_core::ValidationError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by economic operations.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Unknown catalog entry, already-owned upgrade or malformed value.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Purchase or prestige attempted without enough balance.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },
    /// A result would break a balance invariant (negative, overflow, non-finite).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Credit `amount` to both the spendable balance and lifetime earnings.
pub(crate) fn credit(player: &mut idle_core::Player, amount: Decimal) -> Result<(), EconError> {
    if amount < Decimal::ZERO {
        return Err(EconError::InvariantViolation(format!(
            "negative credit {amount}"
        )));
    }
    let coins = player
        .coins
        .checked_add(amount)
        .ok_or_else(|| EconError::InvariantViolation("coin balance overflow".into()))?;
    let lifetime = player
        .lifetime_earnings
        .checked_add(amount)
        .ok_or_else(|| EconError::InvariantViolation("lifetime earnings overflow".into()))?;
    player.coins = coins;
    player.lifetime_earnings = lifetime;
    Ok(())
}

/// Convert a rate-derived amount into coins, mapping failures to invariant violations.
pub(crate) fn to_coins(amount: f64) -> Result<Decimal, EconError> {
    idle_core::coins_from_f64(amount)
        .map_err(|e| EconError::InvariantViolation(format!("amount {amount}: {e}")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_updates_balance_and_lifetime() {
        let mut p = testutil::player();
        credit(&mut p, Decimal::new(250, 2)).unwrap();
        credit(&mut p, Decimal::ONE).unwrap();
        assert_eq!(p.coins, Decimal::new(350, 2));
        assert_eq!(p.lifetime_earnings, Decimal::new(350, 2));
    }

    #[test]
    fn credit_rejects_negative_and_overflow() {
        let mut p = testutil::player();
        assert!(matches!(
            credit(&mut p, Decimal::NEGATIVE_ONE),
            Err(EconError::InvariantViolation(_))
        ));
        p.coins = Decimal::MAX;
        assert!(matches!(
            credit(&mut p, Decimal::ONE),
            Err(EconError::InvariantViolation(_))
        ));
        assert_eq!(p.coins, Decimal::MAX);
        assert_eq!(p.lifetime_earnings, Decimal::ZERO);
    }

    #[test]
    fn to_coins_rejects_non_finite() {
        assert!(to_coins(f64::INFINITY).is_err());
        assert_eq!(to_coins(2.0).unwrap(), Decimal::TWO);
    }
}
