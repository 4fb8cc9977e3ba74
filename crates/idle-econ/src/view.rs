//! Read model handed to clients after every command.

use crate::cost::{asset_cost, can_afford, upgrade_cost};
use crate::income::{boost_factor, boosted_income, click_power};
use crate::prestige::{can_prestige, prestige_points_for};
use crate::EconError;
use chrono::{DateTime, Utc};
use idle_core::{AssetType, EconomyConfig, NetworkState, Player, PlayerId, UpgradeType};
use rust_decimal::Decimal;
use serde::Serialize;

/// Next purchase available for one asset type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssetOffer {
    pub asset: AssetType,
    pub name: String,
    pub owned: u32,
    /// `None` once the price no longer fits the balance range.
    pub next_cost: Option<Decimal>,
    pub affordable: bool,
}

/// Next purchase available for one upgrade type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpgradeOffer {
    pub upgrade: UpgradeType,
    pub name: String,
    pub level: u32,
    /// `None` when a one-time upgrade is already owned.
    pub next_cost: Option<Decimal>,
    pub affordable: bool,
}

/// What a prestige right now would yield.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrestigePreview {
    pub eligible: bool,
    pub threshold: Decimal,
    pub points_on_reset: u64,
    pub multiplier_after: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub coins: Decimal,
    pub lifetime_earnings: Decimal,
    /// Coins per second including active boosts.
    pub income_per_second: f64,
    /// Reward of the next click including active boosts.
    pub click_power: f64,
    pub boost_factor: f64,
    pub rank: String,
    pub prestige_points: u64,
    pub income_multiplier: f64,
    pub total_clicks: u64,
    pub achievements: usize,
    pub assets: Vec<AssetOffer>,
    pub upgrades: Vec<UpgradeOffer>,
    pub prestige: PrestigePreview,
}

/// Title of the highest rank whose threshold `lifetime_earnings` meets.
///
/// Falls back to the first rung when none is met, and to an empty title only
/// for an empty ladder.
pub fn rank_for(cfg: &EconomyConfig, lifetime_earnings: Decimal) -> &str {
    cfg.ranks
        .iter()
        .take_while(|r| r.threshold <= lifetime_earnings)
        .last()
        .or_else(|| cfg.ranks.first())
        .map(|r| r.name.as_str())
        .unwrap_or("")
}

fn offer_cost(player: &Player, cost: Option<Decimal>) -> (Option<Decimal>, bool) {
    let affordable = cost.map_or(false, |c| can_afford(player, c));
    (cost, affordable)
}

/// Assemble the client-facing view of `player` at `now`.
pub fn player_view(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
    now: DateTime<Utc>,
) -> Result<PlayerView, EconError> {
    let boost = boost_factor(player, now);

    let assets = cfg
        .assets
        .iter()
        .map(|(&asset, spec)| {
            let owned = player.asset_count(asset);
            let (next_cost, affordable) =
                offer_cost(player, asset_cost(cfg, asset, owned).ok());
            AssetOffer {
                asset,
                name: spec.name.clone(),
                owned,
                next_cost,
                affordable,
            }
        })
        .collect();

    let upgrades = cfg
        .upgrades
        .iter()
        .map(|(&upgrade, spec)| {
            let level = player.upgrade_level(upgrade);
            let cost = if !spec.repeatable && level > 0 {
                None
            } else {
                upgrade_cost(cfg, upgrade, level).ok()
            };
            let (next_cost, affordable) = offer_cost(player, cost);
            UpgradeOffer {
                upgrade,
                name: spec.name.clone(),
                level,
                next_cost,
                affordable,
            }
        })
        .collect();

    let points_on_reset = if can_prestige(cfg, player) {
        prestige_points_for(cfg, player.coins)
    } else {
        0
    };
    let total_points = player.prestige_points.saturating_add(points_on_reset);
    let prestige = PrestigePreview {
        eligible: can_prestige(cfg, player),
        threshold: cfg.prestige_threshold,
        points_on_reset,
        multiplier_after: player
            .income_multiplier
            .max(1.0 + total_points as f64 * cfg.prestige_multiplier_rate),
    };

    Ok(PlayerView {
        id: player.id.clone(),
        coins: player.coins,
        lifetime_earnings: player.lifetime_earnings,
        income_per_second: boosted_income(cfg, player, network, now)?,
        click_power: click_power(cfg, player, network)? * boost,
        boost_factor: boost,
        rank: rank_for(cfg, player.lifetime_earnings).to_string(),
        prestige_points: player.prestige_points,
        income_multiplier: player.income_multiplier,
        total_clicks: player.total_clicks,
        achievements: player.achievements.len(),
        assets,
        upgrades,
        prestige,
    })
}
