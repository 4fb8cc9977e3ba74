//! Lump-sum credit for time elapsed since the last income tick.

use crate::income::income;
use crate::{credit, to_coins, EconError};
use chrono::{DateTime, Duration, Utc};
use idle_core::{Boost, EconomyConfig, NetworkState, Player};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Result of one catch-up evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchupOutcome {
    /// Updated player record.
    pub player: Player,
    /// Coins credited by this call.
    pub earnings: Decimal,
    /// Length of the credited window in seconds (after any cap).
    pub elapsed_secs: f64,
    /// False when the window was too short and left to accumulate.
    pub credited: bool,
}

fn secs(d: Duration) -> f64 {
    d.num_milliseconds().max(0) as f64 / 1000.0
}

/// Seconds in `[start, end)` weighted by the boosts active over each part.
///
/// Boosts only count up to their expiry, so a boost that ran out halfway
/// through an absence boosts half of it. Without boosts this is `end - start`.
fn boosted_seconds(boosts: &[Boost], start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let mut cuts: Vec<DateTime<Utc>> = boosts
        .iter()
        .map(|b| b.expires_at)
        .filter(|&t| t > start && t < end)
        .collect();
    cuts.push(end);
    cuts.sort();
    cuts.dedup();

    let mut total = 0.0;
    let mut from = start;
    for to in cuts {
        let factor: f64 = boosts
            .iter()
            .filter(|b| b.expires_at >= to)
            .map(|b| b.multiplier)
            .product();
        total += secs(to - from) * factor;
        from = to;
    }
    total
}

/// Credit income for the time since `last_income_tick_at` as one lump sum.
///
/// Runs in O(boosts) regardless of how long the player was away. Windows
/// shorter than `min_catchup_secs` are not credited and the tick is left in
/// place so the time keeps accumulating. When `max_offline_secs` is set only
/// the most recent part of the absence is credited.
pub fn catchup(
    cfg: &EconomyConfig,
    player: &Player,
    network: &NetworkState,
    now: DateTime<Utc>,
) -> Result<CatchupOutcome, EconError> {
    let mut next = player.clone();
    next.last_active_at = now;

    let mut start = player.last_income_tick_at;
    let mut elapsed = secs(now - start);
    if now <= start || elapsed < cfg.min_catchup_secs {
        debug!(player = %player.id, elapsed, "catch-up window too short");
        return Ok(CatchupOutcome {
            player: next,
            earnings: Decimal::ZERO,
            elapsed_secs: elapsed,
            credited: false,
        });
    }
    if let Some(cap) = cfg.max_offline_secs {
        if elapsed > cap {
            start = now - Duration::milliseconds((cap * 1000.0) as i64);
            elapsed = secs(now - start);
        }
    }

    let rate = income(cfg, player, network)?;
    let earnings = to_coins(rate * boosted_seconds(&player.boosts, start, now))?;
    credit(&mut next, earnings)?;
    next.last_income_tick_at = now;

    info!(player = %player.id, elapsed, rate, %earnings, "offline earnings credited");
    Ok(CatchupOutcome {
        player: next,
        earnings,
        elapsed_secs: elapsed,
        credited: true,
    })
}
