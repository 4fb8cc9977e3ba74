//! Milestone achievements.
//!
//! Ids are stable strings derived from the milestone itself, e.g.
//! `asset:gpu_miner:10`, `coins:1000000`, `upgrades:5` or `prestige:1`, so a
//! player record stays meaningful if the threshold tables are later extended.

use chrono::{DateTime, Utc};
use idle_core::{AchievementId, AssetType, EconomyConfig, Player};
use tracing::info;

/// Every milestone id currently satisfied by `player`, in table order.
pub fn satisfied(cfg: &EconomyConfig, player: &Player) -> Vec<AchievementId> {
    let table = &cfg.achievements;
    let mut ids = Vec::new();
    for asset in AssetType::ALL {
        let owned = player.asset_count(asset);
        for &n in table.asset_counts.iter().filter(|&&n| owned >= n) {
            ids.push(AchievementId(format!("asset:{asset}:{n}")));
        }
    }
    for m in table.coin_milestones.iter().filter(|&&m| player.coins >= m) {
        ids.push(AchievementId(format!("coins:{}", m.normalize())));
    }
    let levels = player.total_upgrade_levels();
    for &n in table.upgrade_counts.iter().filter(|&&n| levels >= n) {
        ids.push(AchievementId(format!("upgrades:{n}")));
    }
    for &n in table.prestige_points.iter().filter(|&&n| player.prestige_points >= n) {
        ids.push(AchievementId(format!("prestige:{n}")));
    }
    ids
}

/// Unlock every satisfied milestone not yet held, stamping it with `now`.
///
/// Returns the updated player and the newly unlocked ids. Existing unlocks are
/// never removed or re-stamped, so calling this repeatedly is a no-op.
pub fn check_and_grant(
    cfg: &EconomyConfig,
    player: &Player,
    now: DateTime<Utc>,
) -> (Player, Vec<AchievementId>) {
    let mut next = player.clone();
    let mut unlocked = Vec::new();
    for id in satisfied(cfg, player) {
        if !next.has_achievement(&id) {
            next.achievements.insert(id.clone(), now);
            unlocked.push(id);
        }
    }
    if !unlocked.is_empty() {
        info!(player = %player.id, count = unlocked.len(), "achievements unlocked");
    }
    (next, unlocked)
}
