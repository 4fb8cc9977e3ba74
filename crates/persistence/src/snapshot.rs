//! Whole-store snapshots: compact `bincode` for saves, JSON for inspection.

use crate::RepoError;
use chrono::{DateTime, Utc};
use idle_core::{NetworkState, Player};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Current snapshot layout version.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Point-in-time copy of every player and the network record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: u32,
    pub taken_at: DateTime<Utc>,
    pub network: Option<NetworkState>,
    pub players: Vec<Player>,
}

impl Snapshot {
    pub(crate) fn check_format(&self) -> Result<(), RepoError> {
        if self.format == SNAPSHOT_FORMAT {
            Ok(())
        } else {
            Err(RepoError::Codec(format!(
                "unsupported snapshot format {}",
                self.format
            )))
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, RepoError> {
        bincode::serialize(self).map_err(|e| RepoError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RepoError> {
        let snap: Snapshot =
            bincode::deserialize(bytes).map_err(|e| RepoError::Codec(e.to_string()))?;
        snap.check_format()?;
        Ok(snap)
    }

    /// Pretty JSON export.
    pub fn to_json(&self) -> Result<String, RepoError> {
        serde_json::to_string_pretty(self).map_err(|e| RepoError::Codec(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, RepoError> {
        let snap: Snapshot =
            serde_json::from_str(text).map_err(|e| RepoError::Codec(e.to_string()))?;
        snap.check_format()?;
        Ok(snap)
    }

    /// Write the `bincode` form to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), RepoError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::Codec(e.to_string()))?;
        }
        let bytes = self.encode()?;
        std::fs::write(path, &bytes).map_err(|e| RepoError::Codec(e.to_string()))?;
        info!(path = %path.display(), bytes = bytes.len(), players = self.players.len(), "snapshot written");
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, RepoError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| RepoError::Codec(e.to_string()))?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use idle_core::{AchievementId, AssetType, Boost, NetworkConfig, PlayerId, UpgradeType};
    use rust_decimal::Decimal;

    fn sample() -> Snapshot {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut p = Player::new(PlayerId("a".into()), t0);
        p.coins = Decimal::new(123_456_789, 8);
        p.assets.insert(AssetType::NftMarketplace, 2);
        p.upgrades.insert(UpgradeType::QuantumMining, 1);
        p.boosts.push(Boost {
            multiplier: 2.0,
            expires_at: t0,
        });
        p.achievements.insert(AchievementId("coins:1000".into()), t0);
        Snapshot {
            format: SNAPSHOT_FORMAT,
            taken_at: t0,
            network: Some(NetworkState::genesis(&NetworkConfig::default(), t0)),
            players: vec![p],
        }
    }

    #[test]
    fn binary_and_json_forms_agree() {
        let snap = sample();
        let bin = Snapshot::decode(&snap.encode().unwrap()).unwrap();
        let json = Snapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(bin, snap);
        assert_eq!(json, snap);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut snap = sample();
        snap.format = 99;
        let bytes = snap.encode().unwrap();
        assert!(matches!(Snapshot::decode(&bytes), Err(RepoError::Codec(_))));
        assert!(matches!(Snapshot::decode(&[1, 2, 3]), Err(RepoError::Codec(_))));
    }

    #[test]
    fn file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("hash-tycoon-snap-{}", std::process::id()));
        let path = dir.join("save.bin");
        let snap = sample();
        snap.save_to(&path).unwrap();
        assert_eq!(Snapshot::load_from(&path).unwrap(), snap);
        let _ = std::fs::remove_dir_all(dir);
    }
}
