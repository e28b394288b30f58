//! Persistent card → seasonal setpoint table.
//!
//! The table is stored as a JSON object keyed by the decimal card identifier:
//!
//! ```json
//! {"42": {"winter": 21.0, "summer": 25.0}}
//! ```
//!
//! Loading never fails: a missing or unreadable file yields an empty table.

use crate::control::Season;
use crate::error::{ClimateError, Result};
use log::{error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Numeric identifier read from a proximity card.
pub type CardId = u64;

/// Decode a card UID the way the reader reports it (little-endian).
///
/// UIDs longer than eight bytes keep only their first eight bytes.
pub fn card_id_from_uid(uid: &[u8]) -> CardId {
    uid.iter()
        .take(8)
        .enumerate()
        .fold(0, |acc, (i, byte)| acc | (CardId::from(*byte) << (8 * i)))
}

/// The persisted value for one card.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalSetpoints {
    pub winter: f32,
    pub summer: f32,
}

impl SeasonalSetpoints {
    pub fn new(winter: f32, summer: f32) -> Result<Self> {
        for (season, value) in [(Season::Winter, winter), (Season::Summer, summer)] {
            if !value.is_finite() {
                return Err(ClimateError::InvalidSetpoint(format!(
                    "{} setpoint must be a number, got {}",
                    season, value
                )));
            }
        }
        Ok(Self { winter, summer })
    }
}

/// A known user's temperature preferences.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserPreference {
    pub card_id: CardId,
    pub winter_setpoint: f32,
    pub summer_setpoint: f32,
}

impl UserPreference {
    pub fn setpoint_for(&self, season: Season) -> f32 {
        match season {
            Season::Winter => self.winter_setpoint,
            Season::Summer => self.summer_setpoint,
        }
    }

    fn from_entry(card_id: CardId, setpoints: &SeasonalSetpoints) -> Self {
        Self {
            card_id,
            winter_setpoint: setpoints.winter,
            summer_setpoint: setpoints.summer,
        }
    }
}

/// Mapping from card identifier to seasonal setpoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceTable {
    entries: BTreeMap<CardId, SeasonalSetpoints>,
}

impl PreferenceTable {
    /// Load from file
    pub fn load(path: &Path) -> Self {
        match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<PreferenceTable>(&bytes) {
                Ok(table) => {
                    info!("Loaded {} users from {:?}", table.len(), path);
                    table
                }
                Err(e) => {
                    warn!(
                        "Failed to decode users file {:?}, starting with an empty table: {}",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No users file found, starting with an empty table");
                Self::default()
            }
            Err(e) => {
                error!("Failed to read users file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save to file.
    ///
    /// The data is written to a sibling temporary file first and renamed over
    /// the target, so a reader never sees a half-written table.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        info!("Saved {} users to {:?}", self.len(), path);
        Ok(())
    }

    pub fn get(&self, card_id: CardId) -> Option<UserPreference> {
        self.entries
            .get(&card_id)
            .map(|s| UserPreference::from_entry(card_id, s))
    }

    pub fn contains(&self, card_id: CardId) -> bool {
        self.entries.contains_key(&card_id)
    }

    /// Add or replace the entry for a card.
    pub fn upsert(&mut self, card_id: CardId, setpoints: SeasonalSetpoints) -> UserPreference {
        self.entries.insert(card_id, setpoints);
        UserPreference::from_entry(card_id, &setpoints)
    }

    pub fn remove(&mut self, card_id: CardId) -> bool {
        self.entries.remove(&card_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = UserPreference> + '_ {
        self.entries
            .iter()
            .map(|(card_id, s)| UserPreference::from_entry(*card_id, s))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Store wrapper with auto-save.
///
/// Mutations always apply to the in-memory table. A failed save is returned
/// to the caller but the change stays in effect for the rest of the run.
pub struct PreferenceStore {
    path: PathBuf,
    table: RwLock<PreferenceTable>,
}

impl PreferenceStore {
    pub fn open(path: PathBuf) -> Self {
        let table = PreferenceTable::load(&path);
        Self {
            path,
            table: RwLock::new(table),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current table.
    pub fn table(&self) -> PreferenceTable {
        self.table.read().clone()
    }

    pub fn get(&self, card_id: CardId) -> Option<UserPreference> {
        self.table.read().get(card_id)
    }

    pub fn save(&self) -> Result<()> {
        self.table.read().save(&self.path)
    }

    pub fn upsert(&self, card_id: CardId, winter: f32, summer: f32) -> Result<UserPreference> {
        let setpoints = SeasonalSetpoints::new(winter, summer)?;
        let mut table = self.table.write();
        let preference = table.upsert(card_id, setpoints);
        table.save(&self.path)?;
        info!(
            "Added user {} with temperatures: Winter {}, Summer {}",
            card_id, winter, summer
        );
        Ok(preference)
    }

    /// Remove one user. Returns `false` when the card was not enrolled.
    pub fn delete(&self, card_id: CardId) -> Result<bool> {
        let mut table = self.table.write();
        if !table.remove(card_id) {
            info!("User {} not found", card_id);
            return Ok(false);
        }
        table.save(&self.path)?;
        info!("Deleted user {}", card_id);
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let mut table = self.table.write();
        table.clear();
        table.save(&self.path)?;
        info!("All users have been deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setpoints(winter: f32, summer: f32) -> SeasonalSetpoints {
        SeasonalSetpoints::new(winter, summer).unwrap()
    }

    #[test]
    fn test_serialized_keys_are_strings() {
        let mut table = PreferenceTable::default();
        table.upsert(42, setpoints(21.0, 25.0));
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["42"]["winter"], 21.0);
        assert_eq!(json["42"]["summer"], 25.0);
    }

    #[test]
    fn test_load_integer_setpoints_from_legacy_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users_card_id.json");
        fs::write(&path, r#"{"1494033744": {"winter": 20, "summer": 24}}"#).unwrap();

        let table = PreferenceTable::load(&path);
        let user = table.get(1494033744).unwrap();
        assert_eq!(user.winter_setpoint, 20.0);
        assert_eq!(user.summer_setpoint, 24.0);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = PreferenceTable::load(&dir.path().join("absent.json"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{not json").unwrap();
        assert!(PreferenceTable::load(&path).is_empty());

        fs::write(&path, r#"{"abc": {"winter": 20, "summer": 24}}"#).unwrap();
        assert!(PreferenceTable::load(&path).is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users.json");
        let mut table = PreferenceTable::default();
        table.upsert(7, setpoints(19.5, 26.0));
        table.save(&path).unwrap();

        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        assert_eq!(PreferenceTable::load(&path), table);
    }

    #[test]
    fn test_store_mutations_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let store = PreferenceStore::open(path.clone());
        store.upsert(1, 20.0, 24.0).unwrap();
        store.upsert(2, 22.0, 26.0).unwrap();
        assert!(store.delete(1).unwrap());
        assert!(!store.delete(99).unwrap());

        let reopened = PreferenceStore::open(path.clone());
        assert_eq!(reopened.get(1), None);
        assert_eq!(reopened.get(2).unwrap().summer_setpoint, 26.0);

        reopened.clear().unwrap();
        assert!(PreferenceTable::load(&path).is_empty());
    }

    #[test]
    fn test_reenrollment_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path().join("users.json"));
        store.upsert(5, 20.0, 24.0).unwrap();
        store.upsert(5, 18.0, 27.0).unwrap();
        assert_eq!(store.table().len(), 1);
        assert_eq!(store.get(5).unwrap().winter_setpoint, 18.0);
    }

    #[test]
    fn test_rejects_non_finite_setpoints() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::open(dir.path().join("users.json"));
        assert!(matches!(
            store.upsert(5, f32::NAN, 24.0),
            Err(ClimateError::InvalidSetpoint(_))
        ));
        assert!(store.table().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("users.json");
        fs::create_dir_all(path.join("blocker")).unwrap();

        let store = PreferenceStore::open(path);
        assert!(store.upsert(3, 21.0, 25.0).is_err());
        assert_eq!(store.get(3).unwrap().winter_setpoint, 21.0);
    }

    #[test]
    fn test_card_id_from_uid_is_little_endian() {
        assert_eq!(card_id_from_uid(&[0x50, 0x3A, 0x0C, 0x59]), 0x590C_3A50);
        assert_eq!(card_id_from_uid(&[]), 0);
        assert_eq!(card_id_from_uid(&[1, 0, 0, 0, 0, 0, 0]), 1);
    }

    #[test]
    fn test_setpoint_for_season() {
        let user = UserPreference {
            card_id: 42,
            winter_setpoint: 21.0,
            summer_setpoint: 25.0,
        };
        assert_eq!(user.setpoint_for(Season::Winter), 21.0);
        assert_eq!(user.setpoint_for(Season::Summer), 25.0);
    }
}
