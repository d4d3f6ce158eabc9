//! Save files: JSON snapshots with schema migrations, wrapped in a
//! checksummed container.
//!
//! File format:
//! - Version magic (8 bytes, LE)
//! - Payload length (4 bytes, LE)
//! - JSON payload (camelCase `PlayerState`)
//! - SHA256 over the three fields above (32 bytes)

use crate::core::config::GameConfig;
use crate::core::constants::{SAVE_SCHEMA_VERSION, SAVE_VERSION_MAGIC};
use crate::state::player::PlayerState;
use directories::ProjectDirs;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("save JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid save version: expected 0x{expected:016X}, got 0x{found:016X}")]
    BadMagic { expected: u64, found: u64 },

    #[error("save file truncated")]
    Truncated,

    #[error("checksum verification failed")]
    ChecksumMismatch,

    #[error("save schema {0} is newer than this build supports")]
    UnsupportedVersion(u64),

    #[error("save payload is not a JSON object")]
    NotAnObject,
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

const HEADER_LEN: usize = 8 + 4;
const CHECKSUM_LEN: usize = 32;

type Migration = fn(&mut Map<String, Value>);

/// Migrations keyed by the schema version they produce.
const MIGRATIONS: &[(u32, Migration)] = &[(2, migrate_v2), (3, migrate_v3)];

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = map.remove(from) {
        map.entry(to.to_string()).or_insert(value);
    }
}

/// v2: `playerStats.vitality` became `hp` and `playerStats.agility` became `agi`.
fn migrate_v2(root: &mut Map<String, Value>) {
    if let Some(Value::Object(stats)) = root.get_mut("playerStats") {
        rename_key(stats, "vitality", "hp");
        rename_key(stats, "agility", "agi");
    }
}

/// v3: top-level `currency` became `gold`.
fn migrate_v3(root: &mut Map<String, Value>) {
    rename_key(root, "currency", "gold");
}

/// Recursively fills keys missing from `loaded` with `defaults`. Keys present
/// in `loaded` win, except a `null` over a non-null default, which counts as
/// missing.
fn merge_defaults(defaults: Value, loaded: Value) -> Value {
    match (defaults, loaded) {
        (Value::Object(mut base), Value::Object(over)) => {
            for (key, value) in over {
                let merged = match base.remove(&key) {
                    Some(default) if value.is_null() => default,
                    Some(default) => merge_defaults(default, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, loaded) => loaded,
    }
}

/// Serializes a state snapshot.
pub fn to_json(state: &PlayerState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Rebuilds a state from a parsed snapshot of any supported schema version.
///
/// Migrations run in increasing order starting after the stored version, then
/// missing fields are filled from a fresh default state. A snapshot without
/// `schemaVersion` is treated as version 1.
pub fn hydrate(value: Value, config: &GameConfig) -> Result<PlayerState> {
    let Value::Object(mut root) = value else {
        return Err(PersistenceError::NotAnObject);
    };
    let raw = root.get("schemaVersion").and_then(Value::as_u64).unwrap_or(1);
    let stored = match u32::try_from(raw) {
        Ok(v) if v <= SAVE_SCHEMA_VERSION => v,
        _ => return Err(PersistenceError::UnsupportedVersion(raw)),
    };

    for (target, migrate) in MIGRATIONS {
        if *target > stored {
            migrate(&mut root);
        }
    }
    root.insert("schemaVersion".to_string(), Value::from(SAVE_SCHEMA_VERSION));

    let defaults = serde_json::to_value(PlayerState::new(config))?;
    let state = serde_json::from_value(merge_defaults(defaults, Value::Object(root)))?;
    Ok(state)
}

pub fn hydrate_str(json: &str, config: &GameConfig) -> Result<PlayerState> {
    hydrate(serde_json::from_str(json)?, config)
}

/// Wraps a state in the checksummed container.
pub fn encode(state: &PlayerState) -> Result<Vec<u8>> {
    let data = serde_json::to_vec(state)?;
    let data_len = u32::try_from(data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "save payload too large"))?;

    let mut hasher = Sha256::new();
    hasher.update(SAVE_VERSION_MAGIC.to_le_bytes());
    hasher.update(data_len.to_le_bytes());
    hasher.update(&data);
    let checksum = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + CHECKSUM_LEN);
    out.extend_from_slice(&SAVE_VERSION_MAGIC.to_le_bytes());
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Verifies and unwraps a container, then hydrates its payload.
pub fn decode(bytes: &[u8], config: &GameConfig) -> Result<PlayerState> {
    if bytes.len() < HEADER_LEN {
        return Err(PersistenceError::Truncated);
    }
    let (magic_bytes, rest) = bytes.split_at(8);
    let mut magic = [0u8; 8];
    magic.copy_from_slice(magic_bytes);
    let found = u64::from_le_bytes(magic);
    if found != SAVE_VERSION_MAGIC {
        return Err(PersistenceError::BadMagic {
            expected: SAVE_VERSION_MAGIC,
            found,
        });
    }

    let (len_bytes, rest) = rest.split_at(4);
    let mut len = [0u8; 4];
    len.copy_from_slice(len_bytes);
    let data_len = u32::from_le_bytes(len) as usize;
    if rest.len() != data_len + CHECKSUM_LEN {
        return Err(PersistenceError::Truncated);
    }
    let (data, stored_checksum) = rest.split_at(data_len);

    let mut hasher = Sha256::new();
    hasher.update(magic);
    hasher.update(len);
    hasher.update(data);
    if hasher.finalize().as_slice() != stored_checksum {
        return Err(PersistenceError::ChecksumMismatch);
    }

    hydrate(serde_json::from_slice(data)?, config)
}

/// Where [`SaveManager::load_or_default`] got its state from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    /// The primary file was missing or corrupt; the rotated backup loaded.
    Backup,
    /// Nothing usable on disk; a fresh state was created.
    Fresh,
}

/// Manages saving and loading game state with checksummed files
pub struct SaveManager {
    save_path: PathBuf,
}

impl SaveManager {
    /// Creates a new SaveManager instance
    ///
    /// Sets up the save directory at the appropriate location for the platform
    /// using the `directories` crate.
    pub fn new() -> io::Result<Self> {
        let project_dirs = ProjectDirs::from("", "", "grindstone").ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;

        let data_dir = project_dirs.data_dir();
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            save_path: data_dir.join("save.dat"),
        })
    }

    /// Uses an explicit file; the backup lives next to it.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            save_path: path.into(),
        }
    }

    #[cfg(test)]
    fn new_for_test() -> io::Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

        let test_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!(
            "grindstone-test-{}-{}",
            std::process::id(),
            test_id
        ));
        fs::create_dir_all(&temp_dir)?;
        let manager = Self::with_path(temp_dir.join("save.dat"));
        let _ = fs::remove_file(manager.path());
        let _ = fs::remove_file(manager.backup_path());
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.save_path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.save_path.with_extension("bak")
    }

    pub fn save_exists(&self) -> bool {
        self.save_path.exists()
    }

    /// Writes a snapshot, first rotating any existing file to the backup.
    pub fn save(&self, state: &PlayerState) -> Result<()> {
        let bytes = encode(state)?;
        if let Some(dir) = self.save_path.parent() {
            fs::create_dir_all(dir)?;
        }
        if self.save_path.exists() {
            fs::rename(&self.save_path, self.backup_path())?;
        }
        fs::write(&self.save_path, bytes)?;
        info!(path = %self.save_path.display(), "game saved");
        Ok(())
    }

    /// Loads and verifies the primary file.
    pub fn load(&self, config: &GameConfig) -> Result<PlayerState> {
        let bytes = fs::read(&self.save_path)?;
        decode(&bytes, config)
    }

    pub fn load_backup(&self, config: &GameConfig) -> Result<PlayerState> {
        let bytes = fs::read(self.backup_path())?;
        decode(&bytes, config)
    }

    /// Never fails: primary, then backup, then a fresh state.
    pub fn load_or_default(&self, config: &GameConfig) -> (PlayerState, LoadSource) {
        match self.load(config) {
            Ok(state) => return (state, LoadSource::Primary),
            Err(PersistenceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "primary save unreadable, trying backup"),
        }
        match self.load_backup(config) {
            Ok(state) => {
                warn!("restored state from backup save");
                (state, LoadSource::Backup)
            }
            Err(PersistenceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                (PlayerState::new(config), LoadSource::Fresh)
            }
            Err(e) => {
                warn!(error = %e, "backup save unreadable, starting fresh");
                (PlayerState::new(config), LoadSource::Fresh)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bignum::BigNum;
    use crate::items::types::{EquipmentSlot, Rarity, Stack, StackKey};
    use serde_json::json;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    fn sample_state() -> PlayerState {
        let mut state = PlayerState::new(&config());
        state.gold = "123456789012345678901234567890".parse().unwrap();
        state.player_stats.level = 7;
        state.current_zone = 4;
        let key = StackKey::new("rusty_sword", Rarity::Epic);
        state.inventory_stacks.insert(
            key.clone(),
            Stack {
                count: 4,
                rarity: Rarity::Epic,
            },
        );
        state.equipped.insert(EquipmentSlot::Weapon, Some(key));
        state.purchased_upgrades.insert("sharpen".into(), 3);
        state
    }

    #[test]
    fn test_snapshot_uses_schema_field_names() {
        let json: Value = serde_json::from_str(&to_json(&sample_state()).unwrap()).unwrap();
        assert_eq!(json["schemaVersion"], json!(3));
        assert_eq!(json["gold"], json!("123456789012345678901234567890"));
        assert!(json["playerStats"]["xpToNext"].is_string());
        assert_eq!(json["inventoryStacks"]["rusty_sword#epic"]["count"], json!(4));
        assert_eq!(json["equipped"]["weapon"], json!("rusty_sword#epic"));
        assert!(json["equipped"]["ring"].is_null());
    }

    #[test]
    fn test_save_and_load() {
        let manager = SaveManager::new_for_test().expect("Failed to create SaveManager");
        let original = sample_state();

        manager.save(&original).expect("Failed to save");
        assert!(manager.save_exists());

        let loaded = manager.load(&config()).expect("Failed to load");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_hydrate_fills_missing_fields() {
        let state = hydrate(json!({ "schemaVersion": 3, "gold": "50" }), &config()).unwrap();
        assert_eq!(state.gold, BigNum::from(50u64));
        assert_eq!(state.player_stats.level, 1);
        assert_eq!(state.current_zone, 1);
        assert_eq!(state.equipped.len(), EquipmentSlot::all().len());
    }

    #[test]
    fn test_hydrate_partial_nested_object() {
        let state = hydrate(
            json!({ "schemaVersion": 3, "playerStats": { "str": 42 } }),
            &config(),
        )
        .unwrap();
        assert_eq!(state.player_stats.strength, 42.0);
        assert_eq!(state.player_stats.hp, config().starting_stats.hp);
    }

    #[test]
    fn test_migrations_from_v1() {
        let state = hydrate(
            json!({
                "currency": "900",
                "playerStats": { "str": 12, "vitality": 140, "agility": 9 }
            }),
            &config(),
        )
        .unwrap();
        assert_eq!(state.schema_version, SAVE_SCHEMA_VERSION);
        assert_eq!(state.gold, BigNum::from(900u64));
        assert_eq!(state.player_stats.hp, 140.0);
        assert_eq!(state.player_stats.agility, 9.0);
    }

    #[test]
    fn test_v2_save_only_gets_v3_migration() {
        let state = hydrate(
            json!({
                "schemaVersion": 2,
                "currency": "77",
                "playerStats": { "hp": 150, "vitality": 1 }
            }),
            &config(),
        )
        .unwrap();
        assert_eq!(state.gold, BigNum::from(77u64));
        // v2 rename is not re-applied to a v2 save.
        assert_eq!(state.player_stats.hp, 150.0);
    }

    #[test]
    fn test_future_schema_rejected() {
        let result = hydrate(json!({ "schemaVersion": 99 }), &config());
        assert!(matches!(result, Err(PersistenceError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_schema_version_beyond_u32_rejected() {
        let huge = u64::from(u32::MAX) + 2;
        let result = hydrate(json!({ "schemaVersion": huge, "currency": "5" }), &config());
        assert!(matches!(result, Err(PersistenceError::UnsupportedVersion(v)) if v == huge));
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let state = hydrate(
            json!({
                "schemaVersion": 3,
                "gold": null,
                "totalKills": 12,
                "playerStats": { "str": 20, "def": null }
            }),
            &config(),
        )
        .unwrap();
        assert!(state.gold.is_zero());
        assert_eq!(state.total_kills, 12);
        assert_eq!(state.player_stats.strength, 20.0);
        assert_eq!(state.player_stats.defense, config().starting_stats.defense);
    }

    #[test]
    fn test_load_nonexistent() {
        let manager = SaveManager::new_for_test().unwrap();
        let err = manager.load(&config()).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn test_load_corrupted_file_random_bytes() {
        let manager = SaveManager::new_for_test().unwrap();
        fs::write(manager.path(), b"random garbage data that is not valid").unwrap();
        assert!(matches!(
            manager.load(&config()),
            Err(PersistenceError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_load_truncated_file() {
        let manager = SaveManager::new_for_test().unwrap();
        fs::write(manager.path(), SAVE_VERSION_MAGIC.to_le_bytes()).unwrap();
        assert!(matches!(
            manager.load(&config()),
            Err(PersistenceError::Truncated)
        ));
    }

    #[test]
    fn test_load_bad_checksum() {
        let manager = SaveManager::new_for_test().unwrap();
        manager.save(&sample_state()).unwrap();

        let mut bytes = fs::read(manager.path()).unwrap();
        let mid = HEADER_LEN + 3;
        bytes[mid] ^= 0xFF;
        fs::write(manager.path(), &bytes).unwrap();

        assert!(matches!(
            manager.load(&config()),
            Err(PersistenceError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_save_rotates_backup() {
        let manager = SaveManager::new_for_test().unwrap();
        let first = sample_state();
        let mut second = first.clone();
        second.player_stats.level = 8;

        manager.save(&first).unwrap();
        manager.save(&second).unwrap();

        assert_eq!(manager.load(&config()).unwrap(), second);
        assert_eq!(manager.load_backup(&config()).unwrap(), first);
    }

    #[test]
    fn test_corrupt_primary_falls_back_to_backup() {
        let manager = SaveManager::new_for_test().unwrap();
        let first = sample_state();
        manager.save(&first).unwrap();
        manager.save(&PlayerState::new(&config())).unwrap();
        fs::write(manager.path(), b"garbage").unwrap();

        let (state, source) = manager.load_or_default(&config());

        assert_eq!(source, LoadSource::Backup);
        assert_eq!(state, first);
    }

    #[test]
    fn test_nothing_usable_starts_fresh() {
        let manager = SaveManager::new_for_test().unwrap();
        fs::write(manager.path(), b"garbage").unwrap();
        fs::write(manager.backup_path(), b"more garbage").unwrap();

        let (state, source) = manager.load_or_default(&config());

        assert_eq!(source, LoadSource::Fresh);
        assert_eq!(state, PlayerState::new(&config()));
    }
}
