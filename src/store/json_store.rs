use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::schema::BattleSnapshot;

pub const SNAPSHOT_FILE: &str = "battle-store.json";

/// Flat-file JSON backend. Every write goes to a `.tmp` sibling first and
/// is renamed over the target, so a failed write never truncates the
/// previous file.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Load and deserialize the snapshot. Returns None if the file exists
    /// but cannot be read or parsed.
    pub fn load_snapshot(&self) -> Option<BattleSnapshot> {
        let path = self.file_path(SNAPSHOT_FILE);
        if path.exists() {
            read_json(&path).ok()
        } else {
            // No file yet: fresh start, not a corruption
            Some(BattleSnapshot::default())
        }
    }

    pub fn save_snapshot(&self, data: &BattleSnapshot) -> Result<()> {
        write_json(&self.file_path(SNAPSHOT_FILE), data)
    }

    /// Move an unreadable snapshot aside so the next save does not destroy it.
    pub fn quarantine_snapshot(&self) -> Result<PathBuf> {
        let path = self.file_path(SNAPSHOT_FILE);
        let aside = path.with_extension("json.corrupt");
        fs::rename(&path, &aside)?;
        Ok(aside)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let tmp_path = path.with_extension("tmp");

    let json = serde_json::to_string_pretty(data)?;
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_snapshot_loads_defaults() {
        let (_dir, store) = make_test_store();
        let snapshot = store.load_snapshot().unwrap();
        assert_eq!(snapshot, BattleSnapshot::default());
        assert!(!store.file_path(SNAPSHOT_FILE).exists());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = make_test_store();
        let mut snapshot = BattleSnapshot::default();
        snapshot.time_left = 42;
        snapshot.total_duration = 60;
        store.save_snapshot(&snapshot).unwrap();
        assert_eq!(store.load_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn test_corrupt_snapshot_is_none_and_can_be_quarantined() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(SNAPSHOT_FILE), "{ not json").unwrap();
        assert!(store.load_snapshot().is_none());

        let aside = store.quarantine_snapshot().unwrap();
        assert!(aside.exists());
        assert_eq!(fs::read_to_string(aside).unwrap(), "{ not json");
        assert!(store.load_snapshot().is_some());
    }

    #[test]
    fn test_failed_write_keeps_previous_snapshot() {
        let (_dir, store) = make_test_store();
        let snapshot = BattleSnapshot::default();
        store.save_snapshot(&snapshot).unwrap();
        let before = fs::read_to_string(store.file_path(SNAPSHOT_FILE)).unwrap();

        // A directory squatting on the .tmp path makes the staging write fail.
        fs::create_dir(store.file_path("battle-store.tmp")).unwrap();
        let mut changed = snapshot.clone();
        changed.time_left = 99;
        assert!(store.save_snapshot(&changed).is_err());

        let after = fs::read_to_string(store.file_path(SNAPSHOT_FILE)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_no_tmp_left_after_save() {
        let (dir, store) = make_test_store();
        store.save_snapshot(&BattleSnapshot::default()).unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }
}
