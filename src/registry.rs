//! registry.rs: guild → channel subscriptions, persisted as a JSON object.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Read side used by the scheduler: a point-in-time copy of all destinations.
pub trait Destinations: Send + Sync {
    fn snapshot(&self) -> BTreeMap<String, String>;
}

impl Destinations for BTreeMap<String, String> {
    fn snapshot(&self) -> BTreeMap<String, String> {
        self.clone()
    }
}

#[derive(Debug)]
pub struct DestinationRegistry {
    path: PathBuf,
    inner: RwLock<BTreeMap<String, String>>,
}

impl DestinationRegistry {
    /// Load subscriptions from `path`; missing, unreadable or corrupt files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), "registry dir: {e:#}");
            }
        }
        let subs = load_subscriptions(&path);
        tracing::info!(path = %path.display(), count = subs.len(), "subscriptions loaded");
        Self {
            path,
            inner: RwLock::new(subs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Subscribe `source_id`; re-subscribing replaces the previous target.
    pub fn register(&self, source_id: &str, target_id: &str) -> Result<()> {
        let mut guard = self.inner.write().expect("registry rwlock poisoned");
        let mut next = guard.clone();
        next.insert(source_id.to_string(), target_id.to_string());
        persist(&self.path, &next)?;
        *guard = next;
        tracing::info!(guild = %source_id, channel = %target_id, "destination registered");
        Ok(())
    }

    /// Remove `source_id`. Returns whether a subscription existed.
    pub fn unregister(&self, source_id: &str) -> Result<bool> {
        let mut guard = self.inner.write().expect("registry rwlock poisoned");
        if !guard.contains_key(source_id) {
            return Ok(false);
        }
        let mut next = guard.clone();
        next.remove(source_id);
        persist(&self.path, &next)?;
        *guard = next;
        tracing::info!(guild = %source_id, "destination removed");
        Ok(true)
    }

    pub fn get(&self, source_id: &str) -> Option<String> {
        let guard = self.inner.read().expect("registry rwlock poisoned");
        guard.get(source_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry rwlock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Destinations for DestinationRegistry {
    fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.read().expect("registry rwlock poisoned").clone()
    }
}

fn load_subscriptions(path: &Path) -> BTreeMap<String, String> {
    read_subscriptions(path).unwrap_or_else(|e| {
        tracing::error!(path = %path.display(), "subscriptions unreadable, starting empty: {e:#}");
        BTreeMap::new()
    })
}

/// A missing file is an empty registry; anything else unreadable is an error.
fn read_subscriptions(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn persist(path: &Path, subs: &BTreeMap<String, String>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(subs).context("encode subscriptions")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename {}", tmp.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (tempfile::TempDir, DestinationRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let reg = DestinationRegistry::open(dir.path().join("data/channels.json"));
        (dir, reg)
    }

    #[test]
    fn starts_empty() {
        let (_dir, reg) = registry();
        assert!(reg.is_empty());
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn register_persists_to_disk() {
        let (_dir, reg) = registry();
        reg.register("guild-1", "channel-A").unwrap();
        assert_eq!(reg.get("guild-1").as_deref(), Some("channel-A"));

        let raw = fs::read_to_string(reg.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["guild-1"], "channel-A");

        let reopened = DestinationRegistry::open(reg.path());
        assert_eq!(reopened.get("guild-1").as_deref(), Some("channel-A"));
    }

    #[test]
    fn last_write_wins() {
        let (_dir, reg) = registry();
        reg.register("guild-1", "channel-A").unwrap();
        reg.register("guild-1", "channel-B").unwrap();
        assert_eq!(reg.get("guild-1").as_deref(), Some("channel-B"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_reports_whether_removed() {
        let (_dir, reg) = registry();
        reg.register("guild-1", "channel-A").unwrap();
        assert!(reg.unregister("guild-1").unwrap());
        assert_eq!(reg.get("guild-1"), None);
        assert!(!reg.unregister("guild-999").unwrap());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let (_dir, reg) = registry();
        reg.register("g1", "c1").unwrap();
        let snap = reg.snapshot();
        reg.register("g2", "c2").unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.snapshot().len(), 2);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        fs::write(&path, "[oops").unwrap();
        assert!(DestinationRegistry::open(&path).is_empty());
    }

    #[test]
    fn only_a_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_subscriptions(&dir.path().join("absent.json"))
            .unwrap()
            .is_empty());

        let blocked = dir.path().join("channels.json");
        fs::create_dir_all(&blocked).unwrap();
        let err = read_subscriptions(&blocked).unwrap_err();
        assert!(format!("{err:#}").contains("read"));

        // Still opens, but never replaces what is at the path.
        let reg = DestinationRegistry::open(&blocked);
        assert!(reg.is_empty());
        assert!(reg.register("g1", "c1").is_err());
        assert!(blocked.is_dir());
        assert!(reg.is_empty());
    }
}
