//! Durable per-source watermark ("last seen identifier").
//!
//! One small JSON record per feed. The in-memory copy only advances after the
//! record hit disk, so a failed write can at worst cause a repeat notification
//! on the next cycle, never a silently skipped one.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    #[serde(default, alias = "last_seen_id", alias = "last_video_id")]
    pub last_seen_id: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct WatermarkStore {
    path: PathBuf,
    current: Option<Watermark>,
}

impl WatermarkStore {
    /// Open the record at `path`, creating its directory if needed.
    /// Missing or corrupt state loads as "no watermark".
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), "state dir: {e:#}");
            }
        }
        let current = read_watermark(&path);
        Self { path, current }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<&str> {
        self.current
            .as_ref()
            .and_then(|w| w.last_seen_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|w| w.updated_at)
    }

    /// Persist `id` as the new watermark. Memory is updated only on success.
    pub fn save(&mut self, id: &str) -> Result<()> {
        let next = Watermark {
            last_seen_id: Some(id.to_string()),
            updated_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&next).context("encode watermark")?;
        write_atomic(&self.path, &bytes)
            .with_context(|| format!("write watermark {}", self.path.display()))?;
        self.current = Some(next);
        Ok(())
    }
}

fn read_watermark(path: &Path) -> Option<Watermark> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "read watermark: {e:#}");
            return None;
        }
    };
    match serde_json::from_str::<Watermark>(&raw) {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(path = %path.display(), "corrupt watermark, starting fresh: {e:#}");
            None
        }
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state".to_string());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("rename {}", tmp.display()))?;
    Ok(())
}
