//! On-disk clip store
//!
//! One WAV artifact exists per turn, named by a time-derived token so names
//! never collide across power cycles. Clips that survived a crash are purged
//! at startup, and a drop guard deletes the current turn's clip on every
//! exit path.

use std::path::{Path, PathBuf};

use crate::Result;

/// Name prefix of every capture artifact
pub const CLIP_PREFIX: &str = "rec-";

/// Name suffix of every capture artifact
pub const CLIP_SUFFIX: &str = ".wav";

/// Directory of capture artifacts
pub struct ClipStore {
    dir: PathBuf,
}

impl ClipStore {
    /// Open (creating if needed) the clip directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the clips
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a new clip named by the current time in milliseconds
    #[must_use]
    pub fn new_clip_path(&self) -> PathBuf {
        let token = chrono::Utc::now().timestamp_millis();
        self.dir.join(format!("{CLIP_PREFIX}{token}{CLIP_SUFFIX}"))
    }

    /// Delete clips left behind by earlier runs.
    ///
    /// Returns the number of clips removed. Files that don't match the
    /// clip naming pattern are left alone.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be enumerated
    pub fn purge_stale(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if name.starts_with(CLIP_PREFIX) && name.ends_with(CLIP_SUFFIX) {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(clip = name, error = %e, "failed to purge stale clip");
                    }
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "purged stale clips");
        }
        Ok(removed)
    }
}

/// Deletes the clip when dropped, on every exit path of a turn
pub struct ClipGuard {
    path: PathBuf,
}

impl ClipGuard {
    /// Guard the clip at `path`
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Path of the guarded clip
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ClipGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(clip = %self.path.display(), "clip deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(clip = %self.path.display(), error = %e, "failed to delete clip");
            }
        }
    }
}
