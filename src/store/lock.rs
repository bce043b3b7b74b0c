// src/store/lock.rs
//! Single-run guard: a lock file created with create-new semantics.
//!
//! Two overlapping runs would both read the same store and the later `persist`
//! would drop the other's inserts, so a second run refuses to start while a
//! fresh lock exists. A lock older than `stale_after` is assumed abandoned
//! (killed process) and taken over.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::StoreError;

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: impl Into<PathBuf>, stale_after: Duration) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        match create_new(&path) {
            Ok(()) => return Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|m| m.elapsed().ok());
        match age {
            Some(age) if age > stale_after => {
                tracing::warn!(
                    path = %path.display(),
                    age_secs = age.as_secs(),
                    "taking over stale run lock"
                );
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                create_new(&path).map_err(|e| StoreError::io(&path, e))?;
                Ok(Self { path })
            }
            _ => Err(StoreError::Locked {
                since: fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.lines().nth(1).map(str::to_string))
                    .unwrap_or_else(|| "unknown".to_string()),
                path,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not release run lock");
        }
    }
}

fn create_new(path: &Path) -> std::io::Result<()> {
    let mut f = OpenOptions::new().write(true).create_new(true).open(path)?;
    let now: DateTime<Utc> = Utc::now();
    writeln!(f, "{}", std::process::id())?;
    writeln!(f, "{}", now.to_rfc3339())?;
    Ok(())
}
