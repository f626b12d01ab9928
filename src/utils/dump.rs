//! In-memory ring of recently fetched player bodies, dumped to disk when extraction breaks

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Number of player bodies kept in memory
pub const MAX_PLAYER_DUMPS: usize = 3;

/// File name used when writing a dump
pub const DUMP_FILE_NAME: &str = "player-script.js";

/// One recorded player body
#[derive(Debug, Clone)]
pub struct PlayerDump {
    /// Player identifier the body was fetched from
    pub name: String,
    /// Raw script text
    pub body: String,
    /// When the body was recorded
    pub fetched_at: DateTime<Utc>,
}

/// Most recent player bodies, newest first
#[derive(Debug, Default)]
pub struct PlayerDumps {
    entries: Mutex<VecDeque<PlayerDump>>,
}

impl PlayerDumps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fetched body, evicting the oldest beyond [`MAX_PLAYER_DUMPS`]
    pub fn record(&self, name: &str, body: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_front(PlayerDump {
            name: name.to_string(),
            body: body.to_string(),
            fetched_at: Utc::now(),
        });
        entries.truncate(MAX_PLAYER_DUMPS);
    }

    /// Newest recorded body
    pub fn latest(&self) -> Option<PlayerDump> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.front().cloned()
    }

    /// Names of recorded bodies, newest first
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the newest body to `dir/player-script.js`.
    ///
    /// Returns `None` when nothing has been recorded or the newest body is empty.
    pub fn dump_latest(&self, dir: &Path) -> std::io::Result<Option<PathBuf>> {
        let latest = match self.latest() {
            Some(dump) if !dump.body.is_empty() => dump,
            _ => return Ok(None),
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(DUMP_FILE_NAME);
        std::fs::write(&path, latest.body.as_bytes())?;

        let shown = std::env::current_dir()
            .ok()
            .and_then(|cwd| pathdiff::diff_paths(&path, cwd))
            .unwrap_or_else(|| path.clone());
        warn!(
            "Error when parsing {} (fetched {}), the platform may have changed its player. \
             Please report this issue with the saved file: {}",
            latest.name,
            latest.fetched_at.to_rfc3339(),
            shown.display()
        );

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_three_newest() {
        let dumps = PlayerDumps::new();
        for i in 0..5 {
            dumps.record(&format!("player-{}", i), "body");
        }

        assert_eq!(dumps.len(), MAX_PLAYER_DUMPS);
        assert_eq!(dumps.names(), vec!["player-4", "player-3", "player-2"]);
        assert_eq!(dumps.latest().unwrap().name, "player-4");
    }

    #[test]
    fn test_dump_latest_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dumps = PlayerDumps::new();
        dumps.record("old", "var a=1;");
        dumps.record("new", "var b=2;");

        let path = dumps.dump_latest(dir.path()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), DUMP_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "var b=2;");
    }

    #[test]
    fn test_dump_latest_empty() {
        let dir = tempfile::tempdir().unwrap();
        let dumps = PlayerDumps::new();
        assert!(dumps.is_empty());
        assert!(dumps.dump_latest(dir.path()).unwrap().is_none());

        dumps.record("blank", "");
        assert!(dumps.dump_latest(dir.path()).unwrap().is_none());
    }
}
