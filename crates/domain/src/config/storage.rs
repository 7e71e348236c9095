use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `users.json` and `tracks.jsonl`.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Tracks kept in memory for `GET /api/tracks`; older ones stay on disk.
    #[serde(default = "d_1000")]
    pub max_tracks_in_memory: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            max_tracks_in_memory: 1000,
        }
    }
}

impl StorageConfig {
    pub fn users_file(&self) -> PathBuf {
        self.state_path.join("users.json")
    }

    pub fn tracks_file(&self) -> PathBuf {
        self.state_path.join("tracks.jsonl")
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_1000() -> usize {
    1000
}
