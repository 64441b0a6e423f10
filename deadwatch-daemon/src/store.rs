//! JSON file implementation of [`StateStore`].
//!
//! State lives under `data_dir` with one directory per server:
//!
//! ```text
//! <data_dir>/
//!   <guild>_<server>/
//!     ingest_game_log.json    -- file ingest state per feed
//!     ingest_killfeed.json
//!     stats.json              -- per-player PvP stats
//!     kills.jsonl             -- append-only kill log, one record per line
//! ```
//!
//! Writes go through a temp file followed by a rename so a crash never
//! leaves a half-written state file behind.

use std::path::{Path, PathBuf};

use deadwatch_core::error::{DeadwatchError, StorageError};
use deadwatch_core::pipeline::StateStore;
use deadwatch_core::types::{FeedKind, FileIngestState, KillRecord, PvpStats, ServerKey};
use tokio::io::AsyncWriteExt;

/// State store that persists everything as JSON under a data directory.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    data_dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn server_dir(&self, key: &ServerKey) -> PathBuf {
        self.data_dir.join(key.slug())
    }

    fn ingest_path(&self, key: &ServerKey, kind: FeedKind) -> PathBuf {
        self.server_dir(key).join(format!("ingest_{kind}.json"))
    }

    fn stats_path(&self, key: &ServerKey) -> PathBuf {
        self.server_dir(key).join("stats.json")
    }

    fn kills_path(&self, key: &ServerKey) -> PathBuf {
        self.server_dir(key).join("kills.jsonl")
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, DeadwatchError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content).map_err(|e| {
                    StorageError::Serialization(format!("{}: {e}", path.display()))
                })?;
                Ok(Some(value))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Load(format!("{}: {err}", path.display())).into()),
        }
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), DeadwatchError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Save(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StorageError::Save(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StorageError::Save(format!("{}: {e}", path.display())))?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    async fn load_ingest_state(
        &self,
        key: &ServerKey,
        kind: FeedKind,
    ) -> Result<Option<FileIngestState>, DeadwatchError> {
        Self::read_json(&self.ingest_path(key, kind)).await
    }

    async fn save_ingest_state(
        &self,
        key: &ServerKey,
        kind: FeedKind,
        state: &FileIngestState,
    ) -> Result<(), DeadwatchError> {
        Self::write_json(&self.ingest_path(key, kind), state).await
    }

    async fn load_stats(
        &self,
        key: &ServerKey,
    ) -> Result<Vec<(String, PvpStats)>, DeadwatchError> {
        Ok(Self::read_json(&self.stats_path(key)).await?.unwrap_or_default())
    }

    async fn save_stats(
        &self,
        key: &ServerKey,
        stats: &[(String, PvpStats)],
    ) -> Result<(), DeadwatchError> {
        Self::write_json(&self.stats_path(key), &stats).await
    }

    async fn append_kills(
        &self,
        key: &ServerKey,
        records: &[KillRecord],
    ) -> Result<(), DeadwatchError> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.kills_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Save(format!("{}: {e}", parent.display())))?;
        }
        let mut buf = Vec::with_capacity(records.len() * 256);
        for record in records {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            buf.push(b'\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::Save(format!("{}: {e}", path.display())))?;
        file.write_all(&buf)
            .await
            .map_err(|e| StorageError::Save(format!("{}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| StorageError::Save(format!("{}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn key() -> ServerKey {
        ServerKey::new(42, "eu-main")
    }

    fn record(killer: &str, victim: &str) -> KillRecord {
        KillRecord {
            timestamp: Utc::now(),
            killer: killer.to_owned(),
            killer_id: "k".to_owned(),
            victim: victim.to_owned(),
            victim_id: "v".to_owned(),
            weapon: "AKM".to_owned(),
            distance: 120.0,
            killer_platform: "PC".to_owned(),
            victim_platform: "PC".to_owned(),
            is_suicide: false,
            raw_line: format!("{killer};{victim}"),
        }
    }

    #[tokio::test]
    async fn missing_ingest_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());
        let state = store
            .load_ingest_state(&key(), FeedKind::GameLog)
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn ingest_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        let state = FileIngestState::new(4_096, 120, "[2024.03.15-18.00.00:000] LogTemp: x");
        store
            .save_ingest_state(&key(), FeedKind::GameLog, &state)
            .await
            .unwrap();

        let loaded = store
            .load_ingest_state(&key(), FeedKind::GameLog)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.file_size, 4_096);
        assert_eq!(loaded.line_count, 120);
        assert_eq!(loaded.last_line, state.last_line);

        // Each feed kind gets its own state file
        let other = store
            .load_ingest_state(&key(), FeedKind::Killfeed)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn stats_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        let mut stats = PvpStats {
            kills: 7,
            deaths: 2,
            ..Default::default()
        };
        stats.recompute_kdr();
        store
            .save_stats(&key(), &[("Alice".to_owned(), stats.clone())])
            .await
            .unwrap();

        let loaded = store.load_stats(&key()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "Alice");
        assert_eq!(loaded[0].1.kills, 7);
        assert_eq!(loaded[0].1.kdr, 3.5);
    }

    #[tokio::test]
    async fn load_stats_for_unknown_server_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());
        assert!(store.load_stats(&key()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_kills_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        store
            .append_kills(&key(), &[record("Alice", "Bob")])
            .await
            .unwrap();
        store
            .append_kills(&key(), &[record("Bob", "Carol"), record("Carol", "Alice")])
            .await
            .unwrap();

        let path = dir.path().join("42_eu-main").join("kills.jsonl");
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: KillRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.killer, "Alice");
    }

    #[tokio::test]
    async fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path());

        let server_dir = dir.path().join("42_eu-main");
        tokio::fs::create_dir_all(&server_dir).await.unwrap();
        tokio::fs::write(server_dir.join("stats.json"), "not json")
            .await
            .unwrap();

        assert!(store.load_stats(&key()).await.is_err());
    }
}
