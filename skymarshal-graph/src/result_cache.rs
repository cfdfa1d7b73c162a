use crate::fetcher::FetchOptions;
use serde_json::Value;
use skymarshal_common::error::SkymarshalError;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize)]
struct CacheMeta {
    created_at: f64,
    key: String,
}

/// Filesystem cache for network fetch results. Each entry is a JSON payload
/// with a metadata sidecar carrying the creation timestamp for TTL checks.
pub struct SnapshotCache {
    base_path: PathBuf,
    default_ttl: Duration,
}

impl SnapshotCache {
    pub fn open(base_path: &Path, default_ttl: Duration) -> Result<Self, SkymarshalError> {
        std::fs::create_dir_all(base_path)?;
        tracing::info!("network cache initialized at {base_path:?}");
        Ok(SnapshotCache {
            base_path: base_path.to_path_buf(),
            default_ttl,
        })
    }

    pub fn make_key(handle: &str, options: &FetchOptions) -> String {
        let mode = match options.mode {
            crate::types::FetchMode::Fast => "fast",
            crate::types::FetchMode::Balanced => "balanced",
            crate::types::FetchMode::Detailed => "detailed",
        };
        format!(
            "network:{handle}:{}:{}:maxf{}:maxt{}:{mode}",
            if options.include_followers {
                "follower"
            } else {
                "nofollower"
            },
            if options.include_following {
                "following"
            } else {
                "nofollowing"
            },
            options.max_followers.unwrap_or(500),
            options.max_following.unwrap_or(500),
        )
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", safe_key(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.meta.json", safe_key(key)))
    }

    /// Cached payload if present and within the TTL. Expired or unreadable
    /// entries are deleted on the way out.
    pub fn get(&self, key: &str, ttl: Option<Duration>) -> Option<Value> {
        let data_path = self.data_path(key);
        if !data_path.exists() {
            return None;
        }
        let ttl = ttl.unwrap_or(self.default_ttl);
        if let Ok(bytes) = std::fs::read(self.meta_path(key)) {
            if let Ok(meta) = serde_json::from_slice::<CacheMeta>(&bytes) {
                let age = now_seconds() - meta.created_at;
                if age > ttl.as_secs_f64() {
                    tracing::info!("cache expired for key '{key}'");
                    self.delete(key);
                    return None;
                }
            }
        }
        match std::fs::read(&data_path) {
            Ok(bytes) if !bytes.is_empty() => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!("cache read error for '{key}': {error}");
                    self.delete(key);
                    None
                }
            },
            _ => {
                self.delete(key);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &Value) -> Result<(), SkymarshalError> {
        let meta = CacheMeta {
            created_at: now_seconds(),
            key: key.to_string(),
        };
        std::fs::write(self.data_path(key), serde_json::to_vec(value)?)?;
        std::fs::write(self.meta_path(key), serde_json::to_vec(&meta)?)?;
        Ok(())
    }

    pub fn delete(&self, key: &str) {
        let _ = std::fs::remove_file(self.data_path(key));
        let _ = std::fs::remove_file(self.meta_path(key));
    }

    /// Remove every cached entry; returns the number of files deleted.
    pub fn clear(&self) -> usize {
        let mut count = 0;
        if let Ok(entries) = std::fs::read_dir(&self.base_path) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(".json") && std::fs::remove_file(entry.path()).is_ok() {
                    count += 1;
                }
            }
        }
        tracing::info!("cleared {count} cache files");
        count
    }
}

fn safe_key(key: &str) -> String {
    key.replace(['/', ':'], "_")
}

fn now_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchMode;
    use serde_json::json;

    fn options() -> FetchOptions {
        FetchOptions {
            include_followers: true,
            include_following: true,
            max_followers: Some(500),
            max_following: Some(500),
            mode: FetchMode::Balanced,
        }
    }

    #[test]
    fn test_make_key_encodes_parameters() {
        let key = SnapshotCache::make_key("alice.bsky.social", &options());
        assert_eq!(
            key,
            "network:alice.bsky.social:follower:following:maxf500:maxt500:balanced"
        );
    }

    #[test]
    fn test_set_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path(), DEFAULT_SNAPSHOT_TTL).unwrap();
        let key = SnapshotCache::make_key("alice.bsky.social", &options());
        cache.set(&key, &json!({"nodes": [], "edges": []})).unwrap();

        let value = cache.get(&key, None).unwrap();
        assert!(value["nodes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path(), DEFAULT_SNAPSHOT_TTL).unwrap();
        let key = "network:test";
        cache.set(key, &json!({"ok": true})).unwrap();

        assert!(cache.get(key, Some(Duration::from_secs(0))).is_none());
        // A second read misses entirely because the files were deleted.
        assert!(cache.get(key, None).is_none());
    }

    #[test]
    fn test_clear_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path(), DEFAULT_SNAPSHOT_TTL).unwrap();
        cache.set("a", &json!(1)).unwrap();
        cache.set("b", &json!(2)).unwrap();
        // Data + sidecar per entry.
        assert_eq!(cache.clear(), 4);
    }
}
