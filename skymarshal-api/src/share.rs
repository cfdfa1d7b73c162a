use diesel::prelude::*;
use diesel::sql_query;
use diesel::sqlite::SqliteConnection;
use serde_json::Value;
use skymarshal_common::error::SkymarshalError;
use std::path::Path;
use std::sync::Mutex;

pub const SHARE_DB_FILE: &str = "shared_posts.sqlite";

diesel::table! {
    shared_posts (id) {
        id -> Text,
        uri -> Text,
        content -> Text,
        createdAt -> Text,
    }
}

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = shared_posts)]
struct SharedPostRow {
    id: String,
    uri: String,
    content: String,
    #[diesel(column_name = createdAt)]
    created_at: String,
}

/// Permalink store for shared posts: an 8-hex-char id maps to a frozen JSON
/// snapshot of one record.
pub struct SharedPostStore {
    conn: Mutex<SqliteConnection>,
}

impl SharedPostStore {
    pub fn open(path: &Path) -> Result<Self, SkymarshalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let database_url = path.to_string_lossy().to_string();
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|error| SkymarshalError::Storage(format!("open {database_url}: {error}")))?;
        for statement in [
            "PRAGMA journal_mode=WAL",
            "PRAGMA synchronous=NORMAL",
            "CREATE TABLE IF NOT EXISTS shared_posts (
                id TEXT PRIMARY KEY,
                uri TEXT NOT NULL,
                content TEXT NOT NULL,
                createdAt TEXT NOT NULL
            )",
        ] {
            sql_query(statement)
                .execute(&mut conn)
                .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        }
        Ok(SharedPostStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn create_share(&self, post_data: &Value) -> Result<String, SkymarshalError> {
        let share_id = skymarshal_common::get_random_hex(8);
        let uri = post_data
            .get("uri")
            .and_then(|value| value.as_str())
            .map(|uri| uri.to_string())
            .unwrap_or_else(|| format!("unknown:{share_id}"));
        let row = SharedPostRow {
            id: share_id.clone(),
            uri,
            content: serde_json::to_string(post_data)?,
            created_at: skymarshal_common::now(),
        };
        let mut conn = self.lock()?;
        diesel::insert_into(shared_posts::table)
            .values(&row)
            .execute(&mut *conn)
            .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        Ok(share_id)
    }

    pub fn get_share(&self, share_id: &str) -> Result<Option<Value>, SkymarshalError> {
        let mut conn = self.lock()?;
        let row: Option<SharedPostRow> = shared_posts::table
            .filter(shared_posts::id.eq(share_id))
            .first(&mut *conn)
            .optional()
            .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut data: Value = serde_json::from_str(&row.content)?;
        if let Some(map) = data.as_object_mut() {
            map.insert("shared_at".to_string(), Value::String(row.created_at));
        }
        Ok(Some(data))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SqliteConnection>, SkymarshalError> {
        self.conn
            .lock()
            .map_err(|_| SkymarshalError::Internal("share store mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_share_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedPostStore::open(&dir.path().join(SHARE_DB_FILE)).unwrap();
        let post = json!({
            "uri": "at://did:plc:a/app.bsky.feed.post/1",
            "text": "hello world",
            "likes": 3
        });
        let id = store.create_share(&post).unwrap();
        assert_eq!(id.len(), 8);

        let fetched = store.get_share(&id).unwrap().unwrap();
        assert_eq!(fetched["text"], "hello world");
        assert!(fetched["shared_at"].is_string());
    }

    #[test]
    fn test_unknown_share_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedPostStore::open(&dir.path().join(SHARE_DB_FILE)).unwrap();
        assert!(store.get_share("deadbeef").unwrap().is_none());
    }
}
