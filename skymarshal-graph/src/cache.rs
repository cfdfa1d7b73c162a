use crate::schema::{posts, profiles};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sqlite::SqliteConnection;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::time::parse_datetime;
use skymarshal_core::models::{ContentItem, Profile};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub const PROFILE_CACHE_FILE: &str = "profile_cache.sqlite";

#[derive(Queryable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = profiles)]
struct ProfileRow {
    pub did: String,
    pub handle: String,
    #[diesel(column_name = displayName)]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[diesel(column_name = followersCount)]
    pub followers_count: i64,
    #[diesel(column_name = followingCount)]
    pub following_count: i64,
    #[diesel(column_name = postsCount)]
    pub posts_count: i64,
    pub avatar: Option<String>,
    #[diesel(column_name = lastUpdated)]
    pub last_updated: String,
}

#[derive(Queryable, Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = posts)]
pub struct PostRow {
    pub uri: String,
    pub cid: Option<String>,
    #[diesel(column_name = authorHandle)]
    pub author_handle: Option<String>,
    pub text: Option<String>,
    #[diesel(column_name = createdAt)]
    pub created_at: Option<String>,
    #[diesel(column_name = likeCount)]
    pub like_count: i64,
    #[diesel(column_name = replyCount)]
    pub reply_count: i64,
    #[diesel(column_name = repostCount)]
    pub repost_count: i64,
    #[diesel(column_name = rawData)]
    pub raw_data: Option<String>,
}

impl ProfileRow {
    fn from_profile(profile: &Profile, now: &str) -> Self {
        ProfileRow {
            did: profile.did.clone(),
            handle: profile.handle.clone(),
            display_name: profile.display_name.clone(),
            description: profile.description.clone(),
            followers_count: profile.followers_count,
            following_count: profile.following_count,
            posts_count: profile.posts_count,
            avatar: profile.avatar.clone(),
            last_updated: now.to_string(),
        }
    }

    fn into_profile(self) -> Profile {
        Profile {
            did: self.did,
            handle: self.handle,
            display_name: self.display_name,
            description: self.description,
            followers_count: self.followers_count,
            following_count: self.following_count,
            posts_count: self.posts_count,
            avatar: self.avatar,
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        match parse_datetime(&self.last_updated) {
            Some(updated) => Utc::now() - updated > ttl,
            None => true,
        }
    }
}

/// Durable actor/post cache backed by an embedded sqlite database.
///
/// The connection is serialized behind a mutex: one writer at a time, and no
/// reader can observe a partial upsert. WAL journaling keeps the file sound
/// across process crashes.
pub struct ProfileCache {
    conn: Mutex<SqliteConnection>,
}

impl ProfileCache {
    pub fn open(path: &Path) -> Result<Self, SkymarshalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let database_url = path.to_string_lossy().to_string();
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|error| SkymarshalError::Storage(format!("open {database_url}: {error}")))?;
        Self::initialize(&mut conn)?;
        Ok(ProfileCache {
            conn: Mutex::new(conn),
        })
    }

    fn initialize(conn: &mut SqliteConnection) -> Result<(), SkymarshalError> {
        let statements = [
            "PRAGMA journal_mode=WAL",
            "PRAGMA synchronous=NORMAL",
            "PRAGMA cache_size=10000",
            "PRAGMA temp_store=MEMORY",
            "CREATE TABLE IF NOT EXISTS profiles (
                did TEXT PRIMARY KEY,
                handle TEXT NOT NULL,
                displayName TEXT,
                description TEXT,
                followersCount BIGINT NOT NULL DEFAULT 0,
                followingCount BIGINT NOT NULL DEFAULT 0,
                postsCount BIGINT NOT NULL DEFAULT 0,
                avatar TEXT,
                lastUpdated TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_profiles_handle ON profiles(handle)",
            "CREATE INDEX IF NOT EXISTS idx_profiles_followers
                ON profiles(followersCount DESC)",
            "CREATE TABLE IF NOT EXISTS posts (
                uri TEXT PRIMARY KEY,
                cid TEXT,
                authorHandle TEXT,
                text TEXT,
                createdAt TEXT,
                likeCount BIGINT NOT NULL DEFAULT 0,
                replyCount BIGINT NOT NULL DEFAULT 0,
                repostCount BIGINT NOT NULL DEFAULT 0,
                rawData TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(authorHandle)",
            "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(createdAt)",
        ];
        for statement in statements {
            sql_query(statement)
                .execute(conn)
                .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        }
        Ok(())
    }

    /// Profiles present in the cache and still within `ttl`, keyed by DID.
    /// Stale entries are treated as missing.
    pub fn get_profiles(
        &self,
        dids: &[String],
        ttl: Duration,
    ) -> Result<HashMap<String, Profile>, SkymarshalError> {
        if dids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.lock()?;
        let rows: Vec<ProfileRow> = profiles::table
            .filter(profiles::did.eq_any(dids))
            .load(&mut *conn)
            .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        Ok(rows
            .into_iter()
            .filter(|row| !row.is_stale(ttl))
            .map(|row| (row.did.clone(), row.into_profile()))
            .collect())
    }

    /// Like [`get_profiles`](Self::get_profiles) but keyed by handle.
    pub fn get_profiles_by_handle(
        &self,
        handles: &[String],
        ttl: Duration,
    ) -> Result<HashMap<String, Profile>, SkymarshalError> {
        if handles.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.lock()?;
        let rows: Vec<ProfileRow> = profiles::table
            .filter(profiles::handle.eq_any(handles))
            .load(&mut *conn)
            .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        Ok(rows
            .into_iter()
            .filter(|row| !row.is_stale(ttl))
            .map(|row| (row.handle.clone(), row.into_profile()))
            .collect())
    }

    /// Insert-or-replace inside one transaction; `lastUpdated` is refreshed
    /// on every write.
    pub fn upsert_profiles(&self, entries: &[Profile]) -> Result<(), SkymarshalError> {
        if entries.is_empty() {
            return Ok(());
        }
        let now = skymarshal_common::now();
        let rows: Vec<ProfileRow> = entries
            .iter()
            .map(|profile| ProfileRow::from_profile(profile, &now))
            .collect();
        let mut conn = self.lock()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for row in &rows {
                diesel::replace_into(profiles::table).values(row).execute(conn)?;
            }
            Ok(())
        })
        .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        Ok(())
    }

    /// Handles whose cache entry is absent or older than `ttl`.
    pub fn find_missing(
        &self,
        handles: &[String],
        ttl: Duration,
    ) -> Result<Vec<String>, SkymarshalError> {
        let fresh = self.get_profiles_by_handle(handles, ttl)?;
        Ok(handles
            .iter()
            .filter(|handle| !fresh.contains_key(*handle))
            .cloned()
            .collect())
    }

    pub fn upsert_posts(
        &self,
        author_handle: &str,
        items: &[ContentItem],
    ) -> Result<(), SkymarshalError> {
        if items.is_empty() {
            return Ok(());
        }
        let rows: Vec<PostRow> = items
            .iter()
            .map(|item| PostRow {
                uri: item.uri.clone(),
                cid: Some(item.cid.clone()),
                author_handle: Some(author_handle.to_string()),
                text: item.text.clone(),
                created_at: item.created_at.clone(),
                like_count: item.like_count as i64,
                reply_count: item.reply_count as i64,
                repost_count: item.repost_count as i64,
                raw_data: serde_json::to_string(&item.extra).ok(),
            })
            .collect();
        let mut conn = self.lock()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for row in &rows {
                diesel::replace_into(posts::table).values(row).execute(conn)?;
            }
            Ok(())
        })
        .map_err(|error| SkymarshalError::Storage(error.to_string()))?;
        Ok(())
    }

    pub fn posts_for_author(&self, author_handle: &str) -> Result<Vec<PostRow>, SkymarshalError> {
        let mut conn = self.lock()?;
        posts::table
            .filter(posts::authorHandle.eq(author_handle))
            .order(posts::createdAt.desc())
            .load(&mut *conn)
            .map_err(|error| SkymarshalError::Storage(error.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SqliteConnection>, SkymarshalError> {
        self.conn
            .lock()
            .map_err(|_| SkymarshalError::Internal("profile cache mutex poisoned".to_string()))
    }
}

/// TTL used for profile staleness, derived from the settings value in days.
pub fn ttl_days(days: i64) -> Duration {
    Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skymarshal_core::models::ContentKind;

    fn profile(did: &str, handle: &str, followers: i64) -> Profile {
        Profile {
            did: did.to_string(),
            handle: handle.to_string(),
            display_name: Some(format!("Name {handle}")),
            description: None,
            followers_count: followers,
            following_count: 10,
            posts_count: 5,
            avatar: None,
        }
    }

    fn open_cache(dir: &Path) -> ProfileCache {
        ProfileCache::open(&dir.join(PROFILE_CACHE_FILE)).unwrap()
    }

    #[test]
    fn test_upsert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(dir.path());
        let alice = profile("did:plc:alice", "alice.bsky.social", 42);
        cache.upsert_profiles(&[alice.clone()]).unwrap();

        let found = cache
            .get_profiles(&["did:plc:alice".to_string()], ttl_days(14))
            .unwrap();
        assert_eq!(found.get("did:plc:alice"), Some(&alice));
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(dir.path());
        cache
            .upsert_profiles(&[profile("did:plc:alice", "alice.bsky.social", 42)])
            .unwrap();
        cache
            .upsert_profiles(&[profile("did:plc:alice", "alice.bsky.social", 99)])
            .unwrap();

        let found = cache
            .get_profiles(&["did:plc:alice".to_string()], ttl_days(14))
            .unwrap();
        assert_eq!(found["did:plc:alice"].followers_count, 99);
    }

    #[test]
    fn test_find_missing_reports_absent_handles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(dir.path());
        cache
            .upsert_profiles(&[profile("did:plc:alice", "alice.bsky.social", 1)])
            .unwrap();

        let missing = cache
            .find_missing(
                &[
                    "alice.bsky.social".to_string(),
                    "ghost.bsky.social".to_string(),
                ],
                ttl_days(14),
            )
            .unwrap();
        assert_eq!(missing, vec!["ghost.bsky.social".to_string()]);
    }

    #[test]
    fn test_zero_ttl_marks_everything_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(dir.path());
        cache
            .upsert_profiles(&[profile("did:plc:alice", "alice.bsky.social", 1)])
            .unwrap();

        // With a negative TTL every row is older than allowed.
        let found = cache
            .get_profiles(&["did:plc:alice".to_string()], Duration::seconds(-1))
            .unwrap();
        assert!(found.is_empty());
        let missing = cache
            .find_missing(&["alice.bsky.social".to_string()], Duration::seconds(-1))
            .unwrap();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_posts_round_trip_by_author() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_cache(dir.path());
        let mut item = ContentItem::new(
            "at://did:plc:alice/app.bsky.feed.post/1".into(),
            "c1".into(),
            ContentKind::Post,
        );
        item.text = Some("cached post".into());
        item.like_count = 7;
        cache.upsert_posts("alice.bsky.social", &[item]).unwrap();

        let rows = cache.posts_for_author("alice.bsky.social").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].like_count, 7);
        assert_eq!(rows[0].text.as_deref(), Some("cached post"));
        assert!(cache.posts_for_author("bob.bsky.social").unwrap().is_empty());
    }
}
