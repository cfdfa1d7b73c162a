use crate::models::{
    bulk_update_engagement_scores, ContentItem, ContentKind, FetchOrder, UserSettings,
    COLLECTION_LIKE, COLLECTION_POST, COLLECTION_REPOST,
};
use serde_json::Value;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_lexicon::app::bsky::feed::{Like, Post, Repost};
use skymarshal_lexicon::com::atproto::repo::Record;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Record categories the exporter downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Posts,
    Likes,
    Reposts,
}

impl Category {
    pub fn collection(&self) -> &'static str {
        match self {
            Category::Posts => COLLECTION_POST,
            Category::Likes => COLLECTION_LIKE,
            Category::Reposts => COLLECTION_REPOST,
        }
    }

    pub fn parse(name: &str) -> Option<Category> {
        match name.trim().to_lowercase().as_str() {
            "posts" | "post" => Some(Category::Posts),
            "likes" | "like" => Some(Category::Likes),
            "reposts" | "repost" => Some(Category::Reposts),
            _ => None,
        }
    }

    pub fn all() -> HashSet<Category> {
        HashSet::from([Category::Posts, Category::Likes, Category::Reposts])
    }
}

/// One record out of a decoded CAR archive.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub collection: String,
    pub rkey: String,
    pub cid: String,
    pub record: Value,
}

/// The CAR binary format is a collaborator: implementations turn repo
/// archive bytes into `(collection, rkey, record)` triples and the importer
/// treats them exactly like live-export records.
pub trait CarDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<DecodedRecord>, SkymarshalError>;
}

/// Convert one raw record into a normalized item. Unknown or malformed
/// records yield `None` and are skipped by the importers.
pub fn record_to_item(uri: &str, cid: &str, collection: &str, value: &Value) -> Option<ContentItem> {
    match collection {
        COLLECTION_POST => {
            let post: Post = serde_json::from_value(value.clone()).ok()?;
            let kind = if post.reply.is_some() {
                ContentKind::Reply
            } else {
                ContentKind::Post
            };
            let mut item = ContentItem::new(uri.to_string(), cid.to_string(), kind);
            item.text = Some(post.text);
            item.created_at = Some(post.created_at);
            item.extra.embed = post.embed;
            Some(item)
        }
        COLLECTION_LIKE => {
            let like: Like = serde_json::from_value(value.clone()).ok()?;
            let mut item = ContentItem::new(uri.to_string(), cid.to_string(), ContentKind::Like);
            item.created_at = Some(like.created_at);
            item.extra.subject_uri = Some(like.subject.uri);
            item.extra.subject_cid = Some(like.subject.cid);
            Some(item)
        }
        COLLECTION_REPOST => {
            let repost: Repost = serde_json::from_value(value.clone()).ok()?;
            let mut item = ContentItem::new(uri.to_string(), cid.to_string(), ContentKind::Repost);
            item.created_at = Some(repost.created_at);
            item.extra.subject_uri = Some(repost.subject.uri);
            item.extra.subject_cid = Some(repost.subject.cid);
            Some(item)
        }
        _ => None,
    }
}

fn records_to_items(records: &[Record]) -> Vec<ContentItem> {
    records
        .iter()
        .filter_map(|record| {
            let collection = skymarshal_common::syntax::RecordUri::parse(&record.uri)
                .ok()?
                .collection;
            record_to_item(&record.uri, &record.cid, &collection, &record.value)
        })
        .collect()
}

pub fn safe_file_stem(handle: &str) -> String {
    handle.replace('.', "_")
}

/// Downloads the authenticated user's records and materializes them as a
/// JSON export under `<storage>/json/<handle>.json`.
pub struct DataExporter {
    client: Arc<skymarshal_client::XrpcClient>,
    settings: UserSettings,
    json_dir: PathBuf,
    cars_dir: PathBuf,
    car_decoder: Option<Arc<dyn CarDecoder>>,
}

impl DataExporter {
    pub fn new(
        client: Arc<skymarshal_client::XrpcClient>,
        settings: UserSettings,
        storage_root: &Path,
        car_decoder: Option<Arc<dyn CarDecoder>>,
    ) -> Self {
        DataExporter {
            client,
            settings,
            json_dir: storage_root.join("json"),
            cars_dir: storage_root.join("cars"),
            car_decoder,
        }
    }

    pub fn export_path(&self, handle: &str) -> PathBuf {
        self.json_dir.join(format!("{}.json", safe_file_stem(handle)))
    }

    /// Strategy 1: live export through listRecords, one bounded worker per
    /// selected category.
    pub async fn export_via_api(
        &self,
        handle: &str,
        did: &str,
        categories: &HashSet<Category>,
        limit: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, SkymarshalError> {
        let semaphore = Arc::new(Semaphore::new(self.settings.category_workers.max(1)));
        let mut tasks: JoinSet<Result<Vec<ContentItem>, SkymarshalError>> = JoinSet::new();
        for category in categories.iter().copied() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let did = did.to_string();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SkymarshalError::Internal(e.to_string()))?;
                let records = client
                    .list_all_records(&did, category.collection(), Some(limit))
                    .await?;
                Ok(records_to_items(&records))
            });
        }

        let total = categories.len();
        let mut done = 0;
        let mut items: Vec<ContentItem> = Vec::new();
        let mut first_error: Option<SkymarshalError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(batch)) => {
                    items.extend(batch);
                    done += 1;
                    progress.report("Downloading records", done, total);
                }
                Ok(Err(error)) => {
                    if error.is_auth() {
                        return Err(error);
                    }
                    tracing::warn!("category download failed: {error}");
                    first_error.get_or_insert(error);
                }
                Err(error) => {
                    first_error.get_or_insert(SkymarshalError::Internal(error.to_string()));
                }
            }
        }
        if items.is_empty() {
            if let Some(error) = first_error {
                return Err(error);
            }
        }
        self.save_export(handle, items)
    }

    /// Strategy 2: reuse the most recent cached export if one exists.
    pub fn find_existing_export(&self, handle: &str) -> Option<PathBuf> {
        let primary = self.export_path(handle);
        if primary.exists() {
            return Some(primary);
        }
        let prefix = format!("{}_", safe_file_stem(handle));
        let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
        let entries = std::fs::read_dir(&self.json_dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        candidates.push((modified, path));
                    }
                }
            }
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.into_iter().next().map(|(_, path)| path)
    }

    /// Strategy 3: download a full CAR backup, decode it with the
    /// collaborator, and import the result. The backup file is removed once
    /// the import succeeds.
    pub async fn export_via_backup(
        &self,
        handle: &str,
        did: &str,
        categories: &HashSet<Category>,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, SkymarshalError> {
        if self.car_decoder.is_none() {
            return Err(SkymarshalError::Storage(
                "no CAR decoder is available for backup imports".to_string(),
            ));
        }
        progress.report("Downloading repository backup", 0, 1);
        let bytes = self.client.get_repo(did).await?;
        progress.report("Downloading repository backup", 1, 1);

        std::fs::create_dir_all(&self.cars_dir)?;
        let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let car_path = self
            .cars_dir
            .join(format!("{}-{timestamp}.car", safe_file_stem(handle)));
        std::fs::write(&car_path, &bytes)?;

        self.import_backup_file(&car_path, handle, did, categories)
    }

    /// Decode a CAR file on disk and replace the handle's export with its
    /// records. Deletes the CAR after a successful import.
    pub fn import_backup_file(
        &self,
        car_path: &Path,
        handle: &str,
        did: &str,
        categories: &HashSet<Category>,
    ) -> Result<PathBuf, SkymarshalError> {
        let decoder = self.car_decoder.as_ref().ok_or_else(|| {
            SkymarshalError::Storage("no CAR decoder is available for backup imports".to_string())
        })?;
        let bytes = std::fs::read(car_path)?;
        let decoded = decoder.decode(&bytes)?;

        let wanted: HashSet<&'static str> =
            categories.iter().map(|category| category.collection()).collect();
        let items: Vec<ContentItem> = decoded
            .iter()
            .filter(|record| wanted.contains(record.collection.as_str()))
            .filter_map(|record| {
                let uri = format!("at://{did}/{}/{}", record.collection, record.rkey);
                record_to_item(&uri, &record.cid, &record.collection, &record.record)
            })
            .collect();

        let path = self.save_export(handle, items)?;
        if let Err(error) = std::fs::remove_file(car_path) {
            tracing::warn!("could not remove imported backup {car_path:?}: {error}");
        }
        Ok(path)
    }

    /// Sort per the configured fetch order and rewrite the export atomically.
    pub fn save_export(
        &self,
        handle: &str,
        mut items: Vec<ContentItem>,
    ) -> Result<PathBuf, SkymarshalError> {
        bulk_update_engagement_scores(&mut items);
        match self.settings.fetch_order {
            FetchOrder::Newest => items.sort_by(|a, b| b.created().cmp(&a.created())),
            FetchOrder::Oldest => items.sort_by(|a, b| a.created().cmp(&b.created())),
        }

        std::fs::create_dir_all(&self.json_dir)?;
        let path = self.export_path(handle);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&items)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!("exported {} items for {handle}", items.len());
        Ok(path)
    }

    pub fn load_exported_data(&self, path: &Path) -> Result<Vec<ContentItem>, SkymarshalError> {
        let bytes = std::fs::read(path)?;
        let mut items: Vec<ContentItem> = serde_json::from_slice(&bytes)?;
        bulk_update_engagement_scores(&mut items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skymarshal_client::XrpcClient;
    use skymarshal_common::progress::NoProgress;

    struct FakeDecoder {
        records: Vec<DecodedRecord>,
    }

    impl CarDecoder for FakeDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<Vec<DecodedRecord>, SkymarshalError> {
            Ok(self.records.clone())
        }
    }

    fn exporter_with(
        dir: &Path,
        decoder: Option<Arc<dyn CarDecoder>>,
    ) -> DataExporter {
        DataExporter::new(
            Arc::new(XrpcClient::new("http://localhost:1")),
            UserSettings::default(),
            dir,
            decoder,
        )
    }

    #[test]
    fn test_record_to_item_post_vs_reply() {
        let post_value = json!({
            "$type": "app.bsky.feed.post",
            "createdAt": "2024-11-13T23:19:36.449Z",
            "text": "standalone thought"
        });
        let item = record_to_item(
            "at://did:plc:a/app.bsky.feed.post/1",
            "c1",
            COLLECTION_POST,
            &post_value,
        )
        .unwrap();
        assert_eq!(item.kind, ContentKind::Post);
        assert_eq!(item.text.as_deref(), Some("standalone thought"));

        let reply_value = json!({
            "$type": "app.bsky.feed.post",
            "createdAt": "2024-11-13T23:20:00.000Z",
            "text": "agreed!",
            "reply": {
                "root": {"uri": "at://did:plc:b/app.bsky.feed.post/9", "cid": "c9"},
                "parent": {"uri": "at://did:plc:b/app.bsky.feed.post/9", "cid": "c9"}
            }
        });
        let item = record_to_item(
            "at://did:plc:a/app.bsky.feed.post/2",
            "c2",
            COLLECTION_POST,
            &reply_value,
        )
        .unwrap();
        assert_eq!(item.kind, ContentKind::Reply);
    }

    #[test]
    fn test_record_to_item_like_has_subject_and_no_text() {
        let like_value = json!({
            "$type": "app.bsky.feed.like",
            "createdAt": "2024-11-13T23:19:36.449Z",
            "subject": {"uri": "at://did:plc:b/app.bsky.feed.post/9", "cid": "c9"}
        });
        let item = record_to_item(
            "at://did:plc:a/app.bsky.feed.like/1",
            "c1",
            COLLECTION_LIKE,
            &like_value,
        )
        .unwrap();
        assert_eq!(item.kind, ContentKind::Like);
        assert!(item.text.is_none());
        assert_eq!(
            item.extra.subject_uri.as_deref(),
            Some("at://did:plc:b/app.bsky.feed.post/9")
        );
    }

    #[test]
    fn test_record_to_item_rejects_unknown_collection() {
        assert!(record_to_item(
            "at://did:plc:a/app.bsky.graph.block/1",
            "c1",
            "app.bsky.graph.block",
            &json!({}),
        )
        .is_none());
    }

    #[test]
    fn test_export_round_trip_preserves_items() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter_with(dir.path(), None);

        let mut item = ContentItem::new(
            "at://did:plc:a/app.bsky.feed.post/1".into(),
            "c1".into(),
            ContentKind::Post,
        );
        item.text = Some("hello".into());
        item.created_at = Some("2024-11-13T23:19:36.449Z".into());
        item.like_count = 3;
        item.update_engagement_score();

        let path = exporter
            .save_export("alice.bsky.social", vec![item.clone()])
            .unwrap();
        assert_eq!(path, dir.path().join("json/alice_bsky_social.json"));

        let loaded = exporter.load_exported_data(&path).unwrap();
        assert_eq!(loaded, vec![item]);
    }

    #[test]
    fn test_find_existing_export_prefers_exact_name() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter_with(dir.path(), None);
        std::fs::create_dir_all(dir.path().join("json")).unwrap();
        std::fs::write(dir.path().join("json/alice_bsky_social.json"), "[]").unwrap();
        std::fs::write(dir.path().join("json/alice_bsky_social_20240101.json"), "[]").unwrap();

        let found = exporter.find_existing_export("alice.bsky.social").unwrap();
        assert!(found.ends_with("alice_bsky_social.json"));
    }

    #[test]
    fn test_find_existing_export_falls_back_to_suffixed() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter_with(dir.path(), None);
        std::fs::create_dir_all(dir.path().join("json")).unwrap();
        std::fs::write(dir.path().join("json/alice_bsky_social_backup.json"), "[]").unwrap();

        let found = exporter.find_existing_export("alice.bsky.social").unwrap();
        assert!(found.ends_with("alice_bsky_social_backup.json"));
        assert!(exporter.find_existing_export("bob.bsky.social").is_none());
    }

    #[test]
    fn test_import_backup_file_converts_and_removes_car() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = FakeDecoder {
            records: vec![
                DecodedRecord {
                    collection: COLLECTION_POST.to_string(),
                    rkey: "3k1".to_string(),
                    cid: "c1".to_string(),
                    record: json!({
                        "$type": "app.bsky.feed.post",
                        "createdAt": "2024-11-13T23:19:36.449Z",
                        "text": "from backup"
                    }),
                },
                DecodedRecord {
                    collection: "app.bsky.graph.follow".to_string(),
                    rkey: "3k2".to_string(),
                    cid: "c2".to_string(),
                    record: json!({"subject": "did:plc:x", "createdAt": "2024-01-01T00:00:00Z"}),
                },
            ],
        };
        let exporter = exporter_with(dir.path(), Some(Arc::new(decoder)));

        std::fs::create_dir_all(dir.path().join("cars")).unwrap();
        let car_path = dir.path().join("cars/alice-20240101.car");
        std::fs::write(&car_path, b"not a real car").unwrap();

        let path = exporter
            .import_backup_file(&car_path, "alice.bsky.social", "did:plc:a", &Category::all())
            .unwrap();
        let items = exporter.load_exported_data(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uri, "at://did:plc:a/app.bsky.feed.post/3k1");
        assert_eq!(items[0].text.as_deref(), Some("from backup"));
        // The transient backup is gone once imported.
        assert!(!car_path.exists());
    }

    #[test]
    fn test_import_backup_without_decoder_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter_with(dir.path(), None);
        let car_path = dir.path().join("x.car");
        std::fs::write(&car_path, b"bytes").unwrap();
        let error = exporter
            .import_backup_file(&car_path, "a.bsky.social", "did:plc:a", &Category::all())
            .unwrap_err();
        assert!(matches!(error, SkymarshalError::Storage(_)));
    }

    #[tokio::test]
    async fn test_export_via_api_uses_progress() {
        // No live server: every category fails with a network error, which
        // surfaces once nothing was downloaded.
        let dir = tempfile::tempdir().unwrap();
        let exporter = exporter_with(dir.path(), None);
        let result = exporter
            .export_via_api(
                "alice.bsky.social",
                "did:plc:a",
                &Category::all(),
                10,
                &NoProgress,
            )
            .await;
        assert!(result.is_err());
    }
}
