use crate::exporter::{Category, DataExporter};
use crate::models::{bulk_update_engagement_scores, ContentItem, ContentKind, ContentSummary};
use skymarshal_client::XrpcClient;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::progress::ProgressReporter;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory index of a user's normalized records, loaded through the
/// exporter and hydrated with engagement counts on demand.
pub struct ContentStore {
    client: Arc<XrpcClient>,
    settings: crate::models::UserSettings,
    exporter: DataExporter,
    prefer_car_backup: bool,
    cache: RwLock<HashMap<String, Vec<ContentItem>>>,
    files: RwLock<HashMap<String, PathBuf>>,
}

impl ContentStore {
    pub fn new(
        client: Arc<XrpcClient>,
        settings: crate::models::UserSettings,
        storage_root: &std::path::Path,
        car_decoder: Option<Arc<dyn crate::exporter::CarDecoder>>,
    ) -> Self {
        let prefer_car_backup =
            skymarshal_common::env::env_bool("SKYMARSHAL_USE_CAR").unwrap_or(false);
        ContentStore {
            exporter: DataExporter::new(
                Arc::clone(&client),
                settings.clone(),
                storage_root,
                car_decoder,
            ),
            client,
            settings,
            prefer_car_backup,
            cache: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn exporter(&self) -> &DataExporter {
        &self.exporter
    }

    /// Load the user's content, trying a live export, then a cached export
    /// file, then a CAR backup import. Idempotent per handle unless
    /// `force_refresh` is set.
    pub async fn ensure_loaded(
        &self,
        handle: &str,
        did: &str,
        categories: Option<HashSet<Category>>,
        limit: Option<usize>,
        force_refresh: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ContentItem>, SkymarshalError> {
        if !force_refresh {
            if let Some(items) = self.cache.read().await.get(handle) {
                return Ok(items.clone());
            }
        }

        let limit = limit.unwrap_or(self.settings.download_limit_default);
        let categories = categories.unwrap_or_else(Category::all);

        let mut export_error: Option<SkymarshalError> = None;
        let mut export_path: Option<PathBuf> = None;

        if !self.prefer_car_backup {
            match self
                .exporter
                .export_via_api(handle, did, &categories, limit, progress)
                .await
            {
                Ok(path) => export_path = Some(path),
                Err(error) => {
                    tracing::warn!("live export failed for {handle}: {error}");
                    export_error = Some(error);
                }
            }
        }

        if export_path.is_none() {
            export_path = self.exporter.find_existing_export(handle);
        }

        if export_path.is_none() {
            match self
                .exporter
                .export_via_backup(handle, did, &categories, progress)
                .await
            {
                Ok(path) => export_path = Some(path),
                Err(error) => {
                    tracing::warn!("backup import failed for {handle}: {error}");
                    export_error.get_or_insert(error);
                }
            }
        }

        let Some(path) = export_path else {
            return Err(export_error.unwrap_or_else(|| {
                SkymarshalError::Storage(format!("could not export data for {handle}"))
            }));
        };

        let mut items = self.exporter.load_exported_data(&path)?;
        bulk_update_engagement_scores(&mut items);

        self.cache
            .write()
            .await
            .insert(handle.to_string(), items.clone());
        self.files.write().await.insert(handle.to_string(), path);
        Ok(items)
    }

    /// Fill engagement counts for posts/replies (and subject counts for
    /// likes/reposts) via batched getPosts lookups. With `collect_details`
    /// the raw interaction samples are attached as well, capped by
    /// `interaction_detail_limit`.
    pub async fn hydrate(
        &self,
        handle: &str,
        collect_details: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<(), SkymarshalError> {
        let mut items = match self.cache.read().await.get(handle) {
            Some(items) => items.clone(),
            None => return Ok(()),
        };

        // Own posts and replies are hydrated by URI; likes and reposts are
        // hydrated through their subject post.
        let mut wanted: Vec<String> = Vec::new();
        for item in &items {
            match item.kind {
                ContentKind::Post | ContentKind::Reply => wanted.push(item.uri.clone()),
                ContentKind::Like | ContentKind::Repost => {
                    if let Some(subject) = &item.extra.subject_uri {
                        wanted.push(subject.clone());
                    }
                }
            }
        }
        wanted.sort();
        wanted.dedup();

        let batch_size = self.settings.hydrate_batch_size.clamp(1, 25);
        let total = wanted.len();
        let mut counts: HashMap<String, (u64, u64, u64)> = HashMap::new();
        for (index, batch) in wanted.chunks(batch_size).enumerate() {
            let views = match self.client.get_posts(batch).await {
                Ok(views) => views,
                Err(error) if error.is_auth() => return Err(error),
                Err(error) => {
                    tracing::warn!("hydration batch failed: {error}");
                    continue;
                }
            };
            for view in views {
                counts.insert(
                    view.uri.clone(),
                    (
                        view.like_count.unwrap_or(0) as u64,
                        view.repost_count.unwrap_or(0) as u64,
                        view.reply_count.unwrap_or(0) as u64,
                    ),
                );
            }
            progress.report(
                "Refreshing engagement",
                ((index + 1) * batch_size).min(total),
                total,
            );
        }

        for item in &mut items {
            match item.kind {
                ContentKind::Post | ContentKind::Reply => {
                    if let Some((likes, reposts, replies)) = counts.get(&item.uri) {
                        item.like_count = *likes;
                        item.repost_count = *reposts;
                        item.reply_count = *replies;
                    }
                }
                ContentKind::Like | ContentKind::Repost => {
                    if let Some(subject) = &item.extra.subject_uri {
                        if let Some((likes, reposts, replies)) = counts.get(subject) {
                            item.extra.subject_like_count = Some(*likes);
                            item.extra.subject_repost_count = Some(*reposts);
                            item.extra.subject_reply_count = Some(*replies);
                        }
                    }
                }
            }
        }

        if collect_details {
            self.collect_interaction_details(&mut items, progress).await?;
        }

        bulk_update_engagement_scores(&mut items);

        // Persist so a later session sees the hydrated counts.
        if let Err(error) = self.exporter.save_export(handle, items.clone()) {
            tracing::warn!("could not persist hydrated export for {handle}: {error}");
        }
        self.cache.write().await.insert(handle.to_string(), items);
        Ok(())
    }

    /// Attach raw likes / reposted-by / quotes / replies samples to posts
    /// and replies. Per-item failures are logged, never fatal.
    async fn collect_interaction_details(
        &self,
        items: &mut [ContentItem],
        progress: &dyn ProgressReporter,
    ) -> Result<(), SkymarshalError> {
        let cap = self.settings.interaction_detail_limit;
        let targets: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches!(item.kind, ContentKind::Post | ContentKind::Reply))
            .map(|(index, _)| index)
            .collect();
        let total = targets.len();
        for (done, index) in targets.into_iter().enumerate() {
            let uri = items[index].uri.clone();

            match self.client.get_all_likes(&uri, cap).await {
                Ok(likes) => {
                    items[index].extra.likes = Some(serde_json::to_value(likes)?);
                }
                Err(error) if error.is_auth() => return Err(error),
                Err(error) => tracing::warn!("likes detail failed for {uri}: {error}"),
            }
            match self.client.get_all_reposted_by(&uri, cap).await {
                Ok(reposted_by) => {
                    items[index].extra.reposted_by = Some(serde_json::to_value(reposted_by)?);
                }
                Err(error) if error.is_auth() => return Err(error),
                Err(error) => tracing::warn!("repost detail failed for {uri}: {error}"),
            }
            match self.client.get_all_quotes(&uri, cap).await {
                Ok(quotes) => {
                    items[index].extra.quotes = Some(serde_json::to_value(quotes)?);
                }
                Err(error) if error.is_auth() => return Err(error),
                Err(error) => tracing::warn!("quote detail failed for {uri}: {error}"),
            }
            match self.client.get_post_thread(&uri, 2).await {
                Ok(thread) => {
                    let mut replies = Vec::new();
                    collect_reply_posts(&thread.thread, cap, &mut replies);
                    items[index].extra.replies = Some(serde_json::Value::Array(replies));
                }
                Err(error) if error.is_auth() => return Err(error),
                Err(error) => tracing::warn!("thread detail failed for {uri}: {error}"),
            }
            progress.report("Collecting interaction details", done + 1, total);
        }
        Ok(())
    }

    pub async fn summary(&self, handle: &str) -> ContentSummary {
        match self.cache.read().await.get(handle) {
            Some(items) => ContentSummary::of(items),
            None => ContentSummary::default(),
        }
    }

    pub async fn items(&self, handle: &str) -> Option<Vec<ContentItem>> {
        self.cache.read().await.get(handle).cloned()
    }

    pub async fn loaded_file(&self, handle: &str) -> Option<PathBuf> {
        self.files.read().await.get(handle).cloned()
    }

    /// Drop deleted URIs from the handle's cached items so subsequent
    /// searches and summaries reflect the deletion, and rewrite the export.
    pub async fn remove_uris(&self, handle: &str, uris: &[String]) {
        let removed: HashSet<&str> = uris.iter().map(|uri| uri.as_str()).collect();
        let mut cache = self.cache.write().await;
        if let Some(items) = cache.get_mut(handle) {
            items.retain(|item| !removed.contains(item.uri.as_str()));
            if let Err(error) = self.exporter.save_export(handle, items.clone()) {
                tracing::warn!("could not persist export after deletion: {error}");
            }
        }
    }

    /// Mean likes across cached posts/replies; feeds the engagement presets.
    pub async fn avg_likes_per_post(&self, handle: &str) -> f64 {
        match self.cache.read().await.get(handle) {
            Some(items) => {
                let engageable: Vec<&ContentItem> = items
                    .iter()
                    .filter(|item| matches!(item.kind, ContentKind::Post | ContentKind::Reply))
                    .collect();
                if engageable.is_empty() {
                    return 0.0;
                }
                let total: u64 = engageable.iter().map(|item| item.like_count).sum();
                total as f64 / engageable.len() as f64
            }
            None => 0.0,
        }
    }

    /// Test/import seam: place items directly into the per-handle cache.
    pub async fn seed(&self, handle: &str, items: Vec<ContentItem>) {
        self.cache.write().await.insert(handle.to_string(), items);
    }
}

/// Walk a getPostThread union generically, collecting reply post views.
fn collect_reply_posts(node: &serde_json::Value, cap: usize, out: &mut Vec<serde_json::Value>) {
    if out.len() >= cap {
        return;
    }
    let Some(replies) = node.get("replies").and_then(|r| r.as_array()) else {
        return;
    };
    for child in replies {
        if out.len() >= cap {
            return;
        }
        if let Some(post) = child.get("post") {
            out.push(post.clone());
        }
        collect_reply_posts(child, cap, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserSettings;
    use serde_json::json;

    fn store(dir: &std::path::Path) -> ContentStore {
        ContentStore::new(
            Arc::new(XrpcClient::new("http://localhost:1")),
            UserSettings::default(),
            dir,
            None,
        )
    }

    fn item(kind: ContentKind, rkey: &str, likes: u64) -> ContentItem {
        let mut item = ContentItem::new(
            format!("at://did:plc:self/{}/{rkey}", kind_collection(kind)),
            format!("cid-{rkey}"),
            kind,
        );
        item.like_count = likes;
        item.update_engagement_score();
        item
    }

    fn kind_collection(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Post | ContentKind::Reply => "app.bsky.feed.post",
            ContentKind::Like => "app.bsky.feed.like",
            ContentKind::Repost => "app.bsky.feed.repost",
        }
    }

    #[tokio::test]
    async fn test_summary_reflects_seeded_items() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .seed(
                "alice.bsky.social",
                vec![
                    item(ContentKind::Post, "1", 0),
                    item(ContentKind::Post, "2", 3),
                    item(ContentKind::Post, "3", 1),
                    item(ContentKind::Like, "4", 0),
                    item(ContentKind::Like, "5", 0),
                    item(ContentKind::Repost, "6", 0),
                ],
            )
            .await;
        let summary = store.summary("alice.bsky.social").await;
        assert_eq!(summary.posts, 3);
        assert_eq!(summary.likes, 2);
        assert_eq!(summary.reposts, 1);
        assert_eq!(summary.total, 6);
    }

    #[tokio::test]
    async fn test_remove_uris_updates_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .seed(
                "alice.bsky.social",
                vec![item(ContentKind::Post, "1", 0), item(ContentKind::Post, "2", 0)],
            )
            .await;
        store
            .remove_uris(
                "alice.bsky.social",
                &["at://did:plc:self/app.bsky.feed.post/1".to_string()],
            )
            .await;
        let summary = store.summary("alice.bsky.social").await;
        assert_eq!(summary.posts, 1);
        assert_eq!(summary.total, 1);
    }

    #[tokio::test]
    async fn test_ensure_loaded_reuses_existing_export() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        // A previous run's export is on disk; the live export fails (no
        // server), so the loader falls back to the cached file.
        std::fs::create_dir_all(dir.path().join("json")).unwrap();
        let items = vec![item(ContentKind::Post, "1", 5)];
        std::fs::write(
            dir.path().join("json/alice_bsky_social.json"),
            serde_json::to_vec(&items).unwrap(),
        )
        .unwrap();

        let loaded = store
            .ensure_loaded(
                "alice.bsky.social",
                "did:plc:self",
                None,
                None,
                false,
                &skymarshal_common::progress::NoProgress,
            )
            .await
            .unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].like_count, 5);

        // Second call hits the in-memory cache.
        let again = store
            .ensure_loaded(
                "alice.bsky.social",
                "did:plc:self",
                None,
                None,
                false,
                &skymarshal_common::progress::NoProgress,
            )
            .await
            .unwrap();
        assert_eq!(again, loaded);
    }

    #[tokio::test]
    async fn test_avg_likes_ignores_likes_and_reposts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .seed(
                "alice.bsky.social",
                vec![
                    item(ContentKind::Post, "1", 10),
                    item(ContentKind::Post, "2", 0),
                    item(ContentKind::Like, "3", 999),
                ],
            )
            .await;
        let avg = store.avg_likes_per_post("alice.bsky.social").await;
        assert!((avg - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collect_reply_posts_walks_nested_thread() {
        let thread = json!({
            "post": {"uri": "at://root"},
            "replies": [
                {"post": {"uri": "at://r1"}, "replies": [
                    {"post": {"uri": "at://r1a"}}
                ]},
                {"post": {"uri": "at://r2"}}
            ]
        });
        let mut out = Vec::new();
        collect_reply_posts(&thread, 10, &mut out);
        let uris: Vec<&str> = out.iter().filter_map(|p| p["uri"].as_str()).collect();
        assert_eq!(uris, vec!["at://r1", "at://r1a", "at://r2"]);

        let mut capped = Vec::new();
        collect_reply_posts(&thread, 2, &mut capped);
        assert_eq!(capped.len(), 2);
    }
}
