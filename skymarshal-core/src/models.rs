use chrono::{DateTime, Utc};
use serde_json::Value;
use skymarshal_common::time::parse_datetime;

pub const COLLECTION_POST: &str = "app.bsky.feed.post";
pub const COLLECTION_LIKE: &str = "app.bsky.feed.like";
pub const COLLECTION_REPOST: &str = "app.bsky.feed.repost";
pub const COLLECTION_FOLLOW: &str = "app.bsky.graph.follow";

/// What a normalized record is. Replies are distinguished from posts at
/// ingestion time by the presence of a `reply` field on the record, never by
/// re-testing strings downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Reply,
    Repost,
    Like,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Reply => "reply",
            ContentKind::Repost => "repost",
            ContentKind::Like => "like",
        }
    }
}

/// The retained slice of a record's raw data. A closed struct rather than a
/// free-form map so a typo'd key cannot slip in elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemExtra {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_like_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_repost_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_reply_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposted_by: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Value>,
}

impl ItemExtra {
    pub fn is_empty(&self) -> bool {
        self == &ItemExtra::default()
    }
}

pub fn calculate_engagement_score(likes: u64, reposts: u64, replies: u64) -> f64 {
    likes as f64 + 2.0 * reposts as f64 + 2.5 * replies as f64
}

/// Normalized view of one repo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub uri: String,
    pub cid: String,
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default, rename = "raw_data", skip_serializing_if = "ItemExtra::is_empty")]
    pub extra: ItemExtra,
}

impl ContentItem {
    pub fn new(uri: String, cid: String, kind: ContentKind) -> Self {
        ContentItem {
            uri,
            cid,
            kind,
            text: None,
            created_at: None,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            engagement_score: 0.0,
            extra: ItemExtra::default(),
        }
    }

    pub fn update_engagement_score(&mut self) {
        self.engagement_score =
            calculate_engagement_score(self.like_count, self.repost_count, self.reply_count);
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_datetime)
    }

    pub fn has_media(&self) -> bool {
        self.extra.embed.is_some()
    }
}

pub fn bulk_update_engagement_scores(items: &mut [ContentItem]) {
    for item in items {
        item.update_engagement_score();
    }
}

/// Content-type selector for search; `Replies` and `Comments` are aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTypeFilter {
    #[default]
    All,
    Posts,
    Replies,
    Comments,
    Reposts,
    Likes,
}

impl ContentTypeFilter {
    pub fn matches(&self, kind: ContentKind) -> bool {
        match self {
            ContentTypeFilter::All => true,
            ContentTypeFilter::Posts => kind == ContentKind::Post,
            ContentTypeFilter::Replies | ContentTypeFilter::Comments => {
                kind == ContentKind::Reply
            }
            ContentTypeFilter::Reposts => kind == ContentKind::Repost,
            ContentTypeFilter::Likes => kind == ContentKind::Like,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Newest,
    Oldest,
    EngagementDesc,
    EngagementAsc,
    LikesDesc,
    RepliesDesc,
    RepostsDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOrder {
    #[default]
    Newest,
    Oldest,
}

/// Immutable search request. Bounds are inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub content_type: ContentTypeFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub min_likes: u64,
    pub max_likes: u64,
    pub min_reposts: u64,
    pub max_reposts: u64,
    pub min_replies: u64,
    pub max_replies: u64,
    pub min_engagement: f64,
    pub max_engagement: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_handle_contains: Option<String>,
    pub sort: SortMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        SearchFilters {
            keywords: None,
            content_type: ContentTypeFilter::All,
            start_date: None,
            end_date: None,
            min_likes: 0,
            max_likes: u64::MAX,
            min_reposts: 0,
            max_reposts: u64::MAX,
            min_replies: 0,
            max_replies: u64::MAX,
            min_engagement: 0.0,
            max_engagement: f64::INFINITY,
            subject_contains: None,
            subject_handle_contains: None,
            sort: SortMode::Newest,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub posts: usize,
    pub replies: usize,
    pub likes: usize,
    pub reposts: usize,
    pub total: usize,
}

impl ContentSummary {
    pub fn of(items: &[ContentItem]) -> Self {
        let mut summary = ContentSummary {
            total: items.len(),
            ..ContentSummary::default()
        };
        for item in items {
            match item.kind {
                ContentKind::Post => summary.posts += 1,
                ContentKind::Reply => summary.replies += 1,
                ContentKind::Like => summary.likes += 1,
                ContentKind::Repost => summary.reposts += 1,
            }
        }
        summary
    }
}

fn default_download_limit() -> usize {
    500
}
fn default_categories() -> Vec<String> {
    vec!["posts".to_string(), "likes".to_string(), "reposts".to_string()]
}
fn default_records_page_size() -> usize {
    100
}
fn default_hydrate_batch_size() -> usize {
    25
}
fn default_category_workers() -> usize {
    3
}
fn default_file_list_page_size() -> usize {
    10
}
fn default_high_engagement_threshold() -> f64 {
    20.0
}
fn default_interaction_detail_limit() -> usize {
    100
}
fn default_network_workers() -> usize {
    8
}
fn default_max_followers() -> usize {
    500
}
fn default_max_following() -> usize {
    500
}
fn default_profile_cache_ttl_days() -> i64 {
    14
}

/// Durable user preferences, persisted as `settings.json` under the storage
/// root. Unknown keys in the file are ignored; missing keys fall back to the
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub download_limit_default: usize,
    pub default_categories: Vec<String>,
    pub records_page_size: usize,
    pub hydrate_batch_size: usize,
    pub category_workers: usize,
    pub file_list_page_size: usize,
    pub high_engagement_threshold: f64,
    pub use_subject_engagement_for_reposts: bool,
    pub fetch_order: FetchOrder,
    pub interaction_detail_limit: usize,
    pub network_workers: usize,
    pub max_followers: usize,
    pub max_following: usize,
    pub profile_cache_ttl_days: i64,
    /// Runtime average, recomputed after loads; not meaningful to persist
    /// but harmless when it is.
    pub avg_likes_per_post: f64,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            download_limit_default: default_download_limit(),
            default_categories: default_categories(),
            records_page_size: default_records_page_size(),
            hydrate_batch_size: default_hydrate_batch_size(),
            category_workers: default_category_workers(),
            file_list_page_size: default_file_list_page_size(),
            high_engagement_threshold: default_high_engagement_threshold(),
            use_subject_engagement_for_reposts: false,
            fetch_order: FetchOrder::Newest,
            interaction_detail_limit: default_interaction_detail_limit(),
            network_workers: default_network_workers(),
            max_followers: default_max_followers(),
            max_following: default_max_following(),
            profile_cache_ttl_days: default_profile_cache_ttl_days(),
            avg_likes_per_post: 0.0,
        }
    }
}

/// Cached actor profile, the unit the profile cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub did: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&skymarshal_lexicon::app::bsky::actor::ProfileViewDetailed> for Profile {
    fn from(view: &skymarshal_lexicon::app::bsky::actor::ProfileViewDetailed) -> Self {
        Profile {
            did: view.did.clone(),
            handle: view.handle.clone(),
            display_name: view.display_name.clone(),
            description: view.description.clone(),
            followers_count: view.followers_count.unwrap_or(0) as i64,
            following_count: view.follows_count.unwrap_or(0) as i64,
            posts_count: view.posts_count.unwrap_or(0) as i64,
            avatar: view.avatar.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_score_formula() {
        assert_eq!(calculate_engagement_score(0, 0, 0), 0.0);
        assert_eq!(calculate_engagement_score(3, 2, 2), 12.0);
        assert_eq!(calculate_engagement_score(1, 0, 1), 3.5);
    }

    #[test]
    fn test_update_engagement_score() {
        let mut item = ContentItem::new(
            "at://did:plc:a/app.bsky.feed.post/1".into(),
            "c1".into(),
            ContentKind::Post,
        );
        item.like_count = 4;
        item.repost_count = 1;
        item.reply_count = 2;
        item.update_engagement_score();
        assert_eq!(item.engagement_score, 11.0);
    }

    #[test]
    fn test_content_type_filter_aliases() {
        assert!(ContentTypeFilter::Replies.matches(ContentKind::Reply));
        assert!(ContentTypeFilter::Comments.matches(ContentKind::Reply));
        assert!(!ContentTypeFilter::Comments.matches(ContentKind::Post));
        assert!(ContentTypeFilter::All.matches(ContentKind::Like));
    }

    #[test]
    fn test_summary_counts() {
        let mut items = Vec::new();
        for (kind, n) in [
            (ContentKind::Post, 3),
            (ContentKind::Like, 2),
            (ContentKind::Repost, 1),
        ] {
            for i in 0..n {
                items.push(ContentItem::new(
                    format!("at://did:plc:a/x/{}{i}", kind.as_str()),
                    "c".into(),
                    kind,
                ));
            }
        }
        let summary = ContentSummary::of(&items);
        assert_eq!(summary.posts, 3);
        assert_eq!(summary.likes, 2);
        assert_eq!(summary.reposts, 1);
        assert_eq!(summary.replies, 0);
        assert_eq!(summary.total, 6);
    }

    #[test]
    fn test_content_item_json_round_trip() {
        let mut item = ContentItem::new(
            "at://did:plc:a/app.bsky.feed.like/1".into(),
            "c1".into(),
            ContentKind::Like,
        );
        item.extra.subject_uri = Some("at://did:plc:b/app.bsky.feed.post/9".into());
        item.created_at = Some("2024-11-13T23:19:36.449Z".into());

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"content_type\":\"like\""));
        let back: ContentItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_user_settings_defaults_and_unknown_keys() {
        let settings: UserSettings =
            serde_json::from_str("{\"download_limit_default\":250,\"obsolete_key\":true}")
                .unwrap();
        assert_eq!(settings.download_limit_default, 250);
        assert_eq!(settings.hydrate_batch_size, 25);
        assert_eq!(settings.fetch_order, FetchOrder::Newest);
    }
}
