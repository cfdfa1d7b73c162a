use crate::models::{ContentItem, ContentKind, SearchFilters, SortMode, UserSettings};
use regex::Regex;
use skymarshal_client::XrpcClient;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_common::syntax::RecordUri;
use skymarshal_common::time::{parse_datetime, parse_end_of_day};
use std::collections::HashMap;

/// Below this many items the search runs silently; above it, progress is
/// reported to the caller's sink.
const PROGRESS_THRESHOLD: usize = 1000;
const PROGRESS_STRIDE: usize = 100;

/// One parsed keyword pattern.
#[derive(Debug)]
enum Matcher {
    /// `"exact phrase"`: case-sensitive substring.
    Exact(String),
    /// bare token: case-insensitive substring (held lowercased).
    Substring(String),
    /// `\bword\b`: case-insensitive whole-word match.
    WordBoundary(Regex),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Exact(phrase) => text.contains(phrase.as_str()),
            Matcher::Substring(token) => text.to_lowercase().contains(token.as_str()),
            Matcher::WordBoundary(regex) => regex.is_match(text),
        }
    }
}

#[derive(Debug, Default)]
struct CompiledPatterns {
    positive: Vec<Matcher>,
    negative: Vec<Matcher>,
    required: Vec<Matcher>,
}

impl CompiledPatterns {
    fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty() && self.required.is_empty()
    }

    /// An item passes when every negative fails, every required matches, and
    /// (if any plain positives exist) at least one of them matches.
    fn passes(&self, text: Option<&str>) -> bool {
        let Some(text) = text else {
            return self.positive.is_empty() && self.required.is_empty();
        };
        if self.negative.iter().any(|matcher| matcher.matches(text)) {
            return false;
        }
        if !self.required.iter().all(|matcher| matcher.matches(text)) {
            return false;
        }
        if self.positive.is_empty() {
            return true;
        }
        self.positive.iter().any(|matcher| matcher.matches(text))
    }
}

/// Parse one keyword into a matcher, applying the phrase / word-boundary /
/// plain sub-grammar.
fn compile_single(token: &str) -> Option<Matcher> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if token.len() > 2 && token.starts_with('"') && token.ends_with('"') {
        return Some(Matcher::Exact(token[1..token.len() - 1].to_string()));
    }
    if token.len() > 4 && token.starts_with("\\b") && token.ends_with("\\b") {
        let word = &token[2..token.len() - 2];
        let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
        return Regex::new(&pattern).ok().map(Matcher::WordBoundary);
    }
    Some(Matcher::Substring(token.to_lowercase()))
}

fn compile_patterns(keywords: &[String]) -> CompiledPatterns {
    let mut compiled = CompiledPatterns::default();
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            continue;
        }
        if let Some(rest) = keyword.strip_prefix('-') {
            if let Some(matcher) = compile_single(rest) {
                compiled.negative.push(matcher);
            }
            continue;
        }
        if let Some(rest) = keyword.strip_prefix('+') {
            if let Some(matcher) = compile_single(rest) {
                compiled.required.push(matcher);
            }
            continue;
        }
        if let Some(matcher) = compile_single(keyword) {
            compiled.positive.push(matcher);
        }
    }
    compiled
}

/// Predicate-based filter and sort over in-memory content. Pure except for
/// the optional subject-handle stage, whose DID resolution is supplied by
/// the caller.
pub struct SearchEngine {
    settings: UserSettings,
}

impl SearchEngine {
    pub fn new(settings: UserSettings) -> Self {
        SearchEngine { settings }
    }

    /// Filter, sort, and truncate. Returns the page plus the total number of
    /// matches before the limit was applied.
    pub fn search(
        &self,
        items: &[ContentItem],
        filters: &SearchFilters,
        progress: &dyn ProgressReporter,
    ) -> (Vec<ContentItem>, usize) {
        self.search_with_handles(items, filters, &HashMap::new(), progress)
    }

    /// Like [`search`](Self::search), with subject DIDs pre-resolved to
    /// handles for the subject-handle stage.
    pub fn search_with_handles(
        &self,
        items: &[ContentItem],
        filters: &SearchFilters,
        did_to_handle: &HashMap<String, String>,
        progress: &dyn ProgressReporter,
    ) -> (Vec<ContentItem>, usize) {
        let report = items.len() >= PROGRESS_THRESHOLD;

        // Stage 1: keywords.
        let patterns = filters
            .keywords
            .as_deref()
            .map(compile_patterns)
            .unwrap_or_default();
        let mut filtered: Vec<&ContentItem> = if patterns.is_empty() {
            items.iter().collect()
        } else {
            let mut kept = Vec::new();
            for (index, item) in items.iter().enumerate() {
                if patterns.passes(item.text.as_deref()) {
                    kept.push(item);
                }
                if report && (index + 1) % PROGRESS_STRIDE == 0 {
                    progress.report("Applying keyword filter", index + 1, items.len());
                }
            }
            if report {
                progress.report("Applying keyword filter", items.len(), items.len());
            }
            kept
        };

        // Stages 2 + 3: engagement bounds and date range.
        let start = filters.start_date.as_deref().and_then(parse_datetime);
        let end = filters.end_date.as_deref().and_then(parse_end_of_day);
        let total_criteria = filtered.len();
        let mut kept = Vec::with_capacity(filtered.len());
        for (index, item) in filtered.iter().enumerate() {
            if self.passes_criteria(item, filters, &start, &end) {
                kept.push(*item);
            }
            if report && (index + 1) % PROGRESS_STRIDE == 0 {
                progress.report("Evaluating filters", index + 1, total_criteria);
            }
        }
        if report {
            progress.report("Evaluating filters", total_criteria, total_criteria);
        }
        filtered = kept;

        // Stage 4: content type.
        filtered.retain(|item| filters.content_type.matches(item.kind));

        // Stage 5: subject URI substring (likes/reposts only).
        if let Some(subject) = &filters.subject_contains {
            let needle = subject.to_lowercase();
            filtered.retain(|item| match item.kind {
                ContentKind::Like | ContentKind::Repost => item
                    .extra
                    .subject_uri
                    .as_deref()
                    .map(|uri| uri.to_lowercase().contains(&needle))
                    .unwrap_or(false),
                _ => true,
            });
        }

        // Stage 6: subject handle substring (likes/reposts only).
        if let Some(subject_handle) = &filters.subject_handle_contains {
            let needle = subject_handle.to_lowercase();
            filtered.retain(|item| match item.kind {
                ContentKind::Like | ContentKind::Repost => item
                    .extra
                    .subject_uri
                    .as_deref()
                    .and_then(RecordUri::did_of)
                    .and_then(|did| did_to_handle.get(did))
                    .map(|handle| handle.to_lowercase().contains(&needle))
                    .unwrap_or(false),
                _ => true,
            });
        }

        let mut results: Vec<ContentItem> = filtered.into_iter().cloned().collect();
        sort_items(&mut results, filters.sort);

        let total = results.len();
        if let Some(limit) = filters.limit {
            results.truncate(limit);
        }
        (results, total)
    }

    /// Engagement counts for an item, honoring the subject-engagement switch
    /// for reposts.
    fn counts_for(&self, item: &ContentItem) -> (u64, u64, u64) {
        if item.kind == ContentKind::Repost && self.settings.use_subject_engagement_for_reposts {
            (
                item.extra.subject_like_count.unwrap_or(0),
                item.extra.subject_repost_count.unwrap_or(0),
                item.extra.subject_reply_count.unwrap_or(0),
            )
        } else {
            (item.like_count, item.repost_count, item.reply_count)
        }
    }

    fn passes_criteria(
        &self,
        item: &ContentItem,
        filters: &SearchFilters,
        start: &Option<chrono::DateTime<chrono::Utc>>,
        end: &Option<chrono::DateTime<chrono::Utc>>,
    ) -> bool {
        let (likes, reposts, replies) = self.counts_for(item);
        let engagement = crate::models::calculate_engagement_score(likes, reposts, replies);

        if start.is_some() || end.is_some() {
            let Some(created) = item.created() else {
                return false;
            };
            if let Some(start) = start {
                if created < *start {
                    return false;
                }
            }
            if let Some(end) = end {
                if created > *end {
                    return false;
                }
            }
        }

        filters.min_engagement <= engagement
            && engagement <= filters.max_engagement
            && filters.min_likes <= likes
            && likes <= filters.max_likes
            && filters.min_reposts <= reposts
            && reposts <= filters.max_reposts
            && filters.min_replies <= replies
            && replies <= filters.max_replies
    }

    /// DIDs referenced by the subject URIs of likes/reposts; callers resolve
    /// these in ≤ 25 batches before the subject-handle stage.
    pub fn subject_dids(items: &[ContentItem]) -> Vec<String> {
        let mut dids: Vec<String> = items
            .iter()
            .filter(|item| matches!(item.kind, ContentKind::Like | ContentKind::Repost))
            .filter_map(|item| item.extra.subject_uri.as_deref())
            .filter_map(RecordUri::did_of)
            .map(|did| did.to_string())
            .collect();
        dids.sort();
        dids.dedup();
        dids
    }
}

/// Resolve subject DIDs to handles through batched profile lookups. Lookup
/// failures leave entries unresolved rather than failing the search.
pub async fn resolve_subject_handles(
    client: &XrpcClient,
    items: &[ContentItem],
) -> Result<HashMap<String, String>, SkymarshalError> {
    let dids = SearchEngine::subject_dids(items);
    let mut did_to_handle = HashMap::new();
    for batch in dids.chunks(25) {
        match client.get_profiles(batch).await {
            Ok(profiles) => {
                for profile in profiles {
                    did_to_handle.insert(profile.did, profile.handle);
                }
            }
            Err(error) if error.is_auth() => return Err(error),
            Err(error) => {
                tracing::warn!("subject handle batch failed: {error}");
            }
        }
    }
    Ok(did_to_handle)
}

/// Engagement presets derived from the runtime like average. Presentation
/// sugar: each preset only resolves to min/max bounds on the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementPreset {
    Dead,
    Bombers,
    Mid,
    Bangers,
    Viral,
}

pub fn apply_engagement_preset(
    filters: &mut SearchFilters,
    preset: EngagementPreset,
    avg_likes: f64,
) {
    let half = (avg_likes * 0.5).max(0.0) as u64;
    let one_half = (avg_likes * 1.5).max(1.0) as u64;
    let double = (avg_likes * 2.0).max(1.0) as u64;
    let viral = ((avg_likes * 10.0).max(10.0) as u64).max(2000);

    match preset {
        EngagementPreset::Dead => {
            filters.max_likes = 0;
            filters.max_engagement = 0.0;
        }
        EngagementPreset::Bombers => {
            filters.min_likes = 0;
            filters.max_likes = half;
        }
        EngagementPreset::Mid => {
            filters.min_likes = half;
            filters.max_likes = one_half.max(1);
        }
        EngagementPreset::Bangers => {
            filters.min_likes = double.max(1);
        }
        EngagementPreset::Viral => {
            filters.min_likes = viral;
        }
    }
}

fn sort_items(items: &mut [ContentItem], mode: SortMode) {
    let created = |item: &ContentItem| item.created();
    match mode {
        SortMode::Newest => items.sort_by(|a, b| created(b).cmp(&created(a))),
        SortMode::Oldest => items.sort_by(|a, b| created(a).cmp(&created(b))),
        SortMode::EngagementDesc => items.sort_by(|a, b| {
            b.engagement_score
                .total_cmp(&a.engagement_score)
                .then(created(b).cmp(&created(a)))
        }),
        SortMode::EngagementAsc => items.sort_by(|a, b| {
            a.engagement_score
                .total_cmp(&b.engagement_score)
                .then(created(b).cmp(&created(a)))
        }),
        SortMode::LikesDesc => items.sort_by(|a, b| {
            b.like_count
                .cmp(&a.like_count)
                .then(created(b).cmp(&created(a)))
        }),
        SortMode::RepliesDesc => items.sort_by(|a, b| {
            b.reply_count
                .cmp(&a.reply_count)
                .then(created(b).cmp(&created(a)))
        }),
        SortMode::RepostsDesc => items.sort_by(|a, b| {
            b.repost_count
                .cmp(&a.repost_count)
                .then(created(b).cmp(&created(a)))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentTypeFilter, ItemExtra};
    use skymarshal_common::progress::NoProgress;

    fn post(rkey: &str, text: &str, likes: u64, created: &str) -> ContentItem {
        let mut item = ContentItem::new(
            format!("at://did:plc:self/app.bsky.feed.post/{rkey}"),
            format!("cid-{rkey}"),
            ContentKind::Post,
        );
        item.text = Some(text.to_string());
        item.like_count = likes;
        item.created_at = Some(created.to_string());
        item.update_engagement_score();
        item
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(UserSettings::default())
    }

    #[test]
    fn test_empty_items_empty_result() {
        let (results, total) = engine().search(&[], &SearchFilters::default(), &NoProgress);
        assert!(results.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_search_returns_subset_and_is_idempotent() {
        let items = vec![
            post("1", "rust is great", 2, "2024-01-02T00:00:00Z"),
            post("2", "cooking tips", 0, "2024-01-03T00:00:00Z"),
            post("3", "rust compiler internals", 9, "2024-01-01T00:00:00Z"),
        ];
        let filters = SearchFilters {
            keywords: Some(vec!["rust".to_string()]),
            ..SearchFilters::default()
        };
        let (first, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 2);
        assert!(first.iter().all(|r| items.iter().any(|i| i.uri == r.uri)));

        let (second, _) = engine().search(&first, &filters, &NoProgress);
        assert_eq!(first, second);
    }

    #[test]
    fn test_required_and_negative_operators() {
        // Spec scenario: "+hello" with "-there" keeps only "Hello world".
        let items = vec![
            post("1", "Hello world", 0, "2024-01-01T00:00:00Z"),
            post("2", "goodbye world", 0, "2024-01-02T00:00:00Z"),
            post("3", "hello there", 0, "2024-01-03T00:00:00Z"),
        ];
        let filters = SearchFilters {
            keywords: Some(vec!["+hello".to_string(), "-there".to_string()]),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 1);
        assert_eq!(results[0].text.as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_only_negatives_exclude_matches() {
        let items = vec![
            post("1", "keep me", 0, "2024-01-01T00:00:00Z"),
            post("2", "drop this one", 0, "2024-01-02T00:00:00Z"),
        ];
        let filters = SearchFilters {
            keywords: Some(vec!["-drop".to_string()]),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 1);
        assert_eq!(results[0].text.as_deref(), Some("keep me"));
    }

    #[test]
    fn test_exact_phrase_is_case_sensitive() {
        let items = vec![
            post("1", "The Quick Fox", 0, "2024-01-01T00:00:00Z"),
            post("2", "the quick fox", 0, "2024-01-02T00:00:00Z"),
        ];
        let filters = SearchFilters {
            keywords: Some(vec!["\"Quick Fox\"".to_string()]),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 1);
        assert_eq!(results[0].text.as_deref(), Some("The Quick Fox"));
    }

    #[test]
    fn test_word_boundary_matching() {
        let items = vec![
            post("1", "I love cats", 0, "2024-01-01T00:00:00Z"),
            post("2", "concatenate strings", 0, "2024-01-02T00:00:00Z"),
        ];
        let filters = SearchFilters {
            keywords: Some(vec!["\\bcat\\b".to_string()]),
            ..SearchFilters::default()
        };
        let (_, total) = engine().search(&items, &filters, &NoProgress);
        // "cats" has a trailing s and "concatenate" embeds the word; neither
        // is a whole-word match.
        assert_eq!(total, 0);

        let items = vec![post("3", "my cat sleeps", 0, "2024-01-01T00:00:00Z")];
        let (_, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 1);
    }

    #[test]
    fn test_items_without_text_fail_positive_keywords() {
        let mut like = ContentItem::new(
            "at://did:plc:self/app.bsky.feed.like/1".into(),
            "c".into(),
            ContentKind::Like,
        );
        like.extra.subject_uri = Some("at://did:plc:bob/app.bsky.feed.post/9".into());
        let filters = SearchFilters {
            keywords: Some(vec!["anything".to_string()]),
            ..SearchFilters::default()
        };
        let (_, total) = engine().search(&[like.clone()], &filters, &NoProgress);
        assert_eq!(total, 0);

        // Negatives alone cannot exclude a textless item.
        let filters = SearchFilters {
            keywords: Some(vec!["-anything".to_string()]),
            ..SearchFilters::default()
        };
        let (_, total) = engine().search(&[like], &filters, &NoProgress);
        assert_eq!(total, 1);
    }

    #[test]
    fn test_dead_thread_preset() {
        // Spec scenario: likes [0,0,1,20], max_likes=0 and max_engagement=0
        // keeps the two dead posts.
        let items = vec![
            post("1", "a", 0, "2024-01-01T00:00:00Z"),
            post("2", "b", 0, "2024-01-02T00:00:00Z"),
            post("3", "c", 1, "2024-01-03T00:00:00Z"),
            post("4", "d", 20, "2024-01-04T00:00:00Z"),
        ];
        let filters = SearchFilters {
            max_likes: 0,
            max_engagement: 0.0,
            content_type: ContentTypeFilter::Posts,
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 2);
        assert!(results.iter().all(|item| item.like_count == 0));
    }

    #[test]
    fn test_min_greater_than_max_yields_empty() {
        let items = vec![post("1", "a", 5, "2024-01-01T00:00:00Z")];
        let filters = SearchFilters {
            min_likes: 10,
            max_likes: 2,
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert!(results.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_date_range_end_is_inclusive_through_day() {
        let items = vec![
            post("1", "inside", 0, "2024-05-01T18:30:00Z"),
            post("2", "after", 0, "2024-05-02T00:00:01Z"),
        ];
        let filters = SearchFilters {
            start_date: Some("2024-05-01".to_string()),
            end_date: Some("2024-05-01".to_string()),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert_eq!(total, 1);
        assert_eq!(results[0].text.as_deref(), Some("inside"));
    }

    #[test]
    fn test_limit_zero_reports_total() {
        let items = vec![
            post("1", "a", 0, "2024-01-01T00:00:00Z"),
            post("2", "b", 0, "2024-01-02T00:00:00Z"),
        ];
        let filters = SearchFilters {
            limit: Some(0),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&items, &filters, &NoProgress);
        assert!(results.is_empty());
        assert_eq!(total, 2);
    }

    #[test]
    fn test_sort_newest_and_ties() {
        let items = vec![
            post("1", "a", 3, "2024-01-01T00:00:00Z"),
            post("2", "b", 3, "2024-01-03T00:00:00Z"),
            post("3", "c", 9, "2024-01-02T00:00:00Z"),
        ];
        let filters = SearchFilters {
            sort: SortMode::LikesDesc,
            ..SearchFilters::default()
        };
        let (results, _) = engine().search(&items, &filters, &NoProgress);
        // 9 likes first; the 3-like tie breaks by creation time descending.
        assert_eq!(results[0].text.as_deref(), Some("c"));
        assert_eq!(results[1].text.as_deref(), Some("b"));
        assert_eq!(results[2].text.as_deref(), Some("a"));
    }

    #[test]
    fn test_subject_uri_filter_only_affects_likes_and_reposts() {
        let mut like = ContentItem::new(
            "at://did:plc:self/app.bsky.feed.like/1".into(),
            "c".into(),
            ContentKind::Like,
        );
        like.extra.subject_uri = Some("at://did:plc:bob/app.bsky.feed.post/xyz".into());
        let plain_post = post("2", "unrelated", 0, "2024-01-01T00:00:00Z");

        let filters = SearchFilters {
            subject_contains: Some("did:plc:bob".to_string()),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search(&[like, plain_post], &filters, &NoProgress);
        // Posts pass through untouched; the like matches its subject.
        assert_eq!(total, 2);
        assert!(results.iter().any(|item| item.kind == ContentKind::Like));
    }

    #[test]
    fn test_subject_handle_filter_with_resolved_map() {
        // Spec scenario: repost of Bob matches "bob", Carol's like does not.
        let mut repost = ContentItem::new(
            "at://did:plc:self/app.bsky.feed.repost/1".into(),
            "c1".into(),
            ContentKind::Repost,
        );
        repost.extra.subject_uri = Some("at://did:plc:bob/app.bsky.feed.post/xyz".into());
        let mut like = ContentItem::new(
            "at://did:plc:self/app.bsky.feed.like/2".into(),
            "c2".into(),
            ContentKind::Like,
        );
        like.extra.subject_uri = Some("at://did:plc:carol/app.bsky.feed.post/abc".into());

        let mut did_to_handle = HashMap::new();
        did_to_handle.insert("did:plc:bob".to_string(), "bob.bsky.social".to_string());
        did_to_handle.insert("did:plc:carol".to_string(), "carol.bsky.social".to_string());

        let filters = SearchFilters {
            subject_handle_contains: Some("bob".to_string()),
            ..SearchFilters::default()
        };
        let (results, total) = engine().search_with_handles(
            &[repost, like],
            &filters,
            &did_to_handle,
            &NoProgress,
        );
        assert_eq!(total, 1);
        assert_eq!(results[0].kind, ContentKind::Repost);
    }

    #[test]
    fn test_subject_engagement_switch_for_reposts() {
        let mut repost = ContentItem::new(
            "at://did:plc:self/app.bsky.feed.repost/1".into(),
            "c1".into(),
            ContentKind::Repost,
        );
        repost.extra = ItemExtra {
            subject_uri: Some("at://did:plc:bob/app.bsky.feed.post/xyz".into()),
            subject_like_count: Some(50),
            ..ItemExtra::default()
        };

        let filters = SearchFilters {
            min_likes: 10,
            ..SearchFilters::default()
        };

        // Own counts (zero) fail the bound by default.
        let (_, total) = engine().search(std::slice::from_ref(&repost), &filters, &NoProgress);
        assert_eq!(total, 0);

        // With the switch on, subject counts are consulted instead.
        let mut settings = UserSettings::default();
        settings.use_subject_engagement_for_reposts = true;
        let subject_engine = SearchEngine::new(settings);
        let (_, total) = subject_engine.search(&[repost], &filters, &NoProgress);
        assert_eq!(total, 1);
    }

    #[test]
    fn test_engagement_presets_resolve_bounds() {
        let mut filters = SearchFilters::default();
        apply_engagement_preset(&mut filters, EngagementPreset::Dead, 12.0);
        assert_eq!(filters.max_likes, 0);
        assert_eq!(filters.max_engagement, 0.0);

        let mut filters = SearchFilters::default();
        apply_engagement_preset(&mut filters, EngagementPreset::Bangers, 12.0);
        assert_eq!(filters.min_likes, 24);

        // The viral floor never drops below 2000 likes.
        let mut filters = SearchFilters::default();
        apply_engagement_preset(&mut filters, EngagementPreset::Viral, 3.0);
        assert_eq!(filters.min_likes, 2000);
    }

    #[test]
    fn test_subject_dids_dedup() {
        let mut a = ContentItem::new("at://d/s/1".into(), "c".into(), ContentKind::Like);
        a.extra.subject_uri = Some("at://did:plc:bob/app.bsky.feed.post/1".into());
        let mut b = ContentItem::new("at://d/s/2".into(), "c".into(), ContentKind::Repost);
        b.extra.subject_uri = Some("at://did:plc:bob/app.bsky.feed.post/2".into());
        let dids = SearchEngine::subject_dids(&[a, b]);
        assert_eq!(dids, vec!["did:plc:bob".to_string()]);
    }
}
