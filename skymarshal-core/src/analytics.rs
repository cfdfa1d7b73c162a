use crate::models::{calculate_engagement_score, ContentItem, ContentKind};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

fn word_regex() -> &'static regex::Regex {
    static WORDS: OnceLock<regex::Regex> = OnceLock::new();
    WORDS.get_or_init(|| regex::Regex::new(r"\b\w+\b").unwrap())
}

fn positive_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        HashSet::from([
            "good", "great", "awesome", "excellent", "amazing", "wonderful", "fantastic",
            "love", "happy", "joy", "beautiful", "perfect", "best", "excited", "fun",
            "thanks", "thank", "appreciate", "grateful", "nice", "helpful", "enjoy",
            "congrats", "congratulations", "success", "win", "winning", "brilliant",
            "outstanding", "superb", "incredible", "lovely", "delightful", "pleased",
        ])
    })
}

fn negative_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        HashSet::from([
            "bad", "terrible", "awful", "horrible", "worst", "hate", "angry", "sad",
            "disappointed", "disappointing", "poor", "fail", "failed", "failure", "wrong",
            "problem", "issue", "error", "broken", "useless", "stupid", "annoying",
            "frustrating", "frustrated", "difficult", "hard", "sucks", "sorry",
            "unfortunately", "concern", "worried", "worry", "afraid", "scared",
        ])
    })
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        HashSet::from([
            "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
            "with", "by", "from", "as", "is", "was", "are", "were", "be", "been", "being",
            "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
            "may", "might", "must", "can", "this", "that", "these", "those", "i", "you",
            "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
            "your", "his", "its", "our", "their", "so", "just", "now", "out", "up", "get",
            "got", "like", "one", "two",
        ])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentResult {
    pub score: f64,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Lexicon-based sentiment: normalized (positive − negative) / total over
/// the sentiment words found in the text.
pub fn analyze_sentiment(text: &str) -> SentimentResult {
    if text.is_empty() {
        return SentimentResult {
            score: 0.0,
            positive: 0,
            negative: 0,
            neutral: 1,
        };
    }
    let mut positive = 0;
    let mut negative = 0;
    for word in word_regex().find_iter(&text.to_lowercase()) {
        if positive_words().contains(word.as_str()) {
            positive += 1;
        } else if negative_words().contains(word.as_str()) {
            negative += 1;
        }
    }
    let total = positive + negative;
    let score = if total == 0 {
        0.0
    } else {
        (positive as f64 - negative as f64) / total as f64
    };
    SentimentResult {
        score: (score * 1000.0).round() / 1000.0,
        positive,
        negative,
        neutral: usize::from(total == 0),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentSummary {
    pub average_score: f64,
    pub positive_posts: usize,
    pub negative_posts: usize,
    pub neutral_posts: usize,
    pub total_analyzed: usize,
    pub percentage_positive: f64,
    pub percentage_negative: f64,
    pub percentage_neutral: f64,
}

pub fn analyze_sentiments(items: &[ContentItem]) -> SentimentSummary {
    let mut scores = Vec::new();
    let mut summary = SentimentSummary::default();
    for item in items {
        if !matches!(item.kind, ContentKind::Post | ContentKind::Reply) {
            continue;
        }
        let Some(text) = item.text.as_deref() else {
            continue;
        };
        let result = analyze_sentiment(text);
        scores.push(result.score);
        if result.score > 0.1 {
            summary.positive_posts += 1;
        } else if result.score < -0.1 {
            summary.negative_posts += 1;
        } else {
            summary.neutral_posts += 1;
        }
    }
    summary.total_analyzed = scores.len();
    if !scores.is_empty() {
        let n = scores.len() as f64;
        let avg: f64 = scores.iter().sum::<f64>() / n;
        summary.average_score = (avg * 1000.0).round() / 1000.0;
        summary.percentage_positive = (1000.0 * summary.positive_posts as f64 / n).round() / 10.0;
        summary.percentage_negative = (1000.0 * summary.negative_posts as f64 / n).round() / 10.0;
        summary.percentage_neutral = (1000.0 * summary.neutral_posts as f64 / n).round() / 10.0;
    }
    summary
}

pub const DAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Serialize)]
pub struct DayBucket {
    pub day: String,
    pub count: usize,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimePatterns {
    pub by_hour: BTreeMap<u32, usize>,
    pub hour_engagement: BTreeMap<u32, f64>,
    pub by_day_of_week: Vec<DayBucket>,
    pub best_hour: Option<u32>,
    pub best_day: Option<String>,
    pub total_analyzed: usize,
}

/// Posting-time patterns with mean raw engagement (likes + reposts +
/// replies) per hour and weekday.
pub fn analyze_time_patterns(items: &[ContentItem]) -> TimePatterns {
    let mut patterns = TimePatterns::default();
    let mut hour_engagement: HashMap<u32, Vec<f64>> = HashMap::new();
    let mut day_counts: HashMap<&'static str, usize> = HashMap::new();
    let mut day_engagement: HashMap<&'static str, Vec<f64>> = HashMap::new();

    for item in items {
        if !matches!(item.kind, ContentKind::Post | ContentKind::Reply) {
            continue;
        }
        let Some(created) = item.created() else {
            continue;
        };
        patterns.total_analyzed += 1;
        use chrono::{Datelike, Timelike};
        let hour = created.hour();
        let day = DAY_ORDER[created.weekday().num_days_from_monday() as usize];
        let engagement = (item.like_count + item.repost_count + item.reply_count) as f64;

        *patterns.by_hour.entry(hour).or_default() += 1;
        hour_engagement.entry(hour).or_default().push(engagement);
        *day_counts.entry(day).or_default() += 1;
        day_engagement.entry(day).or_default().push(engagement);
    }

    for (hour, values) in &hour_engagement {
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        patterns
            .hour_engagement
            .insert(*hour, (avg * 10.0).round() / 10.0);
    }
    patterns.best_hour = patterns
        .hour_engagement
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(hour, _)| *hour);

    for day in DAY_ORDER {
        let values = day_engagement.get(day);
        let avg = values
            .map(|v| v.iter().sum::<f64>() / v.len() as f64)
            .unwrap_or(0.0);
        patterns.by_day_of_week.push(DayBucket {
            day: day.to_string(),
            count: day_counts.get(day).copied().unwrap_or(0),
            avg_engagement: (avg * 10.0).round() / 10.0,
        });
    }
    patterns.best_day = patterns
        .by_day_of_week
        .iter()
        .filter(|bucket| bucket.count > 0)
        .max_by(|a, b| a.avg_engagement.total_cmp(&b.avg_engagement))
        .map(|bucket| bucket.day.clone());

    patterns
}

#[derive(Debug, Clone, Serialize)]
pub struct WordEngagement {
    pub word: String,
    pub avg_engagement: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngagementCorrelation {
    pub high_engagement_words: Vec<WordEngagement>,
    pub low_engagement_words: Vec<WordEngagement>,
    pub total_analyzed: usize,
    pub unique_words: usize,
}

/// Which words correlate with engagement: words longer than three
/// characters, not stop words, used at least three times.
pub fn analyze_engagement_correlation(items: &[ContentItem], top_n: usize) -> EngagementCorrelation {
    let mut word_engagements: HashMap<String, Vec<f64>> = HashMap::new();
    let mut analyzed = 0;

    for item in items {
        if !matches!(item.kind, ContentKind::Post | ContentKind::Reply) {
            continue;
        }
        let Some(text) = item.text.as_deref() else {
            continue;
        };
        analyzed += 1;
        let engagement = (item.like_count + item.repost_count + item.reply_count) as f64;
        for word in word_regex().find_iter(&text.to_lowercase()) {
            let word = word.as_str();
            if word.len() > 3 && !stop_words().contains(word) {
                word_engagements.entry(word.to_string()).or_default().push(engagement);
            }
        }
    }

    let mut averaged: Vec<WordEngagement> = word_engagements
        .into_iter()
        .filter(|(_, engagements)| engagements.len() >= 3)
        .map(|(word, engagements)| WordEngagement {
            avg_engagement: ((engagements.iter().sum::<f64>() / engagements.len() as f64) * 10.0)
                .round()
                / 10.0,
            count: engagements.len(),
            word,
        })
        .collect();
    averaged.sort_by(|a, b| {
        b.avg_engagement
            .total_cmp(&a.avg_engagement)
            .then_with(|| a.word.cmp(&b.word))
    });

    let unique_words = averaged.len();
    let high: Vec<WordEngagement> = averaged.iter().take(top_n).cloned().collect();
    let low: Vec<WordEngagement> = averaged
        .iter()
        .rev()
        .take(top_n)
        .rev()
        .cloned()
        .collect();
    EngagementCorrelation {
        high_engagement_words: high,
        low_engagement_words: low,
        total_analyzed: analyzed,
        unique_words,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WordFrequency {
    pub top_words: Vec<WordCount>,
    pub total_words: usize,
    pub unique_words: usize,
    pub total_analyzed: usize,
}

pub fn analyze_word_frequency(items: &[ContentItem], top_n: usize) -> WordFrequency {
    let mut all_words = 0usize;
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut analyzed = 0;

    for item in items {
        if !matches!(item.kind, ContentKind::Post | ContentKind::Reply) {
            continue;
        }
        let Some(text) = item.text.as_deref() else {
            continue;
        };
        analyzed += 1;
        for word in word_regex().find_iter(&text.to_lowercase()) {
            all_words += 1;
            let word = word.as_str();
            if word.len() > 3 && !stop_words().contains(word) {
                *counts.entry(word.to_string()).or_default() += 1;
            }
        }
    }

    let filtered_total: usize = counts.values().sum();
    let unique_words = counts.len();
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let top_words = sorted
        .into_iter()
        .take(top_n)
        .map(|(word, count)| WordCount {
            percentage: if filtered_total == 0 {
                0.0
            } else {
                (10000.0 * count as f64 / filtered_total as f64).round() / 100.0
            },
            word,
            count,
        })
        .collect();

    WordFrequency {
        top_words,
        total_words: all_words,
        unique_words,
        total_analyzed: analyzed,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub sentiment: SentimentSummary,
    pub time_patterns: TimePatterns,
    pub engagement_correlation: EngagementCorrelation,
    pub word_frequency: WordFrequency,
}

pub fn generate_insights(items: &[ContentItem]) -> Insights {
    Insights {
        sentiment: analyze_sentiments(items),
        time_patterns: analyze_time_patterns(items),
        engagement_correlation: analyze_engagement_correlation(items, 20),
        word_frequency: analyze_word_frequency(items, 50),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngagementThresholds {
    pub top: u64,
    pub average: u64,
    pub low: u64,
}

/// Statistics block attached to search summaries; the performance
/// categories here are presentation sugar over the runtime like average.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentStats {
    pub total_posts: usize,
    pub total_likes: u64,
    pub total_reposts: u64,
    pub total_replies: u64,
    pub top_posts: usize,
    pub average_posts: usize,
    pub low_engagement: usize,
    pub dead_threads: usize,
    pub engagement_thresholds: EngagementThresholds,
    pub banger_posts: usize,
    pub viral_posts: usize,
    pub avg_likes_per_post: f64,
    pub avg_engagement_per_post: f64,
}

pub fn calculate_statistics(items: &[ContentItem], avg_likes_runtime: Option<f64>) -> ContentStats {
    if items.is_empty() {
        return ContentStats::default();
    }

    let engageable: Vec<&ContentItem> = items
        .iter()
        .filter(|item| matches!(item.kind, ContentKind::Post | ContentKind::Reply))
        .collect();
    let posts: Vec<&&ContentItem> = engageable
        .iter()
        .filter(|item| item.kind == ContentKind::Post)
        .collect();

    let total_likes: u64 = engageable.iter().map(|item| item.like_count).sum();
    let total_reposts: u64 = engageable.iter().map(|item| item.repost_count).sum();
    let total_replies: u64 = engageable.iter().map(|item| item.reply_count).sum();
    let total_engagement: f64 = engageable
        .iter()
        .map(|item| calculate_engagement_score(item.like_count, item.repost_count, item.reply_count))
        .sum();

    let denom = engageable.len().max(1) as f64;
    let avg_likes = total_likes as f64 / denom;
    let avg_engagement = total_engagement / denom;
    let avg_likes_runtime = avg_likes_runtime.filter(|avg| *avg > 0.0).unwrap_or(avg_likes);

    let high_threshold = (avg_engagement * 2.0).max(10.0);
    let half = (avg_likes_runtime * 0.5).max(0.0);
    let one_half = (avg_likes_runtime * 1.5).max(1.0);
    let double = (avg_likes_runtime * 2.0).max(1.0);

    let high_engagement = engageable
        .iter()
        .filter(|item| {
            calculate_engagement_score(item.like_count, item.repost_count, item.reply_count)
                >= high_threshold
        })
        .count();
    let dead_threads = engageable.iter().filter(|item| item.like_count == 0).count();
    let bomber = posts
        .iter()
        .filter(|item| item.like_count > 0 && (item.like_count as f64) <= half)
        .count();
    let mid = posts
        .iter()
        .filter(|item| (item.like_count as f64) > half && (item.like_count as f64) <= one_half)
        .count();
    let banger = posts
        .iter()
        .filter(|item| (item.like_count as f64) >= double)
        .count();
    let viral = posts.iter().filter(|item| item.like_count >= 2000).count();

    ContentStats {
        total_posts: posts.len(),
        total_likes,
        total_reposts,
        total_replies,
        top_posts: high_engagement,
        average_posts: mid,
        low_engagement: bomber,
        dead_threads,
        engagement_thresholds: EngagementThresholds {
            top: high_threshold as u64,
            average: one_half as u64,
            low: half as u64,
        },
        banger_posts: banger,
        viral_posts: viral,
        avg_likes_per_post: avg_likes,
        avg_engagement_per_post: avg_engagement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str, likes: u64, created: &str) -> ContentItem {
        let mut item = ContentItem::new(
            format!("at://did:plc:a/app.bsky.feed.post/{likes}-{}", text.len()),
            "c".into(),
            ContentKind::Post,
        );
        item.text = Some(text.to_string());
        item.like_count = likes;
        item.created_at = Some(created.to_string());
        item.update_engagement_score();
        item
    }

    #[test]
    fn test_sentiment_scoring() {
        let positive = analyze_sentiment("what a wonderful amazing day");
        assert!(positive.score > 0.9);
        let negative = analyze_sentiment("terrible awful broken mess");
        assert!(negative.score < -0.9);
        let neutral = analyze_sentiment("the sky is blue");
        assert_eq!(neutral.score, 0.0);
        assert_eq!(neutral.neutral, 1);
        let mixed = analyze_sentiment("great idea but terrible execution");
        assert_eq!(mixed.score, 0.0);
    }

    #[test]
    fn test_sentiment_summary_buckets() {
        let items = vec![
            post("I love this, fantastic work", 0, "2024-01-01T10:00:00Z"),
            post("this is awful and broken", 0, "2024-01-01T11:00:00Z"),
            post("posting about the weather", 0, "2024-01-01T12:00:00Z"),
        ];
        let summary = analyze_sentiments(&items);
        assert_eq!(summary.total_analyzed, 3);
        assert_eq!(summary.positive_posts, 1);
        assert_eq!(summary.negative_posts, 1);
        assert_eq!(summary.neutral_posts, 1);
    }

    #[test]
    fn test_time_patterns_best_hour() {
        let items = vec![
            post("morning", 10, "2024-01-01T09:15:00Z"),
            post("morning again", 8, "2024-01-02T09:45:00Z"),
            post("midnight", 0, "2024-01-03T00:30:00Z"),
        ];
        let patterns = analyze_time_patterns(&items);
        assert_eq!(patterns.best_hour, Some(9));
        assert_eq!(patterns.by_hour.get(&9), Some(&2));
        assert_eq!(patterns.total_analyzed, 3);
        assert_eq!(patterns.by_day_of_week.len(), 7);
    }

    #[test]
    fn test_word_frequency_skips_stop_and_short_words() {
        let items = vec![
            post("the compiler is fast", 0, "2024-01-01T00:00:00Z"),
            post("compiler errors again", 0, "2024-01-01T00:00:00Z"),
        ];
        let frequency = analyze_word_frequency(&items, 10);
        let top: Vec<&str> = frequency
            .top_words
            .iter()
            .map(|w| w.word.as_str())
            .collect();
        assert_eq!(top[0], "compiler");
        assert!(!top.contains(&"the"));
        assert!(!top.contains(&"is"));
    }

    #[test]
    fn test_engagement_correlation_requires_three_uses() {
        let mut items = Vec::new();
        for i in 0..3 {
            items.push(post("rustlang shipping", 10 * (i + 1), "2024-01-01T00:00:00Z"));
        }
        items.push(post("solitary topic", 100, "2024-01-01T00:00:00Z"));
        let correlation = analyze_engagement_correlation(&items, 5);
        let words: Vec<&str> = correlation
            .high_engagement_words
            .iter()
            .map(|w| w.word.as_str())
            .collect();
        assert!(words.contains(&"rustlang"));
        assert!(!words.contains(&"solitary"));
    }

    #[test]
    fn test_statistics_categories() {
        let items = vec![
            post("dead", 0, "2024-01-01T00:00:00Z"),
            post("ok", 10, "2024-01-02T00:00:00Z"),
            post("viral hit", 2500, "2024-01-03T00:00:00Z"),
        ];
        let stats = calculate_statistics(&items, Some(10.0));
        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.dead_threads, 1);
        assert_eq!(stats.viral_posts, 1);
        // 2500 likes ≥ 2 × avg(10): a banger as well as viral.
        assert!(stats.banger_posts >= 1);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = calculate_statistics(&[], None);
        assert_eq!(stats.total_posts, 0);
        assert_eq!(stats.dead_threads, 0);
    }
}
