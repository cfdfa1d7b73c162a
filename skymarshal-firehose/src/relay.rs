use crate::jetstream::{self, JetstreamEvent};
use futures::StreamExt as _;
use skymarshal_core::analytics::analyze_sentiment;
use skymarshal_lexicon::app::bsky::feed::Post;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

/// Posts kept for the recent-post endpoint.
const RECENT_BUFFER_CAP: usize = 100;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const STATS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct FirehosePost {
    pub text: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub author_did: String,
    pub created_at: String,
    pub sentiment: String,
    pub sentiment_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub has_images: bool,
    pub has_video: bool,
    pub has_link: bool,
    pub is_reply: bool,
    pub is_quote: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirehoseStats {
    pub total_posts: u64,
    pub posts_per_minute: u64,
    pub sentiment_counts: SentimentCounts,
    pub duration_seconds: u64,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub enum RelayEvent {
    Post(FirehosePost),
    Stats(FirehoseStats),
}

/// Subscribes to a Jetstream endpoint and relays each post with derived
/// sentiment and language metadata.
///
/// Two cooperative loops share the relay: the reader ([`run`](Self::run))
/// and the stats broadcaster ([`stats_loop`](Self::stats_loop)), which
/// terminates once the reader clears the `running` flag.
pub struct FirehoseRelay {
    endpoint: String,
    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    total_posts: AtomicU64,
    positive: AtomicU64,
    negative: AtomicU64,
    neutral: AtomicU64,
    minute_window: Mutex<VecDeque<Instant>>,
    recent: Mutex<VecDeque<FirehosePost>>,
    sender: broadcast::Sender<RelayEvent>,
}

impl FirehoseRelay {
    pub fn new(endpoint: &str) -> Arc<Self> {
        let (sender, _) = broadcast::channel(256);
        Arc::new(FirehoseRelay {
            endpoint: endpoint.to_string(),
            running: AtomicBool::new(false),
            started_at: Mutex::new(None),
            total_posts: AtomicU64::new(0),
            positive: AtomicU64::new(0),
            negative: AtomicU64::new(0),
            neutral: AtomicU64::new(0),
            minute_window: Mutex::new(VecDeque::new()),
            recent: Mutex::new(VecDeque::new()),
            sender,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stats(&self) -> FirehoseStats {
        let now = Instant::now();
        let posts_per_minute = {
            let mut window = self.minute_window.lock().unwrap_or_else(|e| e.into_inner());
            while let Some(front) = window.front() {
                if now.duration_since(*front) > Duration::from_secs(60) {
                    window.pop_front();
                } else {
                    break;
                }
            }
            window.len() as u64
        };
        let duration_seconds = self
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|start| now.duration_since(start).as_secs())
            .unwrap_or(0);
        FirehoseStats {
            total_posts: self.total_posts.load(Ordering::SeqCst),
            posts_per_minute,
            sentiment_counts: SentimentCounts {
                positive: self.positive.load(Ordering::SeqCst),
                negative: self.negative.load(Ordering::SeqCst),
                neutral: self.neutral.load(Ordering::SeqCst),
            },
            duration_seconds,
            running: self.running(),
        }
    }

    pub fn recent_posts(&self, limit: usize) -> Vec<FirehosePost> {
        let recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
        recent.iter().rev().take(limit).cloned().collect()
    }

    /// Reader loop: connect, relay frames, reconnect after errors; exits
    /// when [`stop`](Self::stop) clears the flag.
    pub async fn run(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        while self.running() {
            let url = match Url::parse(&self.endpoint) {
                Ok(url) => url,
                Err(error) => {
                    tracing::error!("invalid jetstream endpoint {}: {error}", self.endpoint);
                    self.stop();
                    break;
                }
            };
            tracing::info!("connecting to jetstream at {url}");
            match connect_async(url).await {
                Ok((stream, _)) => {
                    let (_, mut reader) = stream.split();
                    while self.running() {
                        match reader.next().await {
                            Some(Ok(Message::Text(text))) => self.process_frame(&text),
                            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(error)) => {
                                tracing::warn!("jetstream read error: {error}");
                                break;
                            }
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!("jetstream connect failed: {error}");
                }
            }
            if self.running() {
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    /// Broadcast stats every second until the reader stops.
    pub async fn stats_loop(self: Arc<Self>) {
        while self.running() {
            let _ = self.sender.send(RelayEvent::Stats(self.stats()));
            tokio::time::sleep(STATS_INTERVAL).await;
        }
        // One final frame so subscribers observe the stopped state.
        let _ = self.sender.send(RelayEvent::Stats(self.stats()));
    }

    pub fn process_frame(&self, frame: &str) {
        match jetstream::read(frame) {
            Ok(JetstreamEvent::Commit(commit)) => {
                if let Some((uri, post)) = commit.created_post() {
                    let relayed = self.build_post(&commit.did, uri, commit.commit.cid, post);
                    self.record_post(relayed);
                }
            }
            Ok(_) => {}
            Err(error) => tracing::debug!("skipping jetstream frame: {error}"),
        }
    }

    fn build_post(
        &self,
        author_did: &str,
        uri: String,
        cid: Option<String>,
        post: Post,
    ) -> FirehosePost {
        let sentiment = analyze_sentiment(&post.text);
        let label = if sentiment.score > 0.1 {
            "positive"
        } else if sentiment.score < -0.1 {
            "negative"
        } else {
            "neutral"
        };
        let embed_type = post
            .embed
            .as_ref()
            .and_then(|embed| embed.get("$type"))
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        FirehosePost {
            sentiment: label.to_string(),
            sentiment_score: sentiment.score,
            language: post.langs.as_ref().and_then(|langs| langs.first().cloned()),
            has_images: embed_type.starts_with("app.bsky.embed.images"),
            has_video: embed_type.starts_with("app.bsky.embed.video"),
            has_link: embed_type.starts_with("app.bsky.embed.external"),
            is_reply: post.reply.is_some(),
            is_quote: embed_type.starts_with("app.bsky.embed.record"),
            text: post.text,
            uri,
            cid,
            author_did: author_did.to_string(),
            created_at: post.created_at,
        }
    }

    fn record_post(&self, post: FirehosePost) {
        self.total_posts.fetch_add(1, Ordering::SeqCst);
        match post.sentiment.as_str() {
            "positive" => self.positive.fetch_add(1, Ordering::SeqCst),
            "negative" => self.negative.fetch_add(1, Ordering::SeqCst),
            _ => self.neutral.fetch_add(1, Ordering::SeqCst),
        };
        {
            let mut window = self.minute_window.lock().unwrap_or_else(|e| e.into_inner());
            window.push_back(Instant::now());
            while window.len() > 10_000 {
                window.pop_front();
            }
        }
        {
            let mut recent = self.recent.lock().unwrap_or_else(|e| e.into_inner());
            recent.push_back(post.clone());
            while recent.len() > RECENT_BUFFER_CAP {
                recent.pop_front();
            }
        }
        let _ = self.sender.send(RelayEvent::Post(post));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_frame(did: &str, rkey: &str, text: &str) -> String {
        format!(
            "{{\"did\":\"{did}\",\"time_us\":1731539977109649,\"kind\":\"commit\",\"commit\":{{\"rev\":\"r\",\"operation\":\"create\",\"collection\":\"app.bsky.feed.post\",\"rkey\":\"{rkey}\",\"record\":{{\"$type\":\"app.bsky.feed.post\",\"createdAt\":\"2024-11-13T23:19:36.449Z\",\"text\":\"{text}\",\"langs\":[\"en\"]}},\"cid\":\"bafyfake\"}}}}"
        )
    }

    #[tokio::test]
    async fn test_process_frame_updates_stats_and_buffer() {
        let relay = FirehoseRelay::new("wss://example.invalid/subscribe");
        let mut receiver = relay.subscribe();

        relay.process_frame(&post_frame("did:plc:a", "1", "what a wonderful amazing day"));
        relay.process_frame(&post_frame("did:plc:b", "2", "terrible awful outage"));
        relay.process_frame(&post_frame("did:plc:c", "3", "posting about the weather"));

        let stats = relay.stats();
        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.sentiment_counts.positive, 1);
        assert_eq!(stats.sentiment_counts.negative, 1);
        assert_eq!(stats.sentiment_counts.neutral, 1);
        assert_eq!(stats.posts_per_minute, 3);

        let recent = relay.recent_posts(2);
        assert_eq!(recent.len(), 2);
        // Newest first.
        assert_eq!(recent[0].author_did, "did:plc:c");
        assert_eq!(recent[0].language.as_deref(), Some("en"));

        let RelayEvent::Post(first) = receiver.recv().await.unwrap() else {
            panic!("expected a post event");
        };
        assert_eq!(first.sentiment, "positive");
        assert!(first.uri.starts_with("at://did:plc:a/app.bsky.feed.post/"));
    }

    #[tokio::test]
    async fn test_delete_frames_are_ignored() {
        let relay = FirehoseRelay::new("wss://example.invalid/subscribe");
        relay.process_frame(
            "{\"did\":\"did:plc:a\",\"time_us\":1,\"kind\":\"commit\",\"commit\":{\"rev\":\"r\",\"operation\":\"delete\",\"collection\":\"app.bsky.feed.post\",\"rkey\":\"1\"}}",
        );
        assert_eq!(relay.stats().total_posts, 0);
    }

    #[tokio::test]
    async fn test_recent_buffer_is_capped() {
        let relay = FirehoseRelay::new("wss://example.invalid/subscribe");
        for i in 0..150 {
            relay.process_frame(&post_frame("did:plc:a", &i.to_string(), "hello"));
        }
        assert_eq!(relay.recent_posts(1000).len(), RECENT_BUFFER_CAP);
        assert_eq!(relay.stats().total_posts, 150);
    }

    #[tokio::test]
    async fn test_stop_clears_running_flag() {
        let relay = FirehoseRelay::new("wss://example.invalid/subscribe");
        assert!(!relay.running());
        relay.running.store(true, Ordering::SeqCst);
        relay.stop();
        assert!(!relay.running());
        assert!(!relay.stats().running);
    }
}
