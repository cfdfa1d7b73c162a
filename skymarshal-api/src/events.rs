use crate::jobs::JobProgress;
use skymarshal_firehose::{FirehosePost, FirehoseStats};
use tokio::sync::broadcast;

/// Events pushed over the real-time channel to UI consumers.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Connected,
    FirehosePost(FirehosePost),
    FirehoseStats(FirehoseStats),
    JobProgress(JobProgress),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected => "connected",
            ServerEvent::FirehosePost(_) => "firehose:post",
            ServerEvent::FirehoseStats(_) => "firehose:stats",
            ServerEvent::JobProgress(_) => "job:progress",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            ServerEvent::Connected => serde_json::json!({"status": "ok"}),
            ServerEvent::FirehosePost(post) => {
                serde_json::to_value(post).unwrap_or_default()
            }
            ServerEvent::FirehoseStats(stats) => {
                serde_json::to_value(stats).unwrap_or_default()
            }
            ServerEvent::JobProgress(progress) => {
                serde_json::to_value(progress).unwrap_or_default()
            }
        }
    }
}

/// Broadcast fan-out from background tasks to every connected SSE client.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(512);
        EventBus { sender }
    }

    pub fn publish(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        bus.publish(ServerEvent::JobProgress(JobProgress {
            job_id: "abc".into(),
            status: JobStatus::Running,
            progress: 40,
            message: "Hydrating profiles".into(),
            error: None,
        }));
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name(), "job:progress");
        assert_eq!(event.payload()["job_id"], "abc");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ServerEvent::Connected.name(), "connected");
    }
}
