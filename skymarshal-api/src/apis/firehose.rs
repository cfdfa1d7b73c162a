use crate::apis::SessionGuard;
use crate::context::AppContext;
use crate::models::ApiResult;
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{Shutdown, State};
use skymarshal_firehose::{FirehosePost, FirehoseStats};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Serialize)]
pub struct FirehoseStatsResponse {
    pub success: bool,
    pub stats: FirehoseStats,
}

#[get("/firehose/stats")]
pub async fn stats(context: &State<AppContext>) -> Json<FirehoseStatsResponse> {
    Json(FirehoseStatsResponse {
        success: true,
        stats: context.relay.stats(),
    })
}

#[derive(Debug, Serialize)]
pub struct RecentPostsResponse {
    pub success: bool,
    pub posts: Vec<FirehosePost>,
}

#[get("/firehose/recent?<limit>")]
pub async fn recent(context: &State<AppContext>, limit: Option<usize>) -> Json<RecentPostsResponse> {
    let limit = limit.unwrap_or(50).min(100);
    Json(RecentPostsResponse {
        success: true,
        posts: context.relay.recent_posts(limit),
    })
}

#[derive(Debug, Serialize)]
pub struct FirehoseControlResponse {
    pub success: bool,
    pub message: String,
}

#[post("/firehose/start")]
pub async fn start(
    context: &State<AppContext>,
    _session: SessionGuard,
) -> ApiResult<FirehoseControlResponse> {
    if context.relay.running() {
        return Ok(Json(FirehoseControlResponse {
            success: true,
            message: "Already running".to_string(),
        }));
    }
    tokio::spawn(Arc::clone(&context.relay).run());
    tokio::spawn(Arc::clone(&context.relay).stats_loop());
    Ok(Json(FirehoseControlResponse {
        success: true,
        message: "Firehose started".to_string(),
    }))
}

#[post("/firehose/stop")]
pub async fn stop(
    context: &State<AppContext>,
    _session: SessionGuard,
) -> ApiResult<FirehoseControlResponse> {
    if !context.relay.running() {
        return Ok(Json(FirehoseControlResponse {
            success: true,
            message: "Already stopped".to_string(),
        }));
    }
    context.relay.stop();
    Ok(Json(FirehoseControlResponse {
        success: true,
        message: "Firehose stopped".to_string(),
    }))
}

/// The real-time channel: an SSE stream carrying `connected`,
/// `firehose:post`, `firehose:stats`, and `job:progress` events.
#[get("/events")]
pub fn events(context: &State<AppContext>, mut shutdown: Shutdown) -> EventStream![] {
    let mut receiver = context.bus.subscribe();
    let initial_stats = context.relay.stats();
    EventStream! {
        yield Event::json(&serde_json::json!({"status": "ok"})).event("connected");
        yield Event::json(&initial_stats).event("firehose:stats");
        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Ok(event) => yield Event::json(&event.payload()).event(event.name()),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("event stream lagged, skipped {skipped}");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut shutdown => break,
            }
        }
    }
}
