use crate::apis::SessionGuard;
use crate::context::AppContext;
use crate::jobs::{JobProgressReporter, JobStatus};
use crate::models::{error_response, ApiResult};
use rocket::serde::json::Json;
use rocket::State;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::syntax::validate_handle;
use skymarshal_graph::result_cache::SnapshotCache;
use skymarshal_graph::{FetchMode, FetchOptions, GraphAnalytics, NetworkFetcher, NetworkSnapshot};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct NetworkFetchRequest {
    pub handle: Option<String>,
    pub mode: Option<String>,
    /// Kept for UI compatibility; anything beyond one hop maps to detailed.
    pub depth: Option<u8>,
    pub max_followers: Option<usize>,
    pub max_following: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct NetworkFetchResponse {
    pub success: bool,
    pub job_id: String,
}

fn fetch_options(request: &NetworkFetchRequest) -> Result<FetchOptions, SkymarshalError> {
    let mode = match &request.mode {
        Some(mode) => mode.parse::<FetchMode>()?,
        None => match request.depth {
            Some(depth) if depth >= 2 => FetchMode::Detailed,
            _ => FetchMode::Balanced,
        },
    };
    Ok(FetchOptions {
        max_followers: Some(request.max_followers.unwrap_or(500)),
        max_following: Some(request.max_following.unwrap_or(500)),
        mode,
        ..FetchOptions::default()
    })
}

#[post("/network/fetch", format = "json", data = "<body>")]
pub async fn start_fetch(
    context: &State<AppContext>,
    session: SessionGuard,
    body: Option<Json<NetworkFetchRequest>>,
) -> ApiResult<NetworkFetchResponse> {
    let SessionGuard(session) = session;
    let request = body.map(|json| json.into_inner()).unwrap_or_default();
    let handle = match &request.handle {
        Some(handle) => validate_handle(handle).map_err(error_response)?,
        None => session.handle.clone(),
    };
    let options = fetch_options(&request).map_err(error_response)?;

    let job_id = context.jobs.create(&handle);
    let jobs = Arc::clone(&context.jobs);
    let bus = context.bus.clone();
    let client = Arc::clone(session.auth.client());
    let profile_cache = Arc::clone(&context.profile_cache);
    let ttl_days = context.settings.profile_cache_ttl_days;
    let workers = context.settings.network_workers;
    let snapshot_dir = context.storage_root.join("network_cache");
    let spawned_job_id = job_id.clone();

    tokio::spawn(async move {
        let cache_key = SnapshotCache::make_key(&handle, &options);
        let snapshots = match SnapshotCache::open(
            &snapshot_dir,
            skymarshal_graph::result_cache::DEFAULT_SNAPSHOT_TTL,
        ) {
            Ok(cache) => Some(cache),
            Err(error) => {
                tracing::warn!("snapshot cache unavailable: {error}");
                None
            }
        };

        if let Some(cache) = &snapshots {
            if let Some(value) = cache.get(&cache_key, None) {
                if let Ok(snapshot) = serde_json::from_value::<NetworkSnapshot>(value) {
                    tracing::info!("network snapshot for {handle} served from cache");
                    jobs.complete(&spawned_job_id, snapshot, &bus);
                    return;
                }
            }
        }

        let fetcher = NetworkFetcher::new(client)
            .with_cache(profile_cache, ttl_days)
            .with_analytics(GraphAnalytics::default())
            .with_workers(workers);
        let reporter = Arc::new(JobProgressReporter {
            job_id: spawned_job_id.clone(),
            jobs: Arc::clone(&jobs),
            bus: bus.clone(),
        });
        match fetcher.fetch_network(&handle, &options, reporter).await {
            Ok(snapshot) => {
                if let (Some(cache), Ok(value)) =
                    (&snapshots, serde_json::to_value(&snapshot))
                {
                    if let Err(error) = cache.set(&cache_key, &value) {
                        tracing::warn!("could not cache snapshot: {error}");
                    }
                }
                jobs.complete(&spawned_job_id, snapshot, &bus);
            }
            Err(error) => {
                jobs.fail(&spawned_job_id, &error.to_string(), &bus);
            }
        }
    });

    Ok(Json(NetworkFetchResponse {
        success: true,
        job_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub success: bool,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[get("/network/status/<job_id>")]
pub async fn job_status(
    context: &State<AppContext>,
    _session: SessionGuard,
    job_id: &str,
) -> ApiResult<JobStatusResponse> {
    let progress = context.jobs.progress(job_id).ok_or_else(|| {
        error_response(SkymarshalError::NotFound(format!("no job '{job_id}'")))
    })?;
    Ok(Json(JobStatusResponse {
        success: true,
        status: progress.status,
        progress: progress.progress,
        message: progress.message,
        error: progress.error,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobResultResponse {
    pub success: bool,
    pub data: NetworkSnapshot,
}

#[get("/network/result/<job_id>")]
pub async fn job_result(
    context: &State<AppContext>,
    _session: SessionGuard,
    job_id: &str,
) -> ApiResult<JobResultResponse> {
    let (status, result) = context.jobs.result_of(job_id).ok_or_else(|| {
        error_response(SkymarshalError::NotFound(format!("no job '{job_id}'")))
    })?;
    match (status, result) {
        (JobStatus::Complete, Some(snapshot)) => Ok(Json(JobResultResponse {
            success: true,
            data: snapshot,
        })),
        (JobStatus::Error, _) => Err(error_response(SkymarshalError::Internal(
            "job failed; see status for details".to_string(),
        ))),
        _ => Err(error_response(SkymarshalError::Validation(
            "job is still running".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_options_mode_parsing() {
        let request = NetworkFetchRequest {
            mode: Some("fast".to_string()),
            ..NetworkFetchRequest::default()
        };
        assert_eq!(fetch_options(&request).unwrap().mode, FetchMode::Fast);

        let request = NetworkFetchRequest {
            depth: Some(2),
            ..NetworkFetchRequest::default()
        };
        assert_eq!(fetch_options(&request).unwrap().mode, FetchMode::Detailed);

        let request = NetworkFetchRequest::default();
        assert_eq!(fetch_options(&request).unwrap().mode, FetchMode::Balanced);

        let request = NetworkFetchRequest {
            mode: Some("warp".to_string()),
            ..NetworkFetchRequest::default()
        };
        assert!(fetch_options(&request).is_err());
    }
}
