use crate::apis::SessionGuard;
use crate::context::AppContext;
use crate::models::{error_response, ApiResult};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::State;
use skymarshal_client::NoCredentials;
use skymarshal_common::error::{ErrorKind, SkymarshalError};
use skymarshal_common::progress::{LogProgress, NoProgress};
use skymarshal_core::analytics::{calculate_statistics, ContentStats};
use skymarshal_core::exporter::Category;
use skymarshal_core::models::{
    ContentItem, ContentSummary, ContentTypeFilter, SearchFilters, SortMode,
};
use skymarshal_core::search::{resolve_subject_handles, SearchEngine};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct LoadRequest {
    pub limit: Option<usize>,
    pub force_refresh: Option<bool>,
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub success: bool,
    pub loaded_count: usize,
    pub summary: ContentSummary,
}

fn parse_categories(names: &Option<Vec<String>>) -> Option<HashSet<Category>> {
    let names = names.as_ref()?;
    let parsed: HashSet<Category> = names
        .iter()
        .filter_map(|name| Category::parse(name))
        .collect();
    if parsed.is_empty() {
        None
    } else {
        Some(parsed)
    }
}

#[post("/content/load", format = "json", data = "<body>")]
pub async fn load(
    session: SessionGuard,
    body: Option<Json<LoadRequest>>,
) -> ApiResult<LoadResponse> {
    let SessionGuard(session) = session;
    let request = body.map(|json| json.into_inner()).unwrap_or_default();
    let categories = parse_categories(&request.categories);
    let force_refresh = request.force_refresh.unwrap_or(false);

    let items = session
        .auth
        .call_with_reauth(&NoCredentials, || {
            let store = Arc::clone(&session.store);
            let handle = session.handle.clone();
            let did = session.did.clone();
            let categories = categories.clone();
            async move {
                store
                    .ensure_loaded(&handle, &did, categories, request.limit, force_refresh, &LogProgress)
                    .await
            }
        })
        .await
        .map_err(error_response)?;

    if let Some(path) = session.store.loaded_file(&session.handle).await {
        *session
            .json_path
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(path);
    }

    Ok(Json(LoadResponse {
        success: true,
        loaded_count: items.len(),
        summary: ContentSummary::of(&items),
    }))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: ContentSummary,
}

#[get("/content/summary")]
pub async fn summary(session: SessionGuard) -> ApiResult<SummaryResponse> {
    let SessionGuard(session) = session;
    Ok(Json(SummaryResponse {
        success: true,
        summary: session.store.summary(&session.handle).await,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub keyword: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub content_types: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_likes: Option<u64>,
    pub max_likes: Option<u64>,
    pub min_reposts: Option<u64>,
    pub max_reposts: Option<u64>,
    pub min_replies: Option<u64>,
    pub max_replies: Option<u64>,
    pub min_engagement: Option<f64>,
    pub max_engagement: Option<f64>,
    pub subject_contains: Option<String>,
    pub subject_handle_contains: Option<String>,
    pub sort: Option<SortMode>,
    pub limit: Option<usize>,
}

/// Serialized view of one content item for UI consumers.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub uri: String,
    pub content_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub engagement_score: f64,
    pub has_media: bool,
}

impl SearchResult {
    fn of(item: &ContentItem) -> Self {
        SearchResult {
            uri: item.uri.clone(),
            content_type: item.kind.as_str().to_string(),
            text: item.text.clone().unwrap_or_default().trim().to_string(),
            created_at: item.created_at.clone(),
            likes: item.like_count,
            reposts: item.repost_count,
            replies: item.reply_count,
            engagement_score: item.engagement_score,
            has_media: item.has_media(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub summary: ContentStats,
}

fn build_filters(request: &SearchRequest) -> SearchFilters {
    let mut filters = SearchFilters::default();
    let mut keywords: Vec<String> = request.keywords.clone().unwrap_or_default();
    if let Some(keyword) = &request.keyword {
        if !keyword.trim().is_empty() {
            keywords.push(keyword.clone());
        }
    }
    if !keywords.is_empty() {
        filters.keywords = Some(keywords);
    }
    if let Some(types) = &request.content_types {
        if types.len() == 1 {
            filters.content_type = match types[0].to_lowercase().as_str() {
                "post" | "posts" => ContentTypeFilter::Posts,
                "reply" | "replies" | "comments" => ContentTypeFilter::Replies,
                "repost" | "reposts" => ContentTypeFilter::Reposts,
                "like" | "likes" => ContentTypeFilter::Likes,
                _ => ContentTypeFilter::All,
            };
        }
    }
    filters.start_date = request.start_date.clone();
    filters.end_date = request.end_date.clone();
    filters.min_likes = request.min_likes.unwrap_or(0);
    filters.max_likes = request.max_likes.unwrap_or(u64::MAX);
    filters.min_reposts = request.min_reposts.unwrap_or(0);
    filters.max_reposts = request.max_reposts.unwrap_or(u64::MAX);
    filters.min_replies = request.min_replies.unwrap_or(0);
    filters.max_replies = request.max_replies.unwrap_or(u64::MAX);
    filters.min_engagement = request.min_engagement.unwrap_or(0.0);
    filters.max_engagement = request.max_engagement.unwrap_or(f64::INFINITY);
    filters.subject_contains = request.subject_contains.clone();
    filters.subject_handle_contains = request.subject_handle_contains.clone();
    filters.sort = request.sort.unwrap_or_default();
    filters.limit = Some(request.limit.unwrap_or(250));
    filters
}

#[post("/search", format = "json", data = "<body>")]
pub async fn search(
    context: &State<AppContext>,
    session: SessionGuard,
    body: Json<SearchRequest>,
) -> ApiResult<SearchResponse> {
    let SessionGuard(session) = session;
    let request = body.into_inner();
    let items = session
        .store
        .ensure_loaded(&session.handle, &session.did, None, None, false, &NoProgress)
        .await
        .map_err(error_response)?;

    let filters = build_filters(&request);
    let engine = SearchEngine::new(context.settings.clone());

    let did_to_handle = if filters.subject_handle_contains.is_some() {
        resolve_subject_handles(session.auth.client(), &items)
            .await
            .map_err(error_response)?
    } else {
        Default::default()
    };

    // Run the page-limited search for results and an unlimited pass for the
    // multi-type filter when more than one content type was requested.
    let multi_types: Option<HashSet<String>> = request.content_types.as_ref().and_then(|types| {
        (types.len() > 1).then(|| types.iter().map(|t| t.trim().to_lowercase()).collect())
    });

    let (mut results, mut total) =
        engine.search_with_handles(&items, &filters, &did_to_handle, &NoProgress);
    if let Some(types) = &multi_types {
        let unlimited = SearchFilters {
            limit: None,
            ..filters.clone()
        };
        let (all, _) = engine.search_with_handles(&items, &unlimited, &did_to_handle, &NoProgress);
        let filtered: Vec<ContentItem> = all
            .into_iter()
            .filter(|item| types.contains(item.kind.as_str()))
            .collect();
        total = filtered.len();
        let limit = filters.limit.unwrap_or(filtered.len());
        results = filtered.into_iter().take(limit).collect();
    }

    let avg_likes = session.store.avg_likes_per_post(&session.handle).await;
    let stats = calculate_statistics(&items, Some(avg_likes));

    Ok(Json(SearchResponse {
        success: true,
        results: results.iter().map(SearchResult::of).collect(),
        total,
        summary: stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteErrorEntry {
    pub uri: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: usize,
    pub failed: usize,
    pub errors: Vec<DeleteErrorEntry>,
}

#[post("/delete", format = "json", data = "<body>")]
pub async fn delete(
    session: SessionGuard,
    body: Json<DeleteRequest>,
) -> ApiResult<DeleteResponse> {
    let SessionGuard(session) = session;
    let uris = body.into_inner().uris;
    if uris.is_empty() {
        return Err(error_response(SkymarshalError::Validation(
            "no URIs supplied".to_string(),
        )));
    }

    let result = session
        .auth
        .call_with_reauth(&NoCredentials, || {
            let deletion = Arc::clone(&session.deletion);
            let uris = uris.clone();
            async move { deletion.delete_records_by_uri(&uris, &NoProgress).await }
        })
        .await
        .map_err(error_response)?;

    let failed_uris: HashSet<&str> = result
        .errors
        .iter()
        .map(|error| error.uri.as_str())
        .collect();
    let removed: Vec<String> = uris
        .iter()
        .filter(|uri| !failed_uris.contains(uri.as_str()))
        .cloned()
        .collect();
    session.store.remove_uris(&session.handle, &removed).await;

    Ok(Json(DeleteResponse {
        success: true,
        deleted: result.deleted,
        failed: result.errors.len(),
        errors: result
            .errors
            .into_iter()
            .map(|error| DeleteErrorEntry {
                uri: error.uri,
                kind: error.kind,
                message: error.message,
            })
            .collect(),
    }))
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn items_to_csv(items: &[ContentItem]) -> String {
    let mut out = String::from(
        "uri,content_type,text,created_at,like_count,repost_count,reply_count,engagement_score\n",
    );
    for item in items {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_escape(&item.uri),
            item.kind.as_str(),
            csv_escape(item.text.as_deref().unwrap_or_default()),
            item.created_at.as_deref().unwrap_or_default(),
            item.like_count,
            item.repost_count,
            item.reply_count,
            item.engagement_score,
        ));
    }
    out
}

#[get("/export/csv")]
pub async fn export_csv(
    session: SessionGuard,
) -> Result<(ContentType, String), crate::models::ApiError> {
    let SessionGuard(session) = session;
    let items = session
        .store
        .ensure_loaded(&session.handle, &session.did, None, None, false, &NoProgress)
        .await
        .map_err(error_response)?;
    Ok((ContentType::CSV, items_to_csv(&items)))
}

#[get("/export/car")]
pub async fn export_car(
    session: SessionGuard,
) -> Result<(ContentType, Vec<u8>), crate::models::ApiError> {
    let SessionGuard(session) = session;
    let bytes = session
        .auth
        .call_with_reauth(&NoCredentials, || {
            let client = Arc::clone(session.auth.client());
            let did = session.did.clone();
            async move { client.get_repo(&did).await }
        })
        .await
        .map_err(error_response)?;
    Ok((ContentType::Binary, bytes))
}
