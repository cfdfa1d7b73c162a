use crate::apis::SessionGuard;
use crate::models::{error_response, ApiResult};
use rocket::serde::json::Json;
use skymarshal_common::progress::NoProgress;
use skymarshal_core::analytics::{
    analyze_engagement_correlation, analyze_sentiments, analyze_time_patterns,
    analyze_word_frequency, generate_insights, EngagementCorrelation, Insights, SentimentSummary,
    TimePatterns, WordFrequency,
};
use skymarshal_core::models::ContentItem;

async fn loaded_items(
    session: &crate::session::UserSession,
) -> Result<Vec<ContentItem>, crate::models::ApiError> {
    session
        .store
        .ensure_loaded(&session.handle, &session.did, None, None, false, &NoProgress)
        .await
        .map_err(error_response)
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub success: bool,
    pub insights: Insights,
}

#[get("/analytics/insights")]
pub async fn insights(session: SessionGuard) -> ApiResult<InsightsResponse> {
    let SessionGuard(session) = session;
    let items = loaded_items(&session).await?;
    Ok(Json(InsightsResponse {
        success: true,
        insights: generate_insights(&items),
    }))
}

#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    pub success: bool,
    pub sentiment: SentimentSummary,
}

#[get("/analytics/sentiment")]
pub async fn sentiment(session: SessionGuard) -> ApiResult<SentimentResponse> {
    let SessionGuard(session) = session;
    let items = loaded_items(&session).await?;
    Ok(Json(SentimentResponse {
        success: true,
        sentiment: analyze_sentiments(&items),
    }))
}

#[derive(Debug, Serialize)]
pub struct TimePatternsResponse {
    pub success: bool,
    pub time_patterns: TimePatterns,
}

#[get("/analytics/time-patterns")]
pub async fn time_patterns(session: SessionGuard) -> ApiResult<TimePatternsResponse> {
    let SessionGuard(session) = session;
    let items = loaded_items(&session).await?;
    Ok(Json(TimePatternsResponse {
        success: true,
        time_patterns: analyze_time_patterns(&items),
    }))
}

#[derive(Debug, Serialize)]
pub struct EngagementResponse {
    pub success: bool,
    pub engagement_correlation: EngagementCorrelation,
}

#[get("/analytics/engagement")]
pub async fn engagement(session: SessionGuard) -> ApiResult<EngagementResponse> {
    let SessionGuard(session) = session;
    let items = loaded_items(&session).await?;
    Ok(Json(EngagementResponse {
        success: true,
        engagement_correlation: analyze_engagement_correlation(&items, 20),
    }))
}

#[derive(Debug, Serialize)]
pub struct WordsResponse {
    pub success: bool,
    pub word_frequency: WordFrequency,
}

#[get("/analytics/words")]
pub async fn words(session: SessionGuard) -> ApiResult<WordsResponse> {
    let SessionGuard(session) = session;
    let items = loaded_items(&session).await?;
    Ok(Json(WordsResponse {
        success: true,
        word_frequency: analyze_word_frequency(&items, 50),
    }))
}
