use crate::limiter::RateLimiter;
use crate::APP_USER_AGENT;
use serde::de::DeserializeOwned;
use serde::Serialize;
use skymarshal_common::error::SkymarshalError;
use skymarshal_lexicon::app::bsky::actor::{GetProfilesOutput, ProfileView, ProfileViewDetailed};
use skymarshal_lexicon::app::bsky::feed::{
    AuthorFeedOutput, GetLikesLike, GetLikesOutput, GetPostThreadOutput, GetPostsOutput,
    GetQuotesOutput, GetRepostedByOutput, PostView,
};
use skymarshal_lexicon::app::bsky::graph::{GetFollowersOutput, GetFollowsOutput};
use skymarshal_lexicon::com::atproto::repo::{DeleteRecordInput, ListRecordsOutput, Record};
use skymarshal_lexicon::com::atproto::server::{
    CreateSessionInput, CreateSessionOutput, RefreshSessionOutput,
};
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_SERVICE: &str = "https://bsky.social";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_RETRIES: u32 = 3;

/// Maximum page/batch sizes the wire endpoints accept.
pub const PROFILE_BATCH_LIMIT: usize = 25;
pub const POSTS_BATCH_LIMIT: usize = 25;
pub const PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionTokens {
    pub did: String,
    pub handle: String,
    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
    #[serde(rename = "refreshJwt")]
    pub refresh_jwt: String,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Typed facade over the ATProto XRPC endpoints Skymarshal consumes.
///
/// Holds the session tokens behind a RwLock so one client instance can be
/// shared across worker pools; re-authentication swaps tokens in place.
pub struct XrpcClient {
    http: reqwest::Client,
    service: String,
    limiter: RateLimiter,
    session: RwLock<Option<SessionTokens>>,
}

impl XrpcClient {
    pub fn new(service: &str) -> Self {
        XrpcClient {
            http: reqwest::Client::builder()
                .user_agent(APP_USER_AGENT)
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
                .build()
                .unwrap_or_default(),
            service: service.trim_end_matches('/').to_string(),
            limiter: RateLimiter::default(),
            session: RwLock::new(None),
        }
    }

    pub fn with_limiter(service: &str, limiter: RateLimiter) -> Self {
        let mut client = XrpcClient::new(service);
        client.limiter = limiter;
        client
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn session(&self) -> Option<SessionTokens> {
        self.session.read().await.clone()
    }

    pub async fn did(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.did.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Install previously persisted tokens, e.g. when resuming a session.
    pub async fn restore_session(&self, tokens: SessionTokens) {
        *self.session.write().await = Some(tokens);
    }

    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }

    // -- transport ---------------------------------------------------------

    fn url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.service, nsid)
    }

    async fn bearer(&self, refresh: bool) -> Option<String> {
        let session = self.session.read().await;
        session.as_ref().map(|s| {
            if refresh {
                s.refresh_jwt.clone()
            } else {
                s.access_jwt.clone()
            }
        })
    }

    async fn map_failure(nsid: &str, response: reqwest::Response) -> SkymarshalError {
        let status = response.status();
        let detail = match response.json::<XrpcErrorBody>().await {
            Ok(body) => body
                .message
                .or(body.error)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        let detail = format!("{nsid}: {detail}");
        match status.as_u16() {
            401 | 403 => SkymarshalError::Auth(detail),
            404 => SkymarshalError::NotFound(detail),
            429 => SkymarshalError::RateLimited(detail),
            400..=499 => SkymarshalError::Validation(detail),
            _ => SkymarshalError::Network(detail),
        }
    }

    /// Issue a request with rate limiting, exponential backoff on 429/5xx,
    /// and transport-error retries. Non-idempotent calls get one attempt.
    async fn execute<T: DeserializeOwned>(
        &self,
        nsid: &str,
        build: impl Fn() -> reqwest::RequestBuilder,
        points_cost: usize,
        idempotent: bool,
    ) -> Result<T, SkymarshalError> {
        self.limiter.acquire(points_cost).await;

        let attempts = if idempotent { MAX_RETRIES } else { 1 };
        let mut last_error = SkymarshalError::Internal(format!("{nsid}: no attempts made"));
        for attempt in 0..attempts {
            let result = build().send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| SkymarshalError::Network(format!("{nsid}: {e}")))?;
                    // Some procedures (deleteRecord among them) answer with
                    // an empty body.
                    let payload: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
                    return serde_json::from_slice::<T>(payload)
                        .map_err(|e| SkymarshalError::Internal(format!("{nsid}: {e}")));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let error = Self::map_failure(nsid, response).await;
                    if status == 429 && attempt + 1 < attempts {
                        let wait = Duration::from_secs_f64(f64::from(1 << attempt));
                        tracing::warn!("{nsid}: rate limited, retrying in {:?}", wait);
                        tokio::time::sleep(wait).await;
                        last_error = error;
                        continue;
                    }
                    if (500..600).contains(&status) && attempt + 1 < attempts {
                        let wait = Duration::from_secs_f64(0.5 * f64::from(1 << attempt));
                        tracing::warn!("{nsid}: server error {status}, retrying in {:?}", wait);
                        tokio::time::sleep(wait).await;
                        last_error = error;
                        continue;
                    }
                    return Err(error);
                }
                Err(error) => {
                    // Timeouts and connection failures back off like 5xx.
                    if attempt + 1 < attempts {
                        let wait = Duration::from_secs_f64(0.5 * f64::from(1 << attempt));
                        tracing::warn!("{nsid}: {error}, retrying in {:?}", wait);
                        tokio::time::sleep(wait).await;
                        last_error = SkymarshalError::Network(format!("{nsid}: {error}"));
                        continue;
                    }
                    return Err(SkymarshalError::Network(format!("{nsid}: {error}")));
                }
            }
        }
        Err(last_error)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: Vec<(String, String)>,
        points_cost: usize,
    ) -> Result<T, SkymarshalError> {
        let url = self.url(nsid);
        let bearer = self.bearer(false).await;
        self.execute(
            nsid,
            || {
                let mut request = self.http.get(&url).query(&params);
                if let Some(token) = &bearer {
                    request = request.bearer_auth(token);
                }
                request
            },
            points_cost,
            true,
        )
        .await
    }

    async fn procedure<I: Serialize, T: DeserializeOwned>(
        &self,
        nsid: &str,
        input: &I,
        idempotent: bool,
    ) -> Result<T, SkymarshalError> {
        let url = self.url(nsid);
        let bearer = self.bearer(false).await;
        self.execute(
            nsid,
            || {
                let mut request = self.http.post(&url).json(input);
                if let Some(token) = &bearer {
                    request = request.bearer_auth(token);
                }
                request
            },
            1,
            idempotent,
        )
        .await
    }

    // -- server ------------------------------------------------------------

    pub async fn create_session(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<CreateSessionOutput, SkymarshalError> {
        let input = CreateSessionInput {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        let output: CreateSessionOutput = self
            .procedure("com.atproto.server.createSession", &input, false)
            .await?;
        self.restore_session(SessionTokens {
            did: output.did.clone(),
            handle: output.handle.clone(),
            access_jwt: output.access_jwt.clone(),
            refresh_jwt: output.refresh_jwt.clone(),
        })
        .await;
        Ok(output)
    }

    /// Exchange the refresh token for fresh access tokens.
    pub async fn refresh_session(&self) -> Result<RefreshSessionOutput, SkymarshalError> {
        let bearer = self.bearer(true).await.ok_or_else(|| {
            SkymarshalError::Auth("no session available to refresh".to_string())
        })?;
        let nsid = "com.atproto.server.refreshSession";
        let url = self.url(nsid);
        let output: RefreshSessionOutput = self
            .execute(
                nsid,
                || self.http.post(&url).bearer_auth(&bearer),
                1,
                false,
            )
            .await?;
        self.restore_session(SessionTokens {
            did: output.did.clone(),
            handle: output.handle.clone(),
            access_jwt: output.access_jwt.clone(),
            refresh_jwt: output.refresh_jwt.clone(),
        })
        .await;
        Ok(output)
    }

    // -- actor -------------------------------------------------------------

    pub async fn get_profile(&self, actor: &str) -> Result<ProfileViewDetailed, SkymarshalError> {
        self.get(
            "app.bsky.actor.getProfile",
            vec![("actor".to_string(), actor.to_string())],
            1,
        )
        .await
    }

    /// Batch profile lookup; at most 25 actors per call.
    pub async fn get_profiles(
        &self,
        actors: &[String],
    ) -> Result<Vec<ProfileViewDetailed>, SkymarshalError> {
        if actors.is_empty() {
            return Ok(Vec::new());
        }
        let batch = &actors[..actors.len().min(PROFILE_BATCH_LIMIT)];
        let params = batch
            .iter()
            .map(|actor| ("actors".to_string(), actor.clone()))
            .collect();
        let output: GetProfilesOutput = self.get("app.bsky.actor.getProfiles", params, 1).await?;
        Ok(output.profiles)
    }

    // -- graph -------------------------------------------------------------

    pub async fn get_followers(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<GetFollowersOutput, SkymarshalError> {
        let mut params = vec![
            ("actor".to_string(), actor.to_string()),
            ("limit".to_string(), limit.min(PAGE_LIMIT).to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        self.get("app.bsky.graph.getFollowers", params, 1).await
    }

    pub async fn get_follows(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<GetFollowsOutput, SkymarshalError> {
        let mut params = vec![
            ("actor".to_string(), actor.to_string()),
            ("limit".to_string(), limit.min(PAGE_LIMIT).to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        self.get("app.bsky.graph.getFollows", params, 1).await
    }

    /// Paginate followers until `max` entries are collected or the cursor
    /// runs out. Empty batches terminate.
    pub async fn get_all_followers(
        &self,
        actor: &str,
        max: Option<usize>,
    ) -> Result<Vec<ProfileView>, SkymarshalError> {
        let mut collected: Vec<ProfileView> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let output = self
                .get_followers(actor, cursor.as_deref(), PAGE_LIMIT)
                .await?;
            let batch_empty = output.followers.is_empty();
            collected.extend(output.followers);
            if let Some(max) = max {
                if collected.len() >= max {
                    collected.truncate(max);
                    return Ok(collected);
                }
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    pub async fn get_all_follows(
        &self,
        actor: &str,
        max: Option<usize>,
    ) -> Result<Vec<ProfileView>, SkymarshalError> {
        let mut collected: Vec<ProfileView> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let output = self.get_follows(actor, cursor.as_deref(), PAGE_LIMIT).await?;
            let batch_empty = output.follows.is_empty();
            collected.extend(output.follows);
            if let Some(max) = max {
                if collected.len() >= max {
                    collected.truncate(max);
                    return Ok(collected);
                }
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    // -- feed --------------------------------------------------------------

    pub async fn get_author_feed(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<AuthorFeedOutput, SkymarshalError> {
        let mut params = vec![
            ("actor".to_string(), actor.to_string()),
            ("limit".to_string(), limit.min(PAGE_LIMIT).to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        self.get("app.bsky.feed.getAuthorFeed", params, 1).await
    }

    /// Hydrated post views; at most 25 URIs per call.
    pub async fn get_posts(&self, uris: &[String]) -> Result<Vec<PostView>, SkymarshalError> {
        if uris.is_empty() {
            return Ok(Vec::new());
        }
        let batch = &uris[..uris.len().min(POSTS_BATCH_LIMIT)];
        let params = batch
            .iter()
            .map(|uri| ("uris".to_string(), uri.clone()))
            .collect();
        let output: GetPostsOutput = self.get("app.bsky.feed.getPosts", params, 1).await?;
        Ok(output.posts)
    }

    /// Actors that liked a post, capped at `limit` entries across pages.
    pub async fn get_all_likes(
        &self,
        uri: &str,
        max: usize,
    ) -> Result<Vec<GetLikesLike>, SkymarshalError> {
        let mut collected: Vec<GetLikesLike> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![
                ("uri".to_string(), uri.to_string()),
                ("limit".to_string(), PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &cursor {
                params.push(("cursor".to_string(), cursor.clone()));
            }
            let output: GetLikesOutput = self.get("app.bsky.feed.getLikes", params, 1).await?;
            let batch_empty = output.likes.is_empty();
            collected.extend(output.likes);
            if collected.len() >= max {
                collected.truncate(max);
                return Ok(collected);
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    /// Actors that reposted a post, capped at `limit` entries across pages.
    pub async fn get_all_reposted_by(
        &self,
        uri: &str,
        max: usize,
    ) -> Result<Vec<ProfileView>, SkymarshalError> {
        let mut collected: Vec<ProfileView> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![
                ("uri".to_string(), uri.to_string()),
                ("limit".to_string(), PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &cursor {
                params.push(("cursor".to_string(), cursor.clone()));
            }
            let output: GetRepostedByOutput =
                self.get("app.bsky.feed.getRepostedBy", params, 1).await?;
            let batch_empty = output.reposted_by.is_empty();
            collected.extend(output.reposted_by);
            if collected.len() >= max {
                collected.truncate(max);
                return Ok(collected);
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    /// Quote posts of a post, capped at `limit` entries across pages.
    pub async fn get_all_quotes(
        &self,
        uri: &str,
        max: usize,
    ) -> Result<Vec<PostView>, SkymarshalError> {
        let mut collected: Vec<PostView> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut params = vec![
                ("uri".to_string(), uri.to_string()),
                ("limit".to_string(), PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &cursor {
                params.push(("cursor".to_string(), cursor.clone()));
            }
            let output: GetQuotesOutput = self.get("app.bsky.feed.getQuotes", params, 1).await?;
            let batch_empty = output.posts.is_empty();
            collected.extend(output.posts);
            if collected.len() >= max {
                collected.truncate(max);
                return Ok(collected);
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    pub async fn get_post_thread(
        &self,
        uri: &str,
        depth: usize,
    ) -> Result<GetPostThreadOutput, SkymarshalError> {
        let params = vec![
            ("uri".to_string(), uri.to_string()),
            ("depth".to_string(), depth.to_string()),
            ("parentHeight".to_string(), "0".to_string()),
        ];
        self.get("app.bsky.feed.getPostThread", params, 1).await
    }

    // -- repo --------------------------------------------------------------

    pub async fn list_records(
        &self,
        repo: &str,
        collection: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListRecordsOutput, SkymarshalError> {
        let mut params = vec![
            ("repo".to_string(), repo.to_string()),
            ("collection".to_string(), collection.to_string()),
            ("limit".to_string(), limit.min(PAGE_LIMIT).to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        self.get("com.atproto.repo.listRecords", params, 1).await
    }

    /// Walk a repo collection until `max` records are collected or the
    /// cursor runs out.
    pub async fn list_all_records(
        &self,
        repo: &str,
        collection: &str,
        max: Option<usize>,
    ) -> Result<Vec<Record>, SkymarshalError> {
        let mut collected: Vec<Record> = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page_limit = match max {
                Some(max) => (max - collected.len()).min(PAGE_LIMIT).max(1),
                None => PAGE_LIMIT,
            };
            let output = self
                .list_records(repo, collection, cursor.as_deref(), page_limit)
                .await?;
            let batch_empty = output.records.is_empty();
            collected.extend(output.records);
            if let Some(max) = max {
                if collected.len() >= max {
                    collected.truncate(max);
                    return Ok(collected);
                }
            }
            cursor = output.cursor;
            if cursor.is_none() || batch_empty {
                return Ok(collected);
            }
        }
    }

    /// Deleting a record is idempotent on the PDS, so retries are safe.
    pub async fn delete_record(
        &self,
        repo: &str,
        collection: &str,
        rkey: &str,
    ) -> Result<(), SkymarshalError> {
        let input = DeleteRecordInput {
            repo: repo.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        };
        let _: serde_json::Value = self
            .procedure("com.atproto.repo.deleteRecord", &input, true)
            .await?;
        Ok(())
    }

    // -- sync --------------------------------------------------------------

    /// Download the full repo as CAR bytes (`com.atproto.sync.getRepo`).
    pub async fn get_repo(&self, did: &str) -> Result<Vec<u8>, SkymarshalError> {
        let nsid = "com.atproto.sync.getRepo";
        self.limiter.acquire(1).await;
        let url = format!("{}?did={}", self.url(nsid), urlencoding::encode(did));
        let bearer = self.bearer(false).await;
        let mut request = self.http.get(&url);
        if let Some(token) = &bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SkymarshalError::Network(format!("{nsid}: {e}")))?;
        if !response.status().is_success() {
            return Err(Self::map_failure(nsid, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SkymarshalError::Network(format!("{nsid}: {e}")))?;
        Ok(bytes.to_vec())
    }
}
