use crate::apis::SessionGuard;
use crate::context::AppContext;
use crate::models::{error_response, ApiResult};
use crate::SESSION_COOKIE;
use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::Json;
use rocket::State;
use skymarshal_common::error::SkymarshalError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub handle: String,
    pub did: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[post("/auth/login", format = "json", data = "<body>")]
pub async fn login(
    context: &State<AppContext>,
    jar: &CookieJar<'_>,
    body: Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let handle = body.handle.trim();
    if handle.is_empty() || body.password.is_empty() {
        return Err(error_response(SkymarshalError::Validation(
            "handle and password are required".to_string(),
        )));
    }

    let (_client, auth, store, deletion) = context.build_session_services();
    let outcome = auth
        .login(handle, &body.password)
        .await
        .map_err(error_response)?;

    let session = context.sessions.create(
        &outcome.handle,
        &outcome.did,
        auth,
        store,
        deletion,
        outcome.used_regular_password,
    );
    jar.add(Cookie::new(SESSION_COOKIE, session.session_id.clone()));
    tracing::info!("user logged in: {}", outcome.handle);

    Ok(Json(LoginResponse {
        success: true,
        handle: outcome.handle,
        did: outcome.did,
        warning: outcome.used_regular_password.then(|| {
            "This looks like your account password. Use an app \
             password from Bluesky settings instead."
                .to_string()
        }),
    }))
}

#[derive(Debug, Serialize)]
pub struct SessionCheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
}

#[get("/auth/session")]
pub async fn check_session(session: Option<SessionGuard>) -> Json<SessionCheckResponse> {
    match session {
        Some(SessionGuard(session)) => Json(SessionCheckResponse {
            authenticated: true,
            handle: Some(session.handle.clone()),
            did: Some(session.did.clone()),
        }),
        None => Json(SessionCheckResponse {
            authenticated: false,
            handle: None,
            did: None,
        }),
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[post("/auth/logout")]
pub async fn logout(
    context: &State<AppContext>,
    jar: &CookieJar<'_>,
    session: Option<SessionGuard>,
) -> Json<LogoutResponse> {
    if let Some(SessionGuard(session)) = session {
        session.auth.logout().await;
        context.sessions.clear(&session.session_id);
    }
    jar.remove(Cookie::from(SESSION_COOKIE));
    Json(LogoutResponse { success: true })
}
