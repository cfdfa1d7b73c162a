use crate::apis::SessionGuard;
use crate::context::AppContext;
use crate::models::{error_response, ApiResult};
use rocket::serde::json::Json;
use rocket::State;
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::progress::NoProgress;

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub success: bool,
    pub id: String,
}

/// Freeze a snapshot of one record behind a shareable permalink id.
#[post("/share", format = "json", data = "<body>")]
pub async fn create_share(
    context: &State<AppContext>,
    session: SessionGuard,
    body: Json<ShareRequest>,
) -> ApiResult<ShareResponse> {
    let SessionGuard(session) = session;
    let uri = body.into_inner().uri;
    let items = session
        .store
        .ensure_loaded(&session.handle, &session.did, None, None, false, &NoProgress)
        .await
        .map_err(error_response)?;
    let item = items.iter().find(|item| item.uri == uri).ok_or_else(|| {
        error_response(SkymarshalError::NotFound(format!(
            "{uri} is not in the loaded dataset"
        )))
    })?;

    let mut snapshot = serde_json::to_value(item).map_err(SkymarshalError::from)
        .map_err(error_response)?;
    if let Some(map) = snapshot.as_object_mut() {
        map.insert(
            "author_handle".to_string(),
            serde_json::Value::String(session.handle.clone()),
        );
    }
    let id = context
        .share
        .create_share(&snapshot)
        .map_err(error_response)?;
    Ok(Json(ShareResponse { success: true, id }))
}

#[derive(Debug, Serialize)]
pub struct SharedPostResponse {
    pub success: bool,
    pub post: serde_json::Value,
}

/// Public: anyone holding the permalink can read the snapshot.
#[get("/share/<id>")]
pub async fn get_share(context: &State<AppContext>, id: &str) -> ApiResult<SharedPostResponse> {
    let post = context
        .share
        .get_share(id)
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(SkymarshalError::NotFound(format!("no shared post '{id}'")))
        })?;
    Ok(Json(SharedPostResponse {
        success: true,
        post,
    }))
}
