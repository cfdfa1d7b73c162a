use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use skymarshal_common::error::{ErrorKind, SkymarshalError};

/// JSON error envelope returned by every endpoint: the human-readable
/// message plus the taxonomy tag. Exception chains stay in the logs.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessageResponse {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
}

pub type ApiError = status::Custom<Json<ErrorMessageResponse>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn error_response(error: SkymarshalError) -> ApiError {
    let status = match error.kind() {
        ErrorKind::Validation => Status::BadRequest,
        ErrorKind::Auth => Status::Unauthorized,
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::RateLimited => Status::TooManyRequests,
        ErrorKind::Conflict => Status::Conflict,
        _ => Status::InternalServerError,
    };
    tracing::warn!("request failed: {error}");
    status::Custom(
        status,
        Json(ErrorMessageResponse {
            success: false,
            error: error.to_string(),
            kind: error.kind(),
        }),
    )
}

pub fn auth_required() -> ApiError {
    error_response(SkymarshalError::Auth("authentication required".to_string()))
}
