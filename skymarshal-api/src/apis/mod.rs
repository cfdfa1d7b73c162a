use crate::context::AppContext;
use crate::session::UserSession;
use crate::SESSION_COOKIE;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::sync::Arc;

pub mod analytics;
pub mod auth;
pub mod content;
pub mod firehose;
pub mod network;
pub mod share;

/// Request guard resolving the caller's session from the session cookie or
/// a bearer token. Requests without a live session bounce with 401.
pub struct SessionGuard(pub Arc<UserSession>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(context) = req.rocket().state::<AppContext>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };
        let token = req
            .cookies()
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                req.headers()
                    .get_one("Authorization")
                    .and_then(|header| header.strip_prefix("Bearer "))
                    .map(|token| token.to_string())
            });
        match token.and_then(|token| context.sessions.get(&token)) {
            Some(session) => Outcome::Success(SessionGuard(session)),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
