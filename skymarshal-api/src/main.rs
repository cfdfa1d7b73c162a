#[macro_use]
extern crate rocket;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Request, Response};
use skymarshal_api::apis::{analytics, auth, content, firehose, network, share};
use skymarshal_api::events::ServerEvent;
use skymarshal_api::models::ErrorMessageResponse;
use skymarshal_api::AppContext;
use skymarshal_common::error::ErrorKind;
use skymarshal_firehose::RelayEvent;
use std::sync::Arc;
use std::time::Duration;

/// Decorates every response with the CORS headers the web UI needs. The
/// API is GET/POST only, and the session cookie requires credentialed
/// requests, so the origin should be pinned with
/// `SKYMARSHAL_ALLOWED_ORIGIN` in any real deployment.
pub struct Cors {
    allowed_origin: String,
}

impl Cors {
    fn from_env() -> Self {
        Cors {
            allowed_origin: skymarshal_common::env::env_str("SKYMARSHAL_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "*".to_string()),
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Skymarshal CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new(
            "Access-Control-Allow-Origin",
            self.allowed_origin.clone(),
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[get("/")]
async fn index() -> &'static str {
    "Skymarshal account management API. Endpoints live under /api/."
}

#[get("/health")]
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Answers browser preflight requests with an empty 200; the CORS fairing
/// fills in the headers.
#[options("/<_..>")]
async fn preflight() {}

#[catch(401)]
async fn unauthorized() -> Json<ErrorMessageResponse> {
    Json(ErrorMessageResponse {
        success: false,
        error: "Authentication required".to_string(),
        kind: ErrorKind::Auth,
    })
}

#[catch(default)]
async fn default_catcher(status: Status, _request: &Request<'_>) -> Json<ErrorMessageResponse> {
    let kind = match status.code {
        400 => ErrorKind::Validation,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        _ => ErrorKind::Internal,
    };
    Json(ErrorMessageResponse {
        success: false,
        error: status.reason().unwrap_or("Request failed").to_string(),
        kind,
    })
}

#[launch]
async fn rocket() -> _ {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let context = match AppContext::init() {
        Ok(context) => context,
        Err(error) => {
            tracing::error!("could not initialize application state: {error}");
            std::process::exit(1);
        }
    };

    // Bridge firehose relay events onto the client-facing event bus.
    let bus = context.bus.clone();
    let mut relay_events = context.relay.subscribe();
    tokio::spawn(async move {
        loop {
            match relay_events.recv().await {
                Ok(RelayEvent::Post(post)) => bus.publish(ServerEvent::FirehosePost(post)),
                Ok(RelayEvent::Stats(stats)) => bus.publish(ServerEvent::FirehoseStats(stats)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    if skymarshal_common::env::env_bool("SKYMARSHAL_FIREHOSE_AUTOSTART").unwrap_or(false) {
        tokio::spawn(Arc::clone(&context.relay).run());
        tokio::spawn(Arc::clone(&context.relay).stats_loop());
    }

    rocket::build()
        .manage(context)
        .attach(Cors::from_env())
        .attach(SessionSweeper)
        .mount("/", routes![index, health, preflight])
        .mount(
            "/api",
            routes![
                auth::login,
                auth::check_session,
                auth::logout,
                content::load,
                content::summary,
                content::search,
                content::delete,
                content::export_csv,
                content::export_car,
                share::create_share,
                share::get_share,
                analytics::insights,
                analytics::sentiment,
                analytics::time_patterns,
                analytics::engagement,
                analytics::words,
                network::start_fetch,
                network::job_status,
                network::job_result,
                firehose::stats,
                firehose::recent,
                firehose::start,
                firehose::stop,
                firehose::events,
            ],
        )
        .register("/", catchers![unauthorized, default_catcher])
}

/// Hourly sweep of expired sessions.
pub struct SessionSweeper;

#[rocket::async_trait]
impl Fairing for SessionSweeper {
    fn info(&self) -> Info {
        Info {
            name: "Expired session cleanup",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &rocket::Rocket<rocket::Orbit>) {
        let Some(context) = rocket.state::<AppContext>() else {
            return;
        };
        let sessions = Arc::clone(&context.sessions);
        let mut shutdown = rocket.shutdown();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        sessions.cleanup_expired();
                    }
                    _ = &mut shutdown => break,
                }
            }
        });
    }
}
