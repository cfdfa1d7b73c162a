#[macro_use]
extern crate rocket;

#[macro_use]
extern crate serde_derive;

pub mod apis;
pub mod context;
pub mod events;
pub mod jobs;
pub mod models;
pub mod session;
pub mod share;

pub use context::AppContext;

pub const SESSION_COOKIE: &str = "skymarshal_session";
