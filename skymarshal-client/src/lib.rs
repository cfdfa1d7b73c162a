#[macro_use]
extern crate serde_derive;

pub mod auth;
pub mod limiter;
pub mod xrpc;

pub use auth::{AuthManager, CredentialSource, NoCredentials};
pub use limiter::RateLimiter;
pub use xrpc::{SessionTokens, XrpcClient};

pub const APP_USER_AGENT: &str = concat!("skymarshal/", env!("CARGO_PKG_VERSION"));
