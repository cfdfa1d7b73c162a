#[macro_use]
extern crate serde_derive;

pub mod analytics;
pub mod deletion;
pub mod exporter;
pub mod models;
pub mod search;
pub mod settings;
pub mod store;

pub use models::{ContentItem, ContentKind, ContentSummary, SearchFilters, UserSettings};
