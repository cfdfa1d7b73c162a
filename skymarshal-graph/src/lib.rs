#[macro_use]
extern crate serde_derive;

pub mod analysis;
pub mod bots;
pub mod cache;
pub mod fetcher;
pub mod result_cache;
pub mod schema;
pub mod types;

pub use analysis::GraphAnalytics;
pub use cache::ProfileCache;
pub use fetcher::{FetchOptions, NetworkFetcher};
pub use types::{FetchMode, NetworkEdge, NetworkNode, NetworkSnapshot};
