#[macro_use]
extern crate serde_derive;

pub mod jetstream;
pub mod relay;

pub use relay::{FirehosePost, FirehoseRelay, FirehoseStats, RelayEvent};

pub const DEFAULT_JETSTREAM_ENDPOINT: &str =
    "wss://jetstream2.us-east.bsky.network/subscribe?wantedCollections=app.bsky.feed.post";
