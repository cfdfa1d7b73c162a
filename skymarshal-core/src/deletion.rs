use crate::models::COLLECTION_FOLLOW;
use skymarshal_client::XrpcClient;
use skymarshal_common::error::{ErrorKind, SkymarshalError};
use skymarshal_common::progress::ProgressReporter;
use skymarshal_common::syntax::RecordUri;
use skymarshal_lexicon::app::bsky::graph::Follow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Pause between delete calls so a large batch stays inside the rate-limit
/// budget.
pub const DELETE_PAUSE_MS: u64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct DeletionError {
    pub uri: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DeletionResult {
    pub deleted: usize,
    pub errors: Vec<DeletionError>,
}

/// Batched record deletion. A failing URI never aborts the batch; every
/// input ends up either counted in `deleted` or described in `errors`.
pub struct DeletionEngine {
    client: Arc<XrpcClient>,
    pause: Duration,
}

impl DeletionEngine {
    pub fn new(client: Arc<XrpcClient>) -> Self {
        DeletionEngine {
            client,
            pause: Duration::from_millis(DELETE_PAUSE_MS),
        }
    }

    pub fn with_pause(client: Arc<XrpcClient>, pause: Duration) -> Self {
        DeletionEngine { client, pause }
    }

    pub async fn delete_records_by_uri(
        &self,
        uris: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<DeletionResult, SkymarshalError> {
        let own_did = self
            .client
            .did()
            .await
            .ok_or_else(|| SkymarshalError::Auth("deletion requires a session".to_string()))?;

        let mut result = DeletionResult::default();
        // Grouped by collection so deletes hit one collection at a time;
        // BTreeMap keeps the order deterministic.
        let mut grouped: BTreeMap<String, Vec<RecordUri>> = BTreeMap::new();
        for uri in uris {
            match RecordUri::parse(uri) {
                Ok(parsed) => {
                    // Records owned by someone else are rejected locally and
                    // never sent to the wire.
                    if parsed.did != own_did {
                        result.errors.push(DeletionError {
                            uri: uri.clone(),
                            kind: ErrorKind::Conflict,
                            message: format!(
                                "record belongs to {}, not the authenticated account",
                                parsed.did
                            ),
                        });
                        continue;
                    }
                    grouped.entry(parsed.collection.clone()).or_default().push(parsed);
                }
                Err(error) => {
                    result.errors.push(DeletionError {
                        uri: uri.clone(),
                        kind: ErrorKind::Validation,
                        message: error.to_string(),
                    });
                }
            }
        }

        let total: usize = grouped.values().map(|group| group.len()).sum();
        let mut done = 0;
        for (collection, group) in grouped {
            for record in group {
                match self
                    .client
                    .delete_record(&record.did, &collection, &record.rkey)
                    .await
                {
                    Ok(()) => result.deleted += 1,
                    Err(error) if error.is_auth() => return Err(error),
                    Err(error) => {
                        result.errors.push(DeletionError {
                            uri: record.to_string(),
                            kind: error.kind(),
                            message: error.to_string(),
                        });
                    }
                }
                done += 1;
                progress.report("Deleting records", done, total);
                if done < total {
                    tokio::time::sleep(self.pause).await;
                }
            }
        }
        Ok(result)
    }

    /// Find the follow record pointing at `target_did` by walking the
    /// authenticated user's follow collection, then delete it. Full
    /// pagination without a match is a structured not-followed error.
    pub async fn unfollow(&self, target_did: &str) -> Result<(), SkymarshalError> {
        let own_did = self
            .client
            .did()
            .await
            .ok_or_else(|| SkymarshalError::Auth("unfollow requires a session".to_string()))?;

        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .client
                .list_records(&own_did, COLLECTION_FOLLOW, cursor.as_deref(), 100)
                .await?;
            for record in &page.records {
                let Ok(follow) = serde_json::from_value::<Follow>(record.value.clone()) else {
                    continue;
                };
                if follow.subject == target_did {
                    let rkey = RecordUri::parse(&record.uri)?.rkey;
                    return self.client.delete_record(&own_did, COLLECTION_FOLLOW, &rkey).await;
                }
            }
            cursor = page.cursor;
            if cursor.is_none() || page.records.is_empty() {
                return Err(SkymarshalError::NotFound(format!(
                    "not following {target_did}"
                )));
            }
        }
    }
}
