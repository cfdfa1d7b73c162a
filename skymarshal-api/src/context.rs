use crate::events::EventBus;
use crate::jobs::JobRegistry;
use crate::session::SessionRegistry;
use crate::share::{SharedPostStore, SHARE_DB_FILE};
use skymarshal_client::{AuthManager, XrpcClient};
use skymarshal_common::env::env_str;
use skymarshal_common::error::SkymarshalError;
use skymarshal_core::deletion::DeletionEngine;
use skymarshal_core::settings::SettingsManager;
use skymarshal_core::store::ContentStore;
use skymarshal_firehose::{FirehoseRelay, DEFAULT_JETSTREAM_ENDPOINT};
use skymarshal_graph::cache::{ProfileCache, PROFILE_CACHE_FILE};
use skymarshal_graph::result_cache::{SnapshotCache, DEFAULT_SNAPSHOT_TTL};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state threaded through every endpoint. Built once at startup and
/// managed by the rocket instance.
pub struct AppContext {
    pub storage_root: PathBuf,
    pub service_url: String,
    pub settings: skymarshal_core::models::UserSettings,
    pub sessions: Arc<SessionRegistry>,
    pub jobs: Arc<JobRegistry>,
    pub bus: EventBus,
    pub relay: Arc<FirehoseRelay>,
    pub share: SharedPostStore,
    pub profile_cache: Arc<ProfileCache>,
    pub snapshots: SnapshotCache,
}

pub fn default_storage_root() -> PathBuf {
    env_str("SKYMARSHAL_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".skymarshal")
        })
}

impl AppContext {
    pub fn init() -> Result<Self, SkymarshalError> {
        let storage_root = default_storage_root();
        std::fs::create_dir_all(&storage_root)?;
        let service_url =
            env_str("SKYMARSHAL_SERVICE").unwrap_or_else(|| "https://bsky.social".to_string());
        let settings = SettingsManager::for_storage_root(&storage_root)
            .settings()
            .clone();
        let relay_endpoint = env_str("SKYMARSHAL_JETSTREAM")
            .unwrap_or_else(|| DEFAULT_JETSTREAM_ENDPOINT.to_string());

        Ok(AppContext {
            share: SharedPostStore::open(&storage_root.join(SHARE_DB_FILE))?,
            profile_cache: Arc::new(ProfileCache::open(
                &storage_root.join(PROFILE_CACHE_FILE),
            )?),
            snapshots: SnapshotCache::open(
                &storage_root.join("network_cache"),
                DEFAULT_SNAPSHOT_TTL,
            )?,
            relay: FirehoseRelay::new(&relay_endpoint),
            sessions: Arc::new(SessionRegistry::default()),
            jobs: Arc::new(JobRegistry::default()),
            bus: EventBus::new(),
            settings,
            service_url,
            storage_root,
        })
    }

    /// One client/auth/engine bundle per login. The client is shared by the
    /// session's store and deletion engine so re-auth swaps tokens for all
    /// of them at once.
    pub fn build_session_services(
        &self,
    ) -> (
        Arc<XrpcClient>,
        Arc<AuthManager>,
        Arc<ContentStore>,
        Arc<DeletionEngine>,
    ) {
        let client = Arc::new(XrpcClient::new(&self.service_url));
        let auth = Arc::new(AuthManager::new(Arc::clone(&client), &self.storage_root));
        let store = Arc::new(ContentStore::new(
            Arc::clone(&client),
            self.settings.clone(),
            &self.storage_root,
            None,
        ));
        let deletion = Arc::new(DeletionEngine::new(Arc::clone(&client)));
        (client, auth, store, deletion)
    }
}
