use anyhow::{anyhow, Result};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use skymarshal_client::{AuthManager, CredentialSource, XrpcClient};
use skymarshal_common::env::env_str;
use skymarshal_common::progress::ProgressReporter;
use skymarshal_core::deletion::DeletionEngine;
use skymarshal_core::settings::SettingsManager;
use skymarshal_core::store::ContentStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub fn storage_root() -> PathBuf {
    env_str("SKYMARSHAL_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".skymarshal")
        })
}

/// Everything a command needs: settings, an XRPC client, and the engines
/// riding on it.
pub struct CliContext {
    pub storage_root: PathBuf,
    pub settings: SettingsManager,
    pub client: Arc<XrpcClient>,
    pub auth: Arc<AuthManager>,
    pub store: Arc<ContentStore>,
    pub deletion: Arc<DeletionEngine>,
}

impl CliContext {
    pub fn init() -> Result<Self> {
        let storage_root = storage_root();
        std::fs::create_dir_all(&storage_root)?;
        let settings = SettingsManager::for_storage_root(&storage_root);
        let service =
            env_str("SKYMARSHAL_SERVICE").unwrap_or_else(|| "https://bsky.social".to_string());
        let client = Arc::new(XrpcClient::new(&service));
        let auth = Arc::new(AuthManager::new(Arc::clone(&client), &storage_root));
        let store = Arc::new(ContentStore::new(
            Arc::clone(&client),
            settings.settings().clone(),
            &storage_root,
            None,
        ));
        let deletion = Arc::new(DeletionEngine::new(Arc::clone(&client)));
        Ok(CliContext {
            storage_root,
            settings,
            client,
            auth,
            store,
            deletion,
        })
    }

    /// Resolve the active account, re-authenticating interactively if the
    /// persisted session is gone.
    pub async fn require_login(&self) -> Result<(String, String)> {
        if !self.auth.ensure_authenticated(&PromptCredentials).await {
            return Err(anyhow!("authentication failed"));
        }
        let handle = self
            .auth
            .current_handle()
            .await
            .ok_or_else(|| anyhow!("no active session"))?;
        let did = self
            .auth
            .current_did()
            .await
            .ok_or_else(|| anyhow!("no active session"))?;
        Ok((handle, did))
    }
}

/// Interactive credential prompt used when a session must be rebuilt.
pub struct PromptCredentials;

impl CredentialSource for PromptCredentials {
    fn credentials(&self) -> Option<(String, String)> {
        println!("Log in to Bluesky (examples: username.bsky.social or custom.domain)");
        let handle: String = Input::new()
            .with_prompt("Bluesky handle")
            .interact_text()
            .ok()?;
        let password: String = Password::new().with_prompt("App Password").interact().ok()?;
        Some((handle, password))
    }
}

/// Terminal spinner backing the shared progress interface.
pub struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        SpinnerReporter { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        SpinnerReporter::new()
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, operation: &str, current: usize, total: usize) {
        self.bar.set_message(format!("{operation} ({current}/{total})"));
    }
}

pub fn truncate_text(text: &str, max: usize) -> String {
    let cleaned = text.replace('\n', " ");
    if cleaned.chars().count() <= max {
        return cleaned;
    }
    let shortened: String = cleaned.chars().take(max.saturating_sub(1)).collect();
    format!("{shortened}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("multi\nline", 20), "multi line");
        let long = "x".repeat(50);
        let truncated = truncate_text(&long, 10);
        assert_eq!(truncated.chars().count(), 10);
        assert!(truncated.ends_with('…'));
    }
}
