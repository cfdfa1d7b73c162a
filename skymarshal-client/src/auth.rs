use crate::xrpc::{SessionTokens, XrpcClient};
use skymarshal_common::error::SkymarshalError;
use skymarshal_common::syntax::validate_handle;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SESSION_FILE_NAME: &str = "session.json";

/// Collaborator that can produce credentials when a session has to be
/// rebuilt from scratch: a CLI prompt, an HTTP login form, or nothing.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self) -> Option<(String, String)>;
}

/// Never supplies credentials; re-auth can only succeed via the persisted
/// session blob.
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn credentials(&self) -> Option<(String, String)> {
        None
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionBlob {
    handle: String,
    did: String,
    session: SessionTokens,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub handle: String,
    pub did: String,
    pub used_regular_password: bool,
}

/// App passwords have the fixed `xxxx-xxxx-xxxx-xxxx` shape. Anything else
/// is treated as a probable full-account password, which earns a warning but
/// never a refusal.
pub fn is_likely_app_password(password: &str) -> bool {
    if password.len() != 19 {
        return false;
    }
    let parts: Vec<&str> = password.split('-').collect();
    parts.len() == 4 && parts.iter().all(|part| part.len() == 4)
}

/// Owns login, session persistence, and the single-retry re-auth rule.
pub struct AuthManager {
    client: Arc<XrpcClient>,
    session_file: PathBuf,
}

impl AuthManager {
    pub fn new(client: Arc<XrpcClient>, config_dir: &Path) -> Self {
        AuthManager {
            client,
            session_file: config_dir.join(SESSION_FILE_NAME),
        }
    }

    pub fn client(&self) -> &Arc<XrpcClient> {
        &self.client
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.is_authenticated().await
    }

    pub async fn current_did(&self) -> Option<String> {
        self.client.did().await
    }

    pub async fn current_handle(&self) -> Option<String> {
        self.client.session().await.map(|s| s.handle)
    }

    pub async fn login(
        &self,
        handle: &str,
        password: &str,
    ) -> Result<LoginOutcome, SkymarshalError> {
        let normalized = validate_handle(handle)?;
        let used_regular_password = !is_likely_app_password(password);
        if used_regular_password {
            tracing::warn!(
                "password for {normalized} does not look like an app password; \
                 consider creating one in Bluesky settings"
            );
        }
        let output = self.client.create_session(&normalized, password).await?;
        self.save_session().await;
        Ok(LoginOutcome {
            handle: output.handle,
            did: output.did,
            used_regular_password,
        })
    }

    /// Persist the live session to disk. Best-effort: a failure here only
    /// costs a future re-login.
    pub async fn save_session(&self) {
        let Some(session) = self.client.session().await else {
            return;
        };
        let blob = SessionBlob {
            handle: session.handle.clone(),
            did: session.did.clone(),
            session,
        };
        if let Some(parent) = self.session_file.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::debug!("could not create session dir: {error}");
                return;
            }
        }
        match serde_json::to_vec(&blob) {
            Ok(bytes) => {
                if let Err(error) = std::fs::write(&self.session_file, bytes) {
                    tracing::debug!("could not persist session: {error}");
                }
            }
            Err(error) => tracing::debug!("could not serialize session: {error}"),
        }
    }

    /// Restore a persisted session and revalidate it with a token refresh.
    /// A refresh rejected as unauthenticated clears the stale blob.
    pub async fn try_resume_session(&self) -> bool {
        let bytes = match std::fs::read(&self.session_file) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let blob: SessionBlob = match serde_json::from_slice(&bytes) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::debug!("ignoring unreadable session blob: {error}");
                return false;
            }
        };
        self.client.restore_session(blob.session).await;
        match self.client.refresh_session().await {
            Ok(_) => {
                self.save_session().await;
                true
            }
            Err(error) if error.is_auth() => {
                self.client.clear_session().await;
                let _ = std::fs::remove_file(&self.session_file);
                false
            }
            // Offline is not a reason to throw the session away.
            Err(_) => true,
        }
    }

    /// True when a live client exists, after resuming a persisted session,
    /// or after a fresh login with credentials from the collaborator UI.
    pub async fn ensure_authenticated(&self, credentials: &dyn CredentialSource) -> bool {
        if self.is_authenticated().await {
            return true;
        }
        if self.try_resume_session().await {
            return true;
        }
        match credentials.credentials() {
            Some((handle, password)) => self.login(&handle, &password).await.is_ok(),
            None => false,
        }
    }

    /// Run `operation`; on an `Auth` failure, re-authenticate once and retry,
    /// but only when no live client exists. A second failure surfaces to the
    /// caller so bulk operations cannot trigger re-auth storms.
    pub async fn call_with_reauth<T, F, Fut>(
        &self,
        credentials: &dyn CredentialSource,
        operation: F,
    ) -> Result<T, SkymarshalError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SkymarshalError>>,
    {
        match operation().await {
            Err(error) if error.is_auth() => {
                if self.is_authenticated().await {
                    return Err(SkymarshalError::Auth(format!(
                        "call failed despite a live session: {error}"
                    )));
                }
                if !self.ensure_authenticated(credentials).await {
                    return Err(SkymarshalError::Auth(
                        "re-authentication failed".to_string(),
                    ));
                }
                operation().await
            }
            result => result,
        }
    }

    pub async fn logout(&self) {
        self.client.clear_session().await;
        if let Err(error) = std::fs::remove_file(&self.session_file) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("could not remove session blob: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_app_password_shape() {
        assert!(is_likely_app_password("abcd-efgh-ijkl-mnop"));
        assert!(!is_likely_app_password("hunter2"));
        assert!(!is_likely_app_password("abcde-fgh-ijkl-mnop"));
        assert!(!is_likely_app_password("abcd-efgh-ijkl-mno"));
    }

    fn manager_with_dir(dir: &Path) -> AuthManager {
        AuthManager::new(Arc::new(XrpcClient::new("http://localhost:1")), dir)
    }

    #[tokio::test]
    async fn test_session_blob_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        manager
            .client()
            .restore_session(SessionTokens {
                did: "did:plc:alice".into(),
                handle: "alice.bsky.social".into(),
                access_jwt: "a1".into(),
                refresh_jwt: "r1".into(),
            })
            .await;
        manager.save_session().await;

        let bytes = std::fs::read(dir.path().join(SESSION_FILE_NAME)).unwrap();
        let blob: SessionBlob = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(blob.did, "did:plc:alice");
        assert_eq!(blob.session.access_jwt, "a1");
    }

    #[tokio::test]
    async fn test_logout_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        manager
            .client()
            .restore_session(SessionTokens {
                did: "did:plc:alice".into(),
                handle: "alice.bsky.social".into(),
                access_jwt: "a1".into(),
                refresh_jwt: "r1".into(),
            })
            .await;
        manager.save_session().await;
        assert!(dir.path().join(SESSION_FILE_NAME).exists());

        manager.logout().await;
        assert!(!dir.path().join(SESSION_FILE_NAME).exists());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_call_with_reauth_passes_through_success() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        let result = manager
            .call_with_reauth(&NoCredentials, || async { Ok::<_, SkymarshalError>(7) })
            .await
            .unwrap();
        assert_eq!(result, 7);
    }

    #[tokio::test]
    async fn test_call_with_reauth_does_not_loop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        let calls = AtomicUsize::new(0);
        let error = manager
            .call_with_reauth(&NoCredentials, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(SkymarshalError::Auth("expired".into())) }
            })
            .await
            .unwrap_err();
        assert!(error.is_auth());
        // No session blob and no credential source: the operation is not
        // retried at all.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_with_reauth_surfaces_error_with_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        manager
            .client()
            .restore_session(SessionTokens {
                did: "did:plc:alice".into(),
                handle: "alice.bsky.social".into(),
                access_jwt: "a1".into(),
                refresh_jwt: "r1".into(),
            })
            .await;
        let calls = AtomicUsize::new(0);
        let error = manager
            .call_with_reauth(&NoCredentials, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(SkymarshalError::Auth("forbidden".into())) }
            })
            .await
            .unwrap_err();
        assert!(error.is_auth());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_auth_errors_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_dir(dir.path());
        let calls = AtomicUsize::new(0);
        let error = manager
            .call_with_reauth(&NoCredentials, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(SkymarshalError::NotFound("gone".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(error, SkymarshalError::NotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
