// ── Session lifecycle ──

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::debug;

use latchkey_api::Session;

use crate::directory::DeviceDirectory;
use crate::error::CoreError;

/// Owns the account session and re-authenticates on demand.
///
/// Whether the cached session is still trusted is decided by the cycle
/// runner (it tracks whether the last fetch produced valid data), not
/// here: callers pass that verdict into [`ensure`](Self::ensure).
pub struct SessionManager {
    identifier: String,
    password: SecretString,
    install_id: String,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(identifier: String, password: SecretString, install_id: String) -> Self {
        Self {
            identifier,
            password,
            install_id,
            session: Mutex::new(None),
        }
    }

    /// Return the cached session while `cache_valid` holds, otherwise
    /// authenticate once.
    ///
    /// Authentication failure surfaces to the caller as a cycle
    /// failure; there is no retry loop here.
    pub async fn ensure<D: DeviceDirectory>(
        &self,
        directory: &D,
        cache_valid: bool,
    ) -> Result<Session, CoreError> {
        let mut guard = self.session.lock().await;
        if cache_valid {
            if let Some(session) = guard.as_ref() {
                return Ok(session.clone());
            }
        }

        debug!(identifier = %self.identifier, "establishing session");
        let session = directory
            .authenticate(&self.identifier, &self.password, &self.install_id)
            .await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session (after an auth-expired failure).
    pub async fn invalidate(&self) {
        *self.session.lock().await = None;
    }
}
