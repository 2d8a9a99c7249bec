//! Connection state machine for the integration secret
//!
//! [`SecretConnector`] is the only owner of the active secret. Every change
//! goes through one of its transition methods, and every resulting state is
//! published on a watch channel for the presentation layer.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──valid──▶ Connected(Local)
//!      ▲                        │                      │ save_to_cloud
//!      │◀──────invalid──────────┘                      ▼
//!      │                              (no session) AwaitingAuthentication
//!      │                                               │ authenticated
//!      │◀──disconnect── Connected(Cloud) ◀──saved── Connecting
//! ```
//!
//! Transition methods take `&mut self`, so at most one of them is in flight
//! at a time and a late response can never overwrite a newer one.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::SecretBackend;
use crate::crypto::{decrypt_secret, encrypt_secret, KeyDerivationParams, SecretString};
use crate::error::{ErrorKind, Result, SecretError};
use crate::session::SessionCredential;
use crate::storage::LocalSecretStore;
use crate::validation::SecretValidator;

/// Where the active secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Cloud,
    Local,
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable secret
    Disconnected,
    /// A connect, save or restore is in progress
    Connecting,
    /// A cloud save is waiting for the user to log in
    AwaitingAuthentication,
    /// A secret is active
    Connected(SecretSource),
}

/// Error annotation attached to a published state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SecretError> for ConnectionError {
    fn from(error: &SecretError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

/// Published view of the connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub error: Option<ConnectionError>,
}

/// Derived status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub has_active_secret: bool,
    pub is_cloud_backed: bool,
    /// False when the last validation could not be completed (e.g. offline)
    pub is_validated: bool,
}

/// Result of a cloud save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The encrypted secret is stored in the cloud
    Saved,
    /// The user has to log in first; the save resumes on [`SecretConnector::authenticated`]
    AuthenticationRequired,
}

struct ActiveSecret {
    value: SecretString,
    source: SecretSource,
    validated: bool,
}

/// Owns the active secret and drives its lifecycle
pub struct SecretConnector {
    backend: Arc<dyn SecretBackend>,
    local: Arc<dyn LocalSecretStore>,
    validator: Arc<dyn SecretValidator>,
    kdf: KeyDerivationParams,
    session: Option<SessionCredential>,
    active: Option<ActiveSecret>,
    pending_save: bool,
    state: watch::Sender<ConnectionSnapshot>,
}

impl SecretConnector {
    /// Create a disconnected connector
    pub fn new(
        backend: Arc<dyn SecretBackend>,
        local: Arc<dyn LocalSecretStore>,
        validator: Arc<dyn SecretValidator>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionSnapshot {
            state: ConnectionState::Disconnected,
            error: None,
        });

        Self {
            backend,
            local,
            validator,
            kdf: KeyDerivationParams::default(),
            session: None,
            active: None,
            pending_save: false,
            state,
        }
    }

    /// Override the key derivation parameters
    pub fn with_kdf_params(mut self, params: KeyDerivationParams) -> Self {
        self.kdf = params;
        self
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.state.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().state
    }

    /// Derived status flags
    pub fn status(&self) -> ConnectionStatus {
        match &self.active {
            Some(active) => ConnectionStatus {
                has_active_secret: true,
                is_cloud_backed: active.source == SecretSource::Cloud,
                is_validated: active.validated,
            },
            None => ConnectionStatus::default(),
        }
    }

    /// The active secret, if any
    pub fn secret(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.value.expose())
    }

    /// Provenance of the active secret
    pub fn source(&self) -> Option<SecretSource> {
        self.active.as_ref().map(|active| active.source)
    }

    /// Whether a session credential is held
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Resolve the active secret at startup
    ///
    /// Tries the cloud first when a session is given, then the local store.
    /// Failures along the way are published as the state's error annotation
    /// and never abort the fallback.
    pub async fn restore(&mut self, session: Option<SessionCredential>) -> ConnectionStatus {
        self.session = session;
        self.pending_save = false;
        self.active = None;
        self.publish(ConnectionState::Connecting, None);

        let mut annotation: Option<SecretError> = None;
        let mut candidate: Option<(SecretString, SecretSource)> = None;

        if let Some(session) = self.session.clone() {
            match self.load_cloud(&session).await {
                Ok(Some(secret)) => candidate = Some((secret, SecretSource::Cloud)),
                Ok(None) => debug!("No cloud secret saved for this account"),
                Err(e) => {
                    warn!("Cloud secret unavailable, falling back to local store: {}", e);
                    if e.kind() == ErrorKind::AuthenticationFailed {
                        self.session = None;
                    }
                    annotation = Some(e);
                }
            }
        }

        if candidate.is_none() {
            match self.local.read_secret() {
                Ok(Some(secret)) if !secret.is_empty() => {
                    candidate = Some((SecretString::new(secret), SecretSource::Local))
                }
                Ok(_) => debug!("No local secret stored"),
                Err(e) => {
                    warn!("Could not read {}: {}", self.local.backend_name(), e);
                    annotation.get_or_insert(e);
                }
            }
        }

        let Some((secret, source)) = candidate else {
            self.publish(ConnectionState::Disconnected, annotation.as_ref());
            return self.status();
        };

        let validated = match self.validator.validate(secret.expose()).await {
            Ok(()) => true,
            Err(e) if e.is_retryable() => {
                warn!("Could not validate restored secret: {}", e);
                annotation.get_or_insert(e);
                false
            }
            Err(e) => {
                warn!("Restored secret rejected: {}", e);
                self.publish(ConnectionState::Disconnected, Some(&e));
                return self.status();
            }
        };

        info!("Restored secret from {:?} storage", source);
        self.active = Some(ActiveSecret {
            value: secret,
            source,
            validated,
        });
        self.publish(ConnectionState::Connected(source), annotation.as_ref());
        self.status()
    }

    /// Validate a user-submitted secret and make it active
    ///
    /// The secret is kept in the local store until it is saved to the cloud.
    /// On failure any previously active secret stays active.
    pub async fn connect(&mut self, secret: &str) -> Result<ConnectionStatus> {
        if secret.trim().is_empty() {
            let error = SecretError::InvalidInput("Notion secret cannot be empty".to_string());
            self.publish(self.settled_state(), Some(&error));
            return Err(error);
        }

        self.pending_save = false;
        self.publish(ConnectionState::Connecting, None);

        if let Err(e) = self.validator.validate(secret).await {
            debug!("Secret failed validation: {}", e);
            self.publish(self.settled_state(), Some(&e));
            return Err(e);
        }

        if let Err(e) = self.local.write_secret(secret) {
            warn!("Could not persist secret locally: {}", e);
            self.publish(self.settled_state(), Some(&e));
            return Err(e);
        }

        self.active = Some(ActiveSecret {
            value: SecretString::from(secret),
            source: SecretSource::Local,
            validated: true,
        });
        info!("Connected with locally stored secret");
        self.publish(ConnectionState::Connected(SecretSource::Local), None);
        Ok(self.status())
    }

    /// Encrypt the active secret and store it in the cloud
    ///
    /// Without a session this enters [`ConnectionState::AwaitingAuthentication`]
    /// and the save resumes once [`Self::authenticated`] is called.
    pub async fn save_to_cloud(&mut self) -> Result<SaveOutcome> {
        let Some(active) = &self.active else {
            let error = SecretError::InvalidInput("No active secret to save".to_string());
            self.publish(self.settled_state(), Some(&error));
            return Err(error);
        };
        let plaintext = active.value.clone();

        let Some(session) = self.session.clone() else {
            info!("Cloud save requested without a session, waiting for login");
            self.pending_save = true;
            self.publish(ConnectionState::AwaitingAuthentication, None);
            return Ok(SaveOutcome::AuthenticationRequired);
        };

        self.pending_save = false;
        self.publish(ConnectionState::Connecting, None);

        if let Err(e) = self.push_to_cloud(&session, &plaintext).await {
            warn!("Cloud save failed: {}", e);
            if e.kind() == ErrorKind::AuthenticationFailed {
                self.session = None;
            }
            self.publish(self.settled_state(), Some(&e));
            return Err(e);
        }

        if let Some(active) = self.active.as_mut() {
            active.source = SecretSource::Cloud;
        }

        // The cloud copy supersedes the plaintext one on disk
        let annotation = self.local.clear_secret().err();
        if let Some(e) = &annotation {
            warn!("Saved to cloud but could not clear local copy: {}", e);
        }

        info!("Secret saved to cloud");
        self.publish(
            ConnectionState::Connected(SecretSource::Cloud),
            annotation.as_ref(),
        );
        Ok(SaveOutcome::Saved)
    }

    /// Record a fresh session from the authentication provider
    ///
    /// Resumes a cloud save that was waiting for login. Otherwise, when no
    /// secret is active, tries to load one for the new session.
    pub async fn authenticated(
        &mut self,
        session: SessionCredential,
    ) -> Result<Option<SaveOutcome>> {
        if self.pending_save {
            self.session = Some(session);
            info!("Login completed, resuming cloud save");
            return self.save_to_cloud().await.map(Some);
        }

        if self.active.is_none() {
            self.restore(Some(session)).await;
        } else {
            self.session = Some(session);
        }
        Ok(None)
    }

    /// Abandon a cloud save that is waiting for login
    pub fn cancel_authentication(&mut self) {
        if self.pending_save {
            debug!("Pending cloud save cancelled");
            self.pending_save = false;
            self.publish(self.settled_state(), None);
        }
    }

    /// Forget the session; a cloud-sourced secret goes with it
    pub fn sign_out(&mut self) {
        self.session = None;
        self.pending_save = false;

        if self.source() == Some(SecretSource::Cloud) {
            self.active = None;
        }
        info!("Signed out");
        self.publish(self.settled_state(), None);
    }

    /// Drop the active secret and clear the local copy
    ///
    /// A secret already saved in the cloud is left untouched.
    pub fn disconnect(&mut self) -> Result<()> {
        self.active = None;
        self.pending_save = false;

        let result = self.local.clear_secret();
        if let Err(e) = &result {
            warn!("Could not clear local secret: {}", e);
        }

        info!("Disconnected");
        self.publish(ConnectionState::Disconnected, result.as_ref().err());
        result
    }

    /// Delete the user's account, which removes the cloud copy as well
    pub async fn delete_account(&mut self) -> Result<()> {
        let Some(session) = self.session.clone() else {
            return Err(SecretError::AuthenticationFailed(
                "Log in to delete your account".to_string(),
            ));
        };

        if let Err(e) = self.backend.delete_account(&session).await {
            warn!("Account deletion failed: {}", e);
            if e.kind() == ErrorKind::AuthenticationFailed {
                self.session = None;
            }
            self.publish(self.settled_state(), Some(&e));
            return Err(e);
        }

        self.session = None;
        self.active = None;
        self.pending_save = false;
        if let Err(e) = self.local.clear_secret() {
            warn!("Account deleted but could not clear local secret: {}", e);
        }

        info!("Account deleted");
        self.publish(ConnectionState::Disconnected, None);
        Ok(())
    }

    async fn load_cloud(&self, session: &SessionCredential) -> Result<Option<SecretString>> {
        let Some(blob) = self.backend.fetch_secret(session).await? else {
            return Ok(None);
        };

        let key = session.derive_key(&self.kdf)?;
        let plaintext = decrypt_secret(&blob, &key)?;
        Ok(Some(SecretString::new(plaintext)))
    }

    async fn push_to_cloud(
        &self,
        session: &SessionCredential,
        plaintext: &SecretString,
    ) -> Result<()> {
        let key = session.derive_key(&self.kdf)?;
        let blob = encrypt_secret(plaintext.expose(), &key)?;
        self.backend.save_secret(session, &blob).await
    }

    fn settled_state(&self) -> ConnectionState {
        match &self.active {
            Some(active) => ConnectionState::Connected(active.source),
            None => ConnectionState::Disconnected,
        }
    }

    fn publish(&self, state: ConnectionState, error: Option<&SecretError>) {
        self.state.send_replace(ConnectionSnapshot {
            state,
            error: error.map(ConnectionError::from),
        });
    }
}
