use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use crate::credential::{Credential, CredentialListener, CredentialStore};
use crate::guard::{self, Capability, Decision};
use crate::mvi::Reducer;
use crate::remote::ApiError;

use super::resolver::IdentityResolver;
use super::state::{Identity, Session, SessionIntent, SessionReducer, SessionStatus};

/// Failures recorded for observability. They never escape to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Identity resolution failed: {0}")]
    Resolution(#[from] ApiError),

    #[error("Credential storage failed: {0}")]
    Storage(String),
}

/// Derives the session from the credential store.
///
/// Every credential change starts a new resolution tagged with an epoch and
/// the credential it targets. A resolution only lands if both still match
/// when its response arrives, so the last credential always wins.
///
/// Resolutions run on spawned Tokio tasks; all methods that can start one
/// must be called within a Tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    me: Weak<Inner>,
    store: CredentialStore,
    resolver: Arc<dyn IdentityResolver>,
    machine: Mutex<Machine>,
    tx: watch::Sender<Session>,
}

#[derive(Default)]
struct Machine {
    session: Session,
    /// Bumped on every credential change, refresh and sign-out.
    epoch: u64,
    last_error: Option<SessionError>,
}

impl SessionManager {
    /// Build the manager and subscribe it to `store`. The session stays
    /// `Uninitialized` until [`start`](Self::start).
    pub fn new(store: CredentialStore, resolver: Arc<dyn IdentityResolver>) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            store: store.clone(),
            resolver,
            machine: Mutex::new(Machine::default()),
            tx,
        });
        let listener: Weak<dyn CredentialListener> = Arc::downgrade(&inner) as _;
        store.subscribe(listener);
        Self { inner }
    }

    /// Read the stored credential and leave `Uninitialized`.
    pub fn start(&self) {
        match self.inner.store.get() {
            Some(credential) => self.inner.begin(credential),
            None => {
                tracing::debug!("No stored credential at startup");
                self.inner.transition(SessionIntent::NoCredential);
            }
        }
    }

    pub fn session(&self) -> Session {
        self.inner.machine.lock().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.machine.lock().session.is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.machine.lock().session.is_authenticated()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.machine.lock().session.identity.clone()
    }

    /// Most recent failure, kept until the next successful resolution.
    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.machine.lock().last_error.clone()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Store a new credential; resolution starts before this returns.
    ///
    /// Setting the credential already stored re-resolves it unless the
    /// session is authenticated or already checking, so signing in again
    /// after a failed resolution is never a silent no-op.
    pub fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        let unchanged = self
            .inner
            .store
            .get()
            .is_some_and(|current| current.expose() == token);
        if unchanged {
            if !matches!(
                self.session().status,
                SessionStatus::Authenticated | SessionStatus::Checking
            ) {
                tracing::debug!("Credential unchanged, resolving again");
                self.refresh_identity();
            }
            return;
        }

        if let Err(err) = self.inner.store.set(token) {
            self.inner.record_storage_error(err.to_string());
        }
    }

    pub fn clear_credential(&self) {
        if let Err(err) = self.inner.store.clear() {
            self.inner.record_storage_error(err.to_string());
        }
    }

    /// Resolve the current credential again, e.g. after a profile edit.
    pub fn refresh_identity(&self) {
        match self.inner.store.get() {
            Some(credential) => self.inner.begin(credential),
            None => {
                self.inner.transition(SessionIntent::NoCredential);
            }
        }
    }

    /// Watch every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    /// Wait until the session is neither `Uninitialized` nor `Checking`.
    pub async fn settled(&self) -> Session {
        let mut rx = self.inner.tx.subscribe();
        let settled = match rx.wait_for(|s| !s.is_loading()).await {
            Ok(session) => Some(session.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.session())
    }

    /// Guard decision on the current snapshot; `Suspend` while loading.
    pub fn decide(&self, capability: &Capability) -> Decision {
        guard::decide(&self.session(), capability)
    }

    /// Guard decision once the session has settled. Never returns `Suspend`.
    pub async fn authorize(&self, capability: &Capability) -> Decision {
        guard::decide(&self.settled().await, capability)
    }
}

impl Inner {
    /// Apply `intent` under a new epoch, cancelling any in-flight resolution.
    fn transition(&self, intent: SessionIntent) -> u64 {
        let mut machine = self.machine.lock();
        machine.epoch += 1;
        self.apply(&mut machine, intent);
        machine.epoch
    }

    fn apply(&self, machine: &mut Machine, intent: SessionIntent) {
        let current = std::mem::take(&mut machine.session);
        machine.session = SessionReducer::reduce(current, intent);
        self.tx.send_replace(machine.session.clone());
    }

    fn begin(&self, credential: Credential) {
        let epoch = self.transition(SessionIntent::ResolutionStarted);
        let Some(me) = self.me.upgrade() else {
            return;
        };
        tracing::debug!(epoch, "Resolving identity");

        tokio::spawn(async move {
            let result = me.resolver.resolve(&credential).await;
            me.complete(epoch, &credential, result);
        });
    }

    fn complete(&self, epoch: u64, credential: &Credential, result: Result<Identity, ApiError>) {
        let reject_credential = {
            let mut machine = self.machine.lock();
            if machine.epoch != epoch || self.store.get().as_ref() != Some(credential) {
                tracing::debug!(
                    epoch,
                    current_epoch = machine.epoch,
                    "Discarding stale identity resolution"
                );
                return;
            }

            match result {
                Ok(identity) => {
                    tracing::info!(user = %identity.username, "Session authenticated");
                    machine.last_error = None;
                    self.apply(&mut machine, SessionIntent::Resolved(identity));
                    false
                }
                Err(err) => {
                    tracing::warn!(kind = err.kind(), error = %err, "Identity resolution failed");
                    let unauthorized = err.is_unauthorized();
                    machine.last_error = Some(SessionError::Resolution(err));
                    self.apply(&mut machine, SessionIntent::ResolutionFailed);
                    unauthorized
                }
            }
        };

        // A rejected credential is dropped; transient failures keep it for
        // a later refresh.
        if reject_credential {
            if let Err(err) = self.store.clear_if(credential) {
                self.record_storage_error(err.to_string());
            }
        }
    }

    fn record_storage_error(&self, message: String) {
        tracing::warn!(error = %message, "Credential storage failed");
        self.machine.lock().last_error = Some(SessionError::Storage(message));
    }
}

impl CredentialListener for Inner {
    fn credential_changed(&self, credential: Option<&Credential>) {
        match credential {
            Some(credential) => self.begin(credential.clone()),
            None => {
                self.transition(SessionIntent::SignedOut);
            }
        }
    }
}
