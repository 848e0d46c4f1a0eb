use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Credential;

/// Errors raised while persisting the credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access credential file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse credential file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Receives every credential change synchronously, before `set`/`clear` return.
///
/// Implementations must not write back to the store from inside the callback.
pub trait CredentialListener: Send + Sync {
    fn credential_changed(&self, credential: Option<&Credential>);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Single source of truth for the credential.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// `None` keeps the credential in memory only.
    path: Option<PathBuf>,
    value: Mutex<Option<Credential>>,
    /// Serializes writers so persistence, update and notification form one step.
    writer: Mutex<()>,
    listeners: Mutex<Vec<Weak<dyn CredentialListener>>>,
}

impl CredentialStore {
    /// Open the store backed by `path`, loading any persisted credential.
    ///
    /// A missing file means no credential.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let value = read_persisted(&path)?;
        tracing::debug!(
            path = %path.display(),
            present = value.is_some(),
            "Credential store opened"
        );
        Ok(Self::with_state(Some(path), value))
    }

    /// Store that never touches the filesystem.
    pub fn in_memory(initial: Option<Credential>) -> Self {
        Self::with_state(None, initial)
    }

    fn with_state(path: Option<PathBuf>, value: Option<Credential>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path,
                value: Mutex::new(value),
                writer: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current credential, if any.
    pub fn get(&self) -> Option<Credential> {
        self.inner.value.lock().clone()
    }

    pub fn is_present(&self) -> bool {
        self.inner.value.lock().is_some()
    }

    /// Register a listener. Dropped listeners are pruned on the next change.
    pub fn subscribe(&self, listener: Weak<dyn CredentialListener>) {
        self.inner.listeners.lock().push(listener);
    }

    /// Persist `value` and notify listeners.
    ///
    /// An empty value is treated as `clear()`. Setting the value already
    /// stored is a no-op and notifies nobody.
    pub fn set(&self, value: impl Into<String>) -> Result<(), CredentialError> {
        let value = value.into();
        if value.is_empty() {
            return self.clear();
        }
        self.replace(Some(Credential::new(value)))
    }

    /// Remove the credential from memory and disk and notify listeners.
    pub fn clear(&self) -> Result<(), CredentialError> {
        self.replace(None)
    }

    /// Clear only if the stored credential is still `expected`, checked
    /// under the writer lock. Returns whether anything was cleared.
    pub fn clear_if(&self, expected: &Credential) -> Result<bool, CredentialError> {
        let _writer = self.inner.writer.lock();

        if self.inner.value.lock().as_ref() != Some(expected) {
            tracing::debug!("Credential replaced, not clearing");
            return Ok(false);
        }
        self.commit(None)?;
        Ok(true)
    }

    fn replace(&self, next: Option<Credential>) -> Result<(), CredentialError> {
        let _writer = self.inner.writer.lock();

        if *self.inner.value.lock() == next {
            tracing::debug!(present = next.is_some(), "Credential unchanged");
            return Ok(());
        }
        self.commit(next)
    }

    /// Persist, publish and notify. Caller holds the writer lock.
    fn commit(&self, next: Option<Credential>) -> Result<(), CredentialError> {
        if let Some(path) = &self.inner.path {
            write_persisted(path, next.as_ref())?;
        }
        *self.inner.value.lock() = next.clone();

        tracing::info!(present = next.is_some(), "Credential changed");
        self.notify(next.as_ref());
        Ok(())
    }

    fn notify(&self, credential: Option<&Credential>) {
        let listeners: Vec<Arc<dyn CredentialListener>> = {
            let mut guard = self.inner.listeners.lock();
            guard.retain(|l| l.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.credential_changed(credential);
        }
    }
}

fn read_persisted(path: &Path) -> Result<Option<Credential>, CredentialError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CredentialError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let persisted: PersistedCredential =
        serde_json::from_str(&content).map_err(|e| CredentialError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(persisted
        .token
        .filter(|t| !t.is_empty())
        .map(Credential::new))
}

/// Write via a temp file + rename so a crash never leaves a torn file.
fn write_persisted(path: &Path, credential: Option<&Credential>) -> Result<(), CredentialError> {
    let io_err = |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    };

    let Some(credential) = credential else {
        return match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_err(e)),
            _ => Ok(()),
        };
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let persisted = PersistedCredential {
        token: Some(credential.expose().to_string()),
    };
    let body = serde_json::to_string(&persisted).map_err(|e| CredentialError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
