//! Persistent credential storage.
//!
//! The credential is an opaque bearer token issued by the remote authority.
//! [`CredentialStore`] is the only writer; everything else observes it
//! through [`CredentialListener`] notifications or `get()`.

mod store;

pub use store::{CredentialError, CredentialListener, CredentialStore};

/// Opaque bearer token that never leaks through `Debug` or `Display`.
///
/// Use `expose()` to access the actual value when attaching it to a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the inner value.
    ///
    /// Use sparingly and only when actually sending to the API.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value suitable for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(••••••••)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_does_not_leak() {
        let secret = Credential::new("my-secret-token");

        let debug_output = format!("{:?}", secret);
        assert!(!debug_output.contains("my-secret-token"));
        assert!(debug_output.contains("••••••••"));

        let display_output = format!("{}", secret);
        assert!(!display_output.contains("my-secret-token"));

        assert_eq!(secret.expose(), "my-secret-token");
        assert_eq!(secret.bearer(), "Bearer my-secret-token");
    }
}
