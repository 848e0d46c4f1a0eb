//! Session snapshot and its reducer.

use crate::api::Profile;
use crate::mvi::{Intent, Reducer, State};

/// Role every signed-in account holds.
pub const USER_ROLE: &str = "user";
/// Role granted by the `isAdmin` profile flag.
pub const ADMIN_ROLE: &str = "admin";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Startup has not read the credential store yet.
    #[default]
    Uninitialized,
    /// A profile resolution for the current credential is in flight.
    Checking,
    Anonymous,
    Authenticated,
}

/// Who the current credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

impl From<Profile> for Identity {
    fn from(profile: Profile) -> Self {
        let roles = profile.roles.unwrap_or_else(|| {
            let mut roles = vec![USER_ROLE.to_string()];
            if profile.is_admin {
                roles.push(ADMIN_ROLE.to_string());
            }
            roles
        });
        Self {
            id: profile.id,
            username: profile.username,
            email: profile.email,
            roles,
        }
    }
}

/// Derived authentication state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
}

impl State for Session {}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            identity: None,
        }
    }

    /// Still deciding who the user is.
    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Checking
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Events that move the session.
#[derive(Debug, Clone)]
pub enum SessionIntent {
    /// Startup found no stored credential.
    NoCredential,
    /// A resolution was issued for a new or refreshed credential.
    ResolutionStarted,
    /// The resolution for the current credential succeeded.
    Resolved(Identity),
    /// The resolution for the current credential failed.
    ResolutionFailed,
    /// The credential was cleared.
    SignedOut,
}

impl Intent for SessionIntent {}

pub struct SessionReducer;

impl Reducer for SessionReducer {
    type State = Session;
    type Intent = SessionIntent;

    fn reduce(_state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            SessionIntent::ResolutionStarted => Session {
                status: SessionStatus::Checking,
                identity: None,
            },
            SessionIntent::Resolved(identity) => Session {
                status: SessionStatus::Authenticated,
                identity: Some(identity),
            },
            SessionIntent::NoCredential
            | SessionIntent::ResolutionFailed
            | SessionIntent::SignedOut => Session::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "u1".into(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            roles: vec![USER_ROLE.into()],
        }
    }

    #[test]
    fn uninitialized_is_default_and_loading() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Uninitialized);
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn resolution_started_drops_previous_identity() {
        let state = SessionReducer::reduce(
            Session::default(),
            SessionIntent::Resolved(identity()),
        );
        assert!(state.is_authenticated());

        let state = SessionReducer::reduce(state, SessionIntent::ResolutionStarted);
        assert_eq!(state.status, SessionStatus::Checking);
        assert!(state.identity.is_none());
    }

    #[test]
    fn failures_collapse_to_anonymous() {
        for intent in [
            SessionIntent::NoCredential,
            SessionIntent::ResolutionFailed,
            SessionIntent::SignedOut,
        ] {
            let state = SessionReducer::reduce(
                Session {
                    status: SessionStatus::Checking,
                    identity: None,
                },
                intent,
            );
            assert_eq!(state, Session::anonymous());
        }
    }

    #[test]
    fn roles_derive_from_admin_flag() {
        let profile: Profile = serde_json::from_str(
            r#"{"_id": "1", "username": "root", "email": "r@x.io", "isAdmin": true}"#,
        )
        .unwrap();
        let identity = Identity::from(profile);
        assert_eq!(identity.roles, vec!["user", "admin"]);
        assert!(identity.is_admin());
    }

    #[test]
    fn explicit_roles_win() {
        let profile: Profile = serde_json::from_str(
            r#"{"_id": "1", "username": "ed", "email": "e@x.io", "isAdmin": true, "roles": ["editor"]}"#,
        )
        .unwrap();
        let identity = Identity::from(profile);
        assert_eq!(identity.roles, vec!["editor"]);
        assert!(!identity.is_admin());
    }
}
