//! Access decisions for protected views.
//!
//! A pure function of the session snapshot and the view's requirement. While
//! the session is loading the answer is always [`Decision::Suspend`], so a
//! view is never allowed and then redirected because of a transient state.

use crate::session::{Session, SessionStatus, ADMIN_ROLE};

/// What a view requires from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Authenticated,
    Role(String),
}

impl Capability {
    pub fn role(role: impl Into<String>) -> Self {
        Capability::Role(role.into())
    }

    pub fn admin() -> Self {
        Capability::Role(ADMIN_ROLE.to_string())
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
    /// Identity is still loading; render nothing yet.
    Suspend,
}

impl Decision {
    /// Route to navigate to, if the decision is a redirect.
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            Decision::RedirectToLogin => Some("/login"),
            Decision::RedirectToHome => Some("/"),
            Decision::Allow | Decision::Suspend => None,
        }
    }
}

pub fn decide(session: &Session, capability: &Capability) -> Decision {
    match session.status {
        SessionStatus::Uninitialized | SessionStatus::Checking => Decision::Suspend,
        SessionStatus::Anonymous => Decision::RedirectToLogin,
        SessionStatus::Authenticated => match (capability, &session.identity) {
            (Capability::Authenticated, Some(_)) => Decision::Allow,
            (Capability::Role(role), Some(identity)) if identity.has_role(role) => {
                Decision::Allow
            }
            (Capability::Role(_), Some(_)) => Decision::RedirectToHome,
            // Authenticated without an identity cannot be produced by the
            // reducer; refuse rather than allow.
            (_, None) => Decision::RedirectToLogin,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;

    fn session(status: SessionStatus, roles: &[&str]) -> Session {
        let identity = (status == SessionStatus::Authenticated).then(|| Identity {
            id: "1".into(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        });
        Session { status, identity }
    }

    #[test]
    fn loading_always_suspends() {
        for status in [SessionStatus::Uninitialized, SessionStatus::Checking] {
            let s = session(status, &[]);
            assert_eq!(decide(&s, &Capability::Authenticated), Decision::Suspend);
            assert_eq!(decide(&s, &Capability::admin()), Decision::Suspend);
        }
    }

    #[test]
    fn anonymous_goes_to_login() {
        let s = session(SessionStatus::Anonymous, &[]);
        assert_eq!(decide(&s, &Capability::Authenticated), Decision::RedirectToLogin);
        assert_eq!(decide(&s, &Capability::admin()), Decision::RedirectToLogin);
        assert_eq!(Decision::RedirectToLogin.redirect_path(), Some("/login"));
    }

    #[test]
    fn missing_role_goes_home() {
        let s = session(SessionStatus::Authenticated, &["user"]);
        assert_eq!(decide(&s, &Capability::Authenticated), Decision::Allow);
        assert_eq!(decide(&s, &Capability::admin()), Decision::RedirectToHome);
        assert_eq!(Decision::RedirectToHome.redirect_path(), Some("/"));
    }

    #[test]
    fn role_allows_only_when_present() {
        let s = session(SessionStatus::Authenticated, &["user", "admin"]);
        assert_eq!(decide(&s, &Capability::admin()), Decision::Allow);
        assert_eq!(
            decide(&s, &Capability::role("editor")),
            Decision::RedirectToHome
        );
    }

    #[test]
    fn role_capability_never_allows_outside_authenticated() {
        for status in [
            SessionStatus::Uninitialized,
            SessionStatus::Checking,
            SessionStatus::Anonymous,
        ] {
            let s = session(status, &["admin"]);
            assert_ne!(decide(&s, &Capability::admin()), Decision::Allow);
        }
    }
}
