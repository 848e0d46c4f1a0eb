//! Session state machine.
//!
//! ```text
//! Uninitialized ──start──→ Anonymous            (no credential)
//!       │
//!       └─────start──────→ Checking ──ok──→ Authenticated
//!                             │  ↑              │
//!                          failed└── credential change / refresh
//!                             ↓
//!                         Anonymous ──credential set──→ Checking
//! ```

mod manager;
mod resolver;
mod state;

pub use manager::{SessionError, SessionManager};
pub use resolver::IdentityResolver;
pub use state::{
    Identity, Session, SessionIntent, SessionReducer, SessionStatus, ADMIN_ROLE, USER_ROLE,
};
