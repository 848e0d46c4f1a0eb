//! Unidirectional state primitives.
//!
//! Session and query state only change through reducers:
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ Observers
//!    ↑                                │
//!    └────────────────────────────────┘
//! ```
//!
//! - **State**: immutable snapshot, replaced wholesale on every transition
//! - **Intent**: a system event (credential change, response arrival)
//! - **Reducer**: pure function that transforms state based on intents

mod intent;
mod reducer;
mod state;

pub use intent::Intent;
pub use reducer::Reducer;
pub use state::State;
