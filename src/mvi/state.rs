//! Base trait for observable state.

/// Marker trait for state snapshots.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data an observer needs)
/// - Shareable across tasks
pub trait State: Clone + Default + Send + Sync + 'static {}
