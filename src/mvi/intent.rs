//! Base trait for intents.

/// Marker trait for intent objects.
///
/// Intents represent system events such as a credential change or an API
/// response, and are processed by reducers to produce new states.
pub trait Intent: Send + 'static {}
