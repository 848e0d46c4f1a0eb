pub mod api;
pub mod client;
pub mod config;
pub mod credential;
pub mod guard;
pub mod logging;
pub mod mvi;
pub mod notify;
pub mod query;
pub mod remote;
pub mod session;
