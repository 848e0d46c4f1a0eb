//! HTTP access to the publishing API.

mod client;
mod error;
mod request;

pub use client::RemoteClient;
pub use error::ApiError;
pub use request::{ApiRequest, Encoding, FilePart, MultipartForm, RequestBody};
