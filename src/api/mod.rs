//! Typed access to every endpoint of the publishing API.

mod endpoints;
pub mod keys;
mod types;

pub use endpoints::{Api, PAGE_SIZE};
pub use types::{
    filter_by_title, Blog, BlogDraft, Login, PasswordChange, Profile, ProfileEdit, Registration,
    TokenResponse, UserUpdate,
};
