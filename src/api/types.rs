//! Wire schemas for every endpoint.
//!
//! Responses are validated here; anything that does not match surfaces as
//! [`ApiError::ClientError`](crate::remote::ApiError::ClientError).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::query::Page;
use crate::remote::{FilePart, MultipartForm};

/// `{ token }` returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Account as returned by the profile and admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, rename = "isAdmin")]
    pub is_admin: bool,
    /// Explicit role list; when absent roles derive from `is_admin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: Profile,
}

/// Profile edit responses come either wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileReply {
    Wrapped { profile: Profile },
    WrappedUser { user: Profile },
    Bare(Profile),
}

impl ProfileReply {
    pub fn into_profile(self) -> Profile {
        match self {
            ProfileReply::Wrapped { profile } => profile,
            ProfileReply::WrappedUser { user } => user,
            ProfileReply::Bare(profile) => profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlogEnvelope {
    pub blog: Blog,
}

/// `{ blogs, currentPage, totalPages }`
#[derive(Debug, Deserialize)]
pub(crate) struct BlogPageWire {
    pub blogs: Vec<Blog>,
    #[serde(rename = "currentPage")]
    pub current_page: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

impl From<BlogPageWire> for Page<Blog> {
    fn from(wire: BlogPageWire) -> Self {
        Page::new(wire.blogs, wire.current_page, wire.total_pages)
    }
}

/// `{ users, totalPages }`; `currentPage` is optional on this endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct UserPageWire {
    pub users: Vec<Profile>,
    #[serde(default, rename = "currentPage")]
    pub current_page: Option<u32>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

impl UserPageWire {
    pub fn into_page(self, requested: u32) -> Page<Profile> {
        Page::new(
            self.users,
            self.current_page.unwrap_or(requested),
            self.total_pages,
        )
    }
}

/// The caller's own posts arrive either as a bare array or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BlogList {
    Bare(Vec<Blog>),
    Wrapped { blogs: Vec<Blog> },
}

impl BlogList {
    pub fn into_vec(self) -> Vec<Blog> {
        match self {
            BlogList::Bare(blogs) | BlogList::Wrapped { blogs } => blogs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub(crate) fn to_json(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "password": self.password,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl Login {
    pub(crate) fn to_json(&self) -> Value {
        json!({ "email": self.email, "password": self.password })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub bio: String,
    pub website: String,
    pub location: String,
    pub avatar: Option<FilePart>,
}

impl ProfileEdit {
    pub(crate) fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("bio", &self.bio)
            .text("website", &self.website)
            .text("location", &self.location)
            .maybe_file("avatar", self.avatar.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub(crate) fn to_json(&self) -> Value {
        json!({
            "currentPassword": self.current_password,
            "newPassword": self.new_password,
            "confirmPassword": self.confirm_password,
        })
    }
}

/// Fields shared by blog create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl BlogDraft {
    pub(crate) fn to_form(&self, thumbnail: Option<FilePart>) -> MultipartForm {
        MultipartForm::new()
            .text("title", &self.title)
            .text("content", &self.content)
            .text("category", &self.category)
            .text("tags", self.tags.join(" "))
            .maybe_file("thumbnail", thumbnail)
    }
}

/// Admin edit of another account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub website: String,
}

impl UserUpdate {
    pub(crate) fn to_json(&self) -> Value {
        json!({
            "username": self.username,
            "email": self.email,
            "bio": self.bio,
            "website": self.website,
        })
    }
}

/// Case-insensitive title search over a list of posts.
pub fn filter_by_title<'a, I>(blogs: I, needle: &str) -> Vec<&'a Blog>
where
    I: IntoIterator<Item = &'a Blog>,
{
    let needle = needle.to_lowercase();
    blogs
        .into_iter()
        .filter(|b| b.title.to_lowercase().contains(&needle))
        .collect()
}
