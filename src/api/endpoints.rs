use serde_json::Value;

use crate::credential::Credential;
use crate::query::Page;
use crate::remote::{ApiError, ApiRequest, FilePart, RemoteClient};

use super::types::{
    Blog, BlogDraft, BlogEnvelope, BlogList, BlogPageWire, Login, PasswordChange, Profile,
    ProfileEdit, ProfileEnvelope, ProfileReply, Registration, TokenResponse, UserEnvelope,
    UserPageWire, UserUpdate,
};

/// Fixed page size for every paginated endpoint.
pub const PAGE_SIZE: u32 = 10;

/// Typed endpoint functions over [`RemoteClient`].
#[derive(Clone)]
pub struct Api {
    remote: RemoteClient,
}

impl Api {
    pub fn new(remote: RemoteClient) -> Self {
        Self { remote }
    }

    // -- auth ---------------------------------------------------------------

    pub async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        let req = ApiRequest::post("/api/auth/register").json(registration.to_json());
        let reply: TokenResponse = self.remote.request(req).await?;
        Ok(reply.token)
    }

    pub async fn login(&self, login: &Login) -> Result<String, ApiError> {
        let req = ApiRequest::post("/api/auth/login").json(login.to_json());
        let reply: TokenResponse = self.remote.request(req).await?;
        Ok(reply.token)
    }

    /// Profile resolved with a specific credential.
    pub async fn profile_for(&self, credential: &Credential) -> Result<Profile, ApiError> {
        let req = ApiRequest::get("/api/auth/profile").authenticated();
        let reply: ProfileEnvelope = self.remote.request_with(req, credential).await?;
        Ok(reply.profile)
    }

    pub async fn edit_profile(&self, edit: &ProfileEdit) -> Result<Profile, ApiError> {
        let req = ApiRequest::patch("/api/auth/profile/edit")
            .authenticated()
            .multipart(edit.to_form());
        let reply: ProfileReply = self.remote.request(req).await?;
        Ok(reply.into_profile())
    }

    /// Rejected locally when the confirmation does not match.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        if change.new_password != change.confirm_password {
            return Err(ApiError::invalid("New password and confirmation do not match"));
        }
        let req = ApiRequest::patch("/api/auth/profile/change-password")
            .authenticated()
            .json(change.to_json());
        let _: Value = self.remote.request(req).await?;
        Ok(())
    }

    // -- blogs --------------------------------------------------------------

    pub async fn list_blogs(&self, page: u32) -> Result<Page<Blog>, ApiError> {
        let req = ApiRequest::get(format!("/api/blogs?page={}&limit={}", page, PAGE_SIZE));
        let reply: BlogPageWire = self.remote.request(req).await?;
        Ok(reply.into())
    }

    pub async fn blog(&self, id: &str) -> Result<Blog, ApiError> {
        let req = ApiRequest::get(format!("/api/blogs/{}", id)).authenticated();
        let reply: BlogEnvelope = self.remote.request(req).await?;
        Ok(reply.blog)
    }

    /// Posts owned by the caller.
    pub async fn my_blogs(&self) -> Result<Vec<Blog>, ApiError> {
        let req = ApiRequest::get("/api/blogs/userBlogs").authenticated();
        let reply: BlogList = self.remote.request(req).await?;
        Ok(reply.into_vec())
    }

    pub async fn create_blog(&self, draft: &BlogDraft, thumbnail: FilePart) -> Result<Value, ApiError> {
        let req = ApiRequest::post("/api/blogs")
            .authenticated()
            .multipart(draft.to_form(Some(thumbnail)));
        self.remote.request(req).await
    }

    pub async fn update_blog(
        &self,
        id: &str,
        draft: &BlogDraft,
        thumbnail: Option<FilePart>,
    ) -> Result<Value, ApiError> {
        let req = ApiRequest::patch(format!("/api/blogs/update/{}", id))
            .authenticated()
            .multipart(draft.to_form(thumbnail));
        self.remote.request(req).await
    }

    pub async fn delete_blog(&self, id: &str) -> Result<(), ApiError> {
        let req = ApiRequest::delete(format!("/api/blogs/delete/{}", id)).authenticated();
        let _: Value = self.remote.request(req).await?;
        Ok(())
    }

    // -- admin --------------------------------------------------------------

    pub async fn list_users(&self, page: u32) -> Result<Page<Profile>, ApiError> {
        let req = ApiRequest::get(format!("/api/admin/users?page={}&limit={}", page, PAGE_SIZE))
            .authenticated();
        let reply: UserPageWire = self.remote.request(req).await?;
        Ok(reply.into_page(page))
    }

    pub async fn user(&self, id: &str) -> Result<Profile, ApiError> {
        let req = ApiRequest::get(format!("/api/admin/users/{}", id)).authenticated();
        let reply: UserEnvelope = self.remote.request(req).await?;
        Ok(reply.user)
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<Value, ApiError> {
        let req = ApiRequest::patch(format!("/api/admin/users/{}", id))
            .authenticated()
            .json(update.to_json());
        self.remote.request(req).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let req = ApiRequest::delete(format!("/api/admin/users/{}", id)).authenticated();
        let _: Value = self.remote.request(req).await?;
        Ok(())
    }
}
