//! Application facade.
//!
//! [`AppContext`] owns one instance of every service and hands them to each
//! other explicitly. Views (or the CLI) talk to it instead of wiring the
//! pieces themselves.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{keys, Api, Blog, BlogDraft, Login, PasswordChange, Profile, ProfileEdit, Registration, UserUpdate};
use crate::config::Config;
use crate::credential::{CredentialError, CredentialStore};
use crate::guard::{Capability, Decision};
use crate::notify::Notifier;
use crate::query::{InfiniteState, Page, QueryCache, QueryState, Subscription};
use crate::remote::{ApiError, FilePart, RemoteClient};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppContext {
    config: Arc<Config>,
    api: Api,
    session: SessionManager,
    cache: QueryCache,
    notifier: Notifier,
}

impl AppContext {
    /// Open the credential file named by `config` and build every service.
    pub fn new(config: Config) -> Result<Self, CredentialError> {
        let store = CredentialStore::open(config.storage.credential_path())?;
        Ok(Self::with_store(config, store))
    }

    /// Build around an existing store (in-memory in tests).
    pub fn with_store(config: Config, store: CredentialStore) -> Self {
        let remote = RemoteClient::new(&config.api, store.clone());
        let api = Api::new(remote);
        let session = SessionManager::new(store, Arc::new(api.clone()));
        Self {
            config: Arc::new(config),
            api,
            session,
            cache: QueryCache::new(),
            notifier: Notifier::default(),
        }
    }

    /// Resolve the stored credential, if any. Call once at startup.
    pub fn start(&self) {
        self.session.start();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn media_url(&self, file: &str) -> String {
        self.config.api.media_url(file)
    }

    /// Guard decision once the session has settled.
    pub async fn authorize(&self, capability: &Capability) -> Decision {
        self.session.authorize(capability).await
    }

    // -- auth ---------------------------------------------------------------

    pub async fn login(&self, login: &Login) -> Result<(), ApiError> {
        match self.api.login(login).await {
            Ok(token) => {
                self.switch_identity(token);
                Ok(())
            }
            Err(err) => {
                if err.is_unauthorized() || err.status() == Some(400) {
                    self.notifier.error("Invalid credentials");
                } else {
                    self.notifier.error("Something went wrong");
                }
                Err(err)
            }
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        match self.api.register(registration).await {
            Ok(token) => {
                self.switch_identity(token);
                self.notifier.success("Registration successful!");
                Ok(())
            }
            Err(err) => {
                if matches!(err, ApiError::Conflict { .. }) {
                    self.notifier.error("User already exists");
                } else {
                    self.notifier.error("Registration failed");
                }
                Err(err)
            }
        }
    }

    /// Forget the credential and everything cached for its owner.
    pub fn logout(&self) {
        self.session.clear_credential();
        self.cache.invalidate_all();
        self.notifier.success("Logged out successfully!");
    }

    fn switch_identity(&self, token: String) {
        self.session.set_credential(token);
        self.cache.invalidate_all();
    }

    /// Edit the caller's profile, then re-resolve the identity.
    pub async fn edit_profile(&self, edit: &ProfileEdit) -> Result<Profile, ApiError> {
        let result = self.api.edit_profile(edit).await;
        if result.is_ok() {
            self.session.refresh_identity();
        }
        self.report(
            &result,
            "Profile updated successfully!",
            "Failed to update profile. Please try again later.",
        );
        result
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let result = self.api.change_password(change).await;
        self.report(
            &result,
            "Password changed successfully!",
            "Failed to change password. Please try again later.",
        );
        result
    }

    // -- reads --------------------------------------------------------------

    /// First page of the public feed, or the accumulated feed if loaded.
    pub async fn blog_feed(&self) -> InfiniteState<Blog> {
        let api = self.api.clone();
        self.cache
            .read_page(
                keys::blogs(),
                move |page| {
                    let api = api.clone();
                    async move { api.list_blogs(page).await }
                },
                1,
            )
            .await
    }

    /// Append the next feed page. `None` once the last page is loaded.
    pub async fn next_blogs(&self) -> Option<InfiniteState<Blog>> {
        if !self.cache.contains(&keys::blogs()) {
            return Some(self.blog_feed().await);
        }
        self.cache.fetch_next_page(&keys::blogs()).await
    }

    /// Live feed that reloads itself whenever a post is written.
    pub fn watch_blog_feed(&self) -> Subscription<InfiniteState<Blog>> {
        let api = self.api.clone();
        self.cache.subscribe_pages(keys::blogs(), move |page| {
            let api = api.clone();
            async move { api.list_blogs(page).await }
        })
    }

    /// Title search over the feed pages loaded so far.
    pub fn search_blogs(&self, needle: &str) -> Vec<Blog> {
        let Some(feed) = self.cache.peek::<InfiniteState<Blog>>(&keys::blogs()) else {
            return Vec::new();
        };
        crate::api::filter_by_title(feed.items(), needle)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn blog(&self, id: &str) -> QueryState<Blog> {
        let api = self.api.clone();
        let id = id.to_string();
        self.cache
            .read(keys::blog(&id), move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.blog(&id).await }
            })
            .await
    }

    pub async fn my_blogs(&self) -> QueryState<Vec<Blog>> {
        let api = self.api.clone();
        self.cache
            .read(keys::my_blogs(), move || {
                let api = api.clone();
                async move { api.my_blogs().await }
            })
            .await
    }

    /// One page of the admin post table.
    pub async fn admin_blogs(&self, page: u32) -> QueryState<Page<Blog>> {
        let api = self.api.clone();
        self.cache
            .read(keys::admin_blogs(page), move || {
                let api = api.clone();
                async move { api.list_blogs(page).await }
            })
            .await
    }

    pub async fn admin_users(&self, page: u32) -> QueryState<Page<Profile>> {
        let api = self.api.clone();
        self.cache
            .read(keys::admin_users(page), move || {
                let api = api.clone();
                async move { api.list_users(page).await }
            })
            .await
    }

    pub async fn admin_user(&self, id: &str) -> QueryState<Profile> {
        let api = self.api.clone();
        let id = id.to_string();
        self.cache
            .read(keys::admin_user(&id), move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.user(&id).await }
            })
            .await
    }

    // -- mutations ----------------------------------------------------------

    pub async fn create_blog(&self, draft: &BlogDraft, thumbnail: FilePart) -> Result<Value, ApiError> {
        let result = self
            .cache
            .mutate(self.api.create_blog(draft, thumbnail), &keys::blog_writes(None))
            .await;
        self.report(
            &result,
            "Blog created successfully!",
            "Failed to create blog. Please try again.",
        );
        result
    }

    pub async fn update_blog(
        &self,
        id: &str,
        draft: &BlogDraft,
        thumbnail: Option<FilePart>,
    ) -> Result<Value, ApiError> {
        let result = self
            .cache
            .mutate(
                self.api.update_blog(id, draft, thumbnail),
                &keys::blog_writes(Some(id)),
            )
            .await;
        self.report(
            &result,
            "Blog updated successfully!",
            "Failed to update blog. Please try again.",
        );
        result
    }

    pub async fn delete_blog(&self, id: &str) -> Result<(), ApiError> {
        let result = self
            .cache
            .mutate(self.api.delete_blog(id), &keys::blog_writes(Some(id)))
            .await;
        self.report(
            &result,
            "Blog deleted successfully!",
            "Failed to delete blog. Please try again.",
        );
        result
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<Value, ApiError> {
        let result = self
            .cache
            .mutate(self.api.update_user(id, update), &keys::user_writes(id))
            .await;
        self.report(
            &result,
            "User info updated successfully!",
            "Failed to update user info. Please try again.",
        );
        result
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        let result = self
            .cache
            .mutate(self.api.delete_user(id), &keys::user_writes(id))
            .await;
        self.report(
            &result,
            "User deleted successfully!",
            "Failed to delete user. Please try again.",
        );
        result
    }

    fn report<T>(&self, result: &Result<T, ApiError>, success: &str, failure: &str) {
        match result {
            Ok(_) => self.notifier.success(success),
            Err(_) => self.notifier.error(failure),
        }
    }
}
