use async_trait::async_trait;

use crate::api::Api;
use crate::credential::Credential;
use crate::remote::ApiError;

use super::state::Identity;

/// Turns a credential into the identity it belongs to.
#[async_trait]
pub trait IdentityResolver: Send + Sync + 'static {
    async fn resolve(&self, credential: &Credential) -> Result<Identity, ApiError>;
}

#[async_trait]
impl IdentityResolver for Api {
    async fn resolve(&self, credential: &Credential) -> Result<Identity, ApiError> {
        self.profile_for(credential).await.map(Identity::from)
    }
}
