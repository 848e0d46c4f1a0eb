use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::credential::{Credential, CredentialStore};

use super::error::ApiError;
use super::request::{ApiRequest, RequestBody};

/// HTTP client for the publishing API.
///
/// Attaches the stored credential as a bearer header for requests that need
/// it. Never retries and never applies its own timeout; recovery and
/// deadlines belong to the caller.
#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl RemoteClient {
    pub fn new(api: &ApiConfig, credentials: CredentialStore) -> Self {
        Self {
            http: Client::new(),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Send `req`, attaching the current credential when `auth_required`.
    pub async fn request<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let credential = if req.auth_required {
            self.credentials.get()
        } else {
            None
        };
        self.send(req, credential.as_ref()).await
    }

    /// Send `req` with an explicit credential instead of the stored one.
    ///
    /// Used when a response must be matched against the credential it was
    /// issued for.
    pub async fn request_with<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
        credential: &Credential,
    ) -> Result<T, ApiError> {
        self.send(req, Some(credential)).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, req.path);
        let encoding = req.encoding();
        let mut builder = self.http.request(req.method.clone(), &url);

        if req.auth_required {
            if let Some(credential) = credential {
                builder = builder.header(AUTHORIZATION, credential.bearer());
            }
        }

        builder = match req.body {
            Some(RequestBody::Json(body)) => builder.json(&body),
            Some(RequestBody::Multipart(form)) => builder.multipart(form.into_reqwest()?),
            None => builder,
        };

        tracing::debug!(method = %req.method, path = %req.path, ?encoding, "Sending API request");

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(path = %req.path, error = %e, "API request failed before response");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        if !(200..300).contains(&status) {
            let message = error_message(&bytes, status);
            tracing::debug!(path = %req.path, status, message = %message, "API error response");
            return Err(ApiError::from_status(status, message));
        }

        decode(&bytes, status)
    }
}

/// Decode a success body. An empty body decodes as JSON `null`, so `()`,
/// `Option<_>` and `Value` accept bodiless responses.
fn decode<T: DeserializeOwned>(bytes: &[u8], status: u16) -> Result<T, ApiError> {
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| ApiError::malformed(status, e))
}

/// Extract `message` or `error` from an error body, else the status reason.
fn error_message(bytes: &[u8], status: u16) -> String {
    let from_body = serde_json::from_slice::<Value>(bytes).ok().and_then(|v| {
        ["message", "error"].iter().find_map(|field| match v.get(*field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) => o
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
    });

    from_body.unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string()
    })
}
