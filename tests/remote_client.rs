mod common;

use common::mock_api::profile;
use common::{MockApi, MockResponse};
use inkpad::api::{Api, Login};
use inkpad::config::ApiConfig;
use inkpad::credential::{Credential, CredentialStore};
use inkpad::remote::{ApiError, ApiRequest, FilePart, MultipartForm, RemoteClient};
use serde_json::Value;

fn client(mock: &MockApi, credential: Option<&str>) -> RemoteClient {
    let api = ApiConfig {
        base_url: mock.base_url(),
        image_base_url: None,
    };
    RemoteClient::new(&api, CredentialStore::in_memory(credential.map(Credential::new)))
}

/// Authenticated requests carry the stored bearer credential.
#[tokio::test]
async fn test_attaches_bearer_when_required() {
    let mock = MockApi::start().await;
    mock.enqueue("GET", "/api/auth/profile", profile("u1", "ada", false))
        .await;

    let remote = client(&mock, Some("tok-1"));
    let reply: Value = remote
        .request(ApiRequest::get("/api/auth/profile").authenticated())
        .await
        .unwrap();
    assert_eq!(reply["profile"]["username"], "ada");

    let requests = mock.requests_to("GET", "/api/auth/profile").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("authorization"), Some("Bearer tok-1"));
}

/// Public endpoints never see the credential.
#[tokio::test]
async fn test_public_request_has_no_bearer() {
    let mock = MockApi::start().await;
    mock.enqueue("POST", "/api/auth/login", common::mock_api::token("new"))
        .await;

    let api = Api::new(client(&mock, Some("tok-1")));
    let token = api
        .login(&Login {
            email: "ada@example.com".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    assert_eq!(token, "new");

    let requests = mock.requests_to("POST", "/api/auth/login").await;
    assert_eq!(requests[0].header("authorization"), None);
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["email"], "ada@example.com");
}

/// An authenticated request without a stored credential is still sent.
#[tokio::test]
async fn test_missing_credential_sends_without_header() {
    let mock = MockApi::start().await;
    mock.enqueue(
        "GET",
        "/api/blogs/userBlogs",
        MockResponse::error(401, "No token provided"),
    )
    .await;

    let api = Api::new(client(&mock, None));
    let err = api.my_blogs().await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized {
            message: "No token provided".into()
        }
    );
    let requests = mock.requests_to("GET", "/api/blogs/userBlogs").await;
    assert_eq!(requests[0].header("authorization"), None);
}

/// Status codes map onto the error taxonomy with the server's message.
#[tokio::test]
async fn test_status_mapping() {
    let mock = MockApi::start().await;
    let cases = [
        (409, "conflict"),
        (422, "client_error"),
        (500, "server_error"),
        (503, "server_error"),
    ];
    for (status, _) in &cases {
        mock.enqueue("GET", "/api/blogs/1", MockResponse::error(*status, "nope"))
            .await;
    }

    let remote = client(&mock, None);
    for (status, kind) in cases {
        let err = remote
            .request::<Value>(ApiRequest::get("/api/blogs/1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "status {}", status);
        assert_eq!(err.status(), Some(status));
        assert_eq!(err.message(), "nope");
    }
}

/// A body that does not match the endpoint schema is a ClientError.
#[tokio::test]
async fn test_malformed_response_is_client_error() {
    let mock = MockApi::start().await;
    mock.enqueue(
        "GET",
        "/api/auth/profile",
        MockResponse::json(r#"{"unexpected": true}"#),
    )
    .await;

    let api = Api::new(client(&mock, None));
    let err = api.profile_for(&Credential::new("tok")).await.unwrap_err();
    assert!(matches!(err, ApiError::ClientError { status: 200, .. }));
}

/// Nothing listening yields a Network error.
#[tokio::test]
async fn test_connection_refused_is_network() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let api = ApiConfig {
        base_url: format!("http://{}", addr),
        image_base_url: None,
    };
    let remote = RemoteClient::new(&api, CredentialStore::in_memory(None));

    let err = remote
        .request::<Value>(ApiRequest::get("/api/blogs"))
        .await
        .unwrap_err();
    assert!(err.is_ambiguous());
    assert_eq!(err.status(), None);
}

/// Multipart bodies are sent as form-data with every field present.
#[tokio::test]
async fn test_multipart_request() {
    let mock = MockApi::start().await;
    let remote = client(&mock, Some("tok"));

    let form = MultipartForm::new()
        .text("title", "Hello")
        .file(
            "thumbnail",
            FilePart::new("cover.png", "image/png", vec![1, 2, 3]),
        );
    let _: Value = remote
        .request(ApiRequest::post("/api/blogs").authenticated().multipart(form))
        .await
        .unwrap();

    let requests = mock.requests_to("POST", "/api/blogs").await;
    let content_type = requests[0].header("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = requests[0].body_text();
    assert!(body.contains(r#"name="title""#));
    assert!(body.contains(r#"filename="cover.png""#));
}

/// Paginated lists are requested with the fixed page size.
#[tokio::test]
async fn test_list_blogs_query() {
    let mock = MockApi::start().await;
    mock.enqueue("GET", "/api/blogs", common::mock_api::blog_page(1..=3, 2, 4))
        .await;

    let api = Api::new(client(&mock, None));
    let page = api.list_blogs(2).await.unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.current_page, 2);
    assert!(page.has_next());

    let requests = mock.requests_to("GET", "/api/blogs").await;
    assert_eq!(requests[0].query.as_deref(), Some("page=2&limit=10"));
}
