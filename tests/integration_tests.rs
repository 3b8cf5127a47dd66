//! Integration tests using mock HTTP server
//!
//! Tests the full flow: config → token file → authorized HTTP requests, and
//! config → synthesized templates.

use gallery_kit::auth::{
    read_tokens, save_tokens, AuthInterceptor, AuthTokens, ChannelListener, FileTokenStore,
    TokenStore, AUTH_TOKENS_KEY,
};
use gallery_kit::config::AppConfig;
use gallery_kit::http::{HttpClient, HttpClientConfig, RequestConfig};
use gallery_kit::infra::{GalleryInfra, StackSelection};
use gallery_kit::types::{Method, Stage};
use gallery_kit::Error;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const CONFIG: &str = r"
environment:
  production: false
  api_url: http://127.0.0.1:1
  cognito:
    domain: gallery-dev.auth.us-east-1.amazoncognito.com
    client_id: abc123
    redirect_uri: https://app.dev.example.com/callback
http:
  timeout_secs: 5
  max_retries: 1
infra:
  app_name: gallery
  base_domain: photos.example.com
  stage: staging
";

struct Fixture {
    _dir: TempDir,
    store: Arc<FileTokenStore>,
    server: MockServer,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path().join("tokens.json")));
    Fixture {
        _dir: dir,
        store,
        server: MockServer::start().await,
    }
}

fn client_for(
    fixture: &Fixture,
) -> (
    HttpClient,
    tokio::sync::mpsc::UnboundedReceiver<gallery_kit::auth::SessionInvalidated>,
) {
    let mut config = AppConfig::from_yaml(CONFIG).unwrap();
    config.environment.api_url = fixture.server.uri();

    let (listener, events) = ChannelListener::channel();
    let interceptor = AuthInterceptor::new(fixture.store.clone(), Arc::new(listener))
        .with_bypass(config.auth.bypass_rules())
        .with_token_key(config.auth.token_key.clone())
        .with_redirect(config.auth.login_redirect.clone());

    let client = HttpClient::with_interceptor(config.http_client_config(), interceptor).unwrap();
    (client, events)
}

async fn sign_in(store: &FileTokenStore) {
    let tokens = AuthTokens::new("access-1", "id-1").with_refresh_token("refresh-1");
    save_tokens(store, AUTH_TOKENS_KEY, &tokens).await.unwrap();
}

// ============================================================================
// Authorized requests
// ============================================================================

#[tokio::test]
async fn test_signed_in_requests_carry_id_token() {
    let fixture = fixture().await;
    sign_in(&fixture.store).await;

    Mock::given(method("GET"))
        .and(path("/galleries"))
        .and(header("Authorization", "Bearer id-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "galleryId": "g1", "name": "Wedding" }
        ])))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let (client, _events) = client_for(&fixture);
    let galleries: serde_json::Value = client.get_json("/galleries").await.unwrap();

    assert_eq!(galleries[0]["name"], "Wedding");
}

#[tokio::test]
async fn test_client_endpoints_are_sent_without_token() {
    let fixture = fixture().await;
    sign_in(&fixture.store).await;

    Mock::given(method("POST"))
        .and(path("/client/galleries/g1/access"))
        .respond_with(|request: &Request| {
            if request.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "sessionToken": "s1" }))
            }
        })
        .expect(1)
        .mount(&fixture.server)
        .await;

    let (client, _events) = client_for(&fixture);
    let response = client
        .post("/client/galleries/g1/access", json!({ "password": "secret" }))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_anonymous_requests_have_no_header() {
    let fixture = fixture().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fixture.server)
        .await;

    let (client, _events) = client_for(&fixture);
    let response = client.get("/health").await.unwrap();

    assert_eq!(response.status(), 200);
}

// ============================================================================
// Session invalidation
// ============================================================================

#[tokio::test]
async fn test_expired_session_clears_token_file() {
    let fixture = fixture().await;
    sign_in(&fixture.store).await;
    fixture.store.set("theme", "dark").await.unwrap();

    Mock::given(method("GET"))
        .and(path("/galleries"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Token expired"))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let (client, mut events) = client_for(&fixture);
    let err = client.get("/galleries").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(read_tokens(fixture.store.as_ref(), AUTH_TOKENS_KEY)
        .await
        .is_none());
    assert_eq!(
        fixture.store.get("theme").await.unwrap().as_deref(),
        Some("dark")
    );

    let event = events.try_recv().unwrap();
    assert_eq!(event.redirect_to, "/");
    assert!(event.request_url.ends_with("/galleries"));
    assert!(events.try_recv().is_err());

    // A fresh store over the same file sees the cleared state
    let reopened = FileTokenStore::new(fixture.store.path());
    assert!(read_tokens(&reopened, AUTH_TOKENS_KEY).await.is_none());
}

#[tokio::test]
async fn test_forbidden_keeps_session() {
    let fixture = fixture().await;
    sign_in(&fixture.store).await;

    Mock::given(method("DELETE"))
        .and(path("/galleries/g2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&fixture.server)
        .await;

    let (client, mut events) = client_for(&fixture);
    let err = client.delete("/galleries/g2").await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 403, .. }));
    assert!(read_tokens(fixture.store.as_ref(), AUTH_TOKENS_KEY)
        .await
        .is_some());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_retried_request_keeps_authorization() {
    let fixture = fixture().await;
    sign_in(&fixture.store).await;

    Mock::given(method("PUT"))
        .and(path("/galleries/g1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/galleries/g1"))
        .and(header("Authorization", "Bearer id-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
        .mount(&fixture.server)
        .await;

    let mut config = AppConfig::from_yaml(CONFIG).unwrap();
    config.environment.api_url = fixture.server.uri();
    let http = HttpClientConfig::builder()
        .base_url(fixture.server.uri())
        .timeout(Duration::from_secs(5))
        .max_retries(2)
        .backoff(
            gallery_kit::types::BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_millis(10),
        )
        .build();
    let (listener, _events) = ChannelListener::channel();
    let interceptor = AuthInterceptor::new(fixture.store.clone(), Arc::new(listener))
        .with_bypass(config.auth.bypass_rules());
    let client = HttpClient::with_interceptor(http, interceptor).unwrap();

    let body: serde_json::Value = client
        .request_json(
            Method::PUT,
            "/galleries/g1",
            RequestConfig::new().json(json!({ "name": "Portraits" })),
        )
        .await
        .unwrap();

    assert_eq!(body["updated"], true);
}

// ============================================================================
// Configuration and synthesis
// ============================================================================

#[test]
fn test_config_to_templates() {
    let config = AppConfig::from_yaml(CONFIG).unwrap();
    config.validate().unwrap();

    let templates = GalleryInfra::from_settings(&config.infra)
        .synthesize(StackSelection::All)
        .unwrap();

    let names: Vec<&str> = templates.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["gallery-database-staging", "gallery-dns-staging"]);

    let dns = &templates["gallery-dns-staging"];
    assert_eq!(
        dns.resources["WildcardCertificate"].properties["DomainName"],
        "*.photos.example.com"
    );

    let database = &templates["gallery-database-staging"];
    assert_eq!(
        database.resources["FavoritesTable"].properties["TableName"],
        "gallery-favorites-staging"
    );
}

#[test]
fn test_config_file_with_env_overrides() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gallery.yaml");
    std::fs::write(&path, CONFIG).unwrap();

    let mut config = AppConfig::load(&path).unwrap();
    config
        .apply_env_overrides(|key| match key {
            "GALLERY_STAGE" => Some("production".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.infra.stage, Stage::Prod);

    let templates = GalleryInfra::from_settings(&config.infra)
        .synthesize(StackSelection::Database)
        .unwrap();
    assert!(templates.contains_key("gallery-database-prod"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = AppConfig::load(dir.path().join("absent.yaml")).unwrap_err();

    assert!(matches!(err, Error::FileNotFound { .. }));
}
