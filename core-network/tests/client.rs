use bridge_desktop::{MemorySecureStore, ReqwestHttpClient};
use bridge_traits::http::{HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::time::ManualClock;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use core_auth::{CredentialService, RefreshCoordinator, SessionCredentialService, SessionTokens, TokenLifetimes};
use core_network::{
    ApiClient, AuthenticationCheckInterceptor, Authorizer, Endpoint, NetworkError, RequestState,
    TokenRefreshInterceptor,
};
use core_runtime::events::{CoreEvent, EventBus, NetworkEvent};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<ReqwestHttpClient> {
    Arc::new(
        ReqwestHttpClient::new()
            .unwrap()
            .with_default_policy(RetryPolicy::none()),
    )
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::builder(transport())
        .base_url(format!("{}/v1", server.uri()))
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    name: String,
}

struct ListItems {
    page: u32,
}

impl Endpoint for ListItems {
    type Response = Vec<Item>;

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn path(&self) -> String {
        "items".to_string()
    }

    fn query(&self) -> Vec<(String, String)> {
        vec![("page".to_string(), self.page.to_string())]
    }
}

#[tokio::test]
async fn joins_relative_paths_with_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .execute(HttpRequest::get("health"))
        .await
        .unwrap();

    assert_eq!(response.text().unwrap(), "ok");
}

#[tokio::test]
async fn maps_error_status_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .mount(&server)
        .await;

    let err = client(&server)
        .execute(HttpRequest::get("missing"))
        .await
        .unwrap_err();

    match err {
        NetworkError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such thing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sends_typed_endpoint_and_decodes_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "first" },
            { "id": 2, "name": "second" }
        ])))
        .mount(&server)
        .await;

    let items = client(&server).send(&ListItems { page: 3 }).await.unwrap();

    assert_eq!(
        items,
        vec![
            Item { id: 1, name: "first".to_string() },
            Item { id: 2, name: "second".to_string() },
        ]
    );
}

#[tokio::test]
async fn reports_undecodable_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).send(&ListItems { page: 1 }).await,
        Err(NetworkError::Decode(_))
    ));
}

#[tokio::test]
async fn applies_default_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-client", "foundation-tests"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::builder(transport())
        .base_url(server.uri())
        .default_header("X-Client", "foundation-tests")
        .build()
        .unwrap();

    client.execute(HttpRequest::get("anything")).await.unwrap();
}

#[tokio::test]
async fn second_resume_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let task = client(&server).request(HttpRequest::get("once"));
    task.resume().await.unwrap();

    assert_eq!(task.state(), RequestState::Finished);
    assert!(matches!(
        task.resume().await,
        Err(NetworkError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn cancel_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let task = client(&server).request(HttpRequest::get("slow"));
    let running = {
        let task = task.clone();
        tokio::spawn(async move { task.resume().await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(task.state(), RequestState::Resumed);
    task.cancel().unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("cancelled request should return promptly")
        .unwrap();

    assert!(matches!(result, Err(NetworkError::Cancelled)));
    assert_eq!(task.state(), RequestState::Cancelled);
}

#[tokio::test]
async fn emits_request_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let event_bus = EventBus::new(16);
    let mut events = event_bus.subscribe();
    let client = ApiClient::builder(transport())
        .base_url(server.uri())
        .event_bus(event_bus)
        .build()
        .unwrap();

    client.execute(HttpRequest::get("ok")).await.unwrap();
    client.execute(HttpRequest::get("broken")).await.unwrap_err();

    let ok_url = format!("{}/ok", server.uri());
    let broken_url = format!("{}/broken", server.uri());

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Network(NetworkEvent::RequestStarted { url: ok_url.clone() })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Network(NetworkEvent::RequestFinished { url: ok_url, status: 200 })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Network(NetworkEvent::RequestStarted { url: broken_url.clone() })
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Network(NetworkEvent::RequestFailed { url, .. }) if url == broken_url
    ));
}

#[tokio::test]
async fn refreshes_session_before_authorizing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({
            "refresh_token": "old-refresh",
            "access_token_ttl": 3600,
            "refresh_token_ttl": 2_592_000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/profile"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9, "name": "ada" })))
        .expect(3)
        .mount(&server)
        .await;

    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let transport = transport();
    let credentials = Arc::new(SessionCredentialService::new(
        transport.clone(),
        Arc::new(MemorySecureStore::new()),
        Url::parse(&format!("{}/auth/refresh", server.uri())).unwrap(),
        Arc::new(ManualClock::new(now)),
    ));
    credentials
        .sign_in(SessionTokens::new(
            "old-access",
            "old-refresh",
            now + ChronoDuration::seconds(30),
        ))
        .await
        .unwrap();

    let credentials: Arc<dyn CredentialService> = credentials;
    let coordinator = Arc::new(RefreshCoordinator::new(
        credentials.clone(),
        TokenLifetimes::default(),
    ));
    let client = ApiClient::builder(transport)
        .base_url(format!("{}/v1", server.uri()))
        .interceptor(Arc::new(AuthenticationCheckInterceptor::new(credentials.clone())))
        .interceptor(Arc::new(
            TokenRefreshInterceptor::new(coordinator.clone()).only_when_expiring(),
        ))
        .authorizer(Authorizer::new(credentials))
        .build()
        .unwrap();

    let results = futures::future::join_all(
        (0..3).map(|_| client.execute(HttpRequest::get("profile"))),
    )
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(coordinator.refresh_count(), 1);
}
