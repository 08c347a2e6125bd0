//! End-to-end flows through the `Vm6Client` facade against a mock API.

use serde_json::json;
use vm6::{Error, HostId, JsonObject, RetryPolicy, UserId, Vm6Client};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_HEADER: &str = "x-xsrf-token";

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v4/public/token"))
        .and(body_json(json!({"email": "ops@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confirmed": true,
            "expires_at": "2026-10-19 10:00:00",
            "id": 1,
            "token": token
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> Vm6Client {
    Vm6Client::new(server.uri(), "ops@example.com", "pw").unwrap()
}

#[tokio::test]
async fn login_then_calls_carry_token() {
    let server = MockServer::start().await;
    mount_login(&server, "1-session").await;

    Mock::given(method("GET"))
        .and(path("/vm/v3/host/10"))
        .and(header(TOKEN_HEADER, "1-session"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 10, "name": "app"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v4/user/1/key"))
        .and(header(TOKEN_HEADER, "1-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "k"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_authenticated());

    client.login().await.unwrap();
    assert!(client.is_authenticated());

    let host = client.vm(10u64).await.unwrap();
    assert_eq!(host["name"], "app");
    assert_eq!(client.get_auth_key(1u64).await.unwrap(), "k");
}

#[tokio::test]
async fn no_token_header_before_login_or_after_logout() {
    let server = MockServer::start().await;
    mount_login(&server, "tok").await;
    Mock::given(method("POST"))
        .and(path("/vm/v3/host/4/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.start(4u64).await.unwrap();
    client.login().await.unwrap();
    client.start(4u64).await.unwrap();
    client.logout();
    client.start(4u64).await.unwrap();

    let starts: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/vm/v3/host/4/start")
        .collect();
    assert_eq!(starts.len(), 3);
    assert!(!starts[0].headers.contains_key(TOKEN_HEADER));
    assert_eq!(starts[1].headers.get(TOKEN_HEADER).unwrap(), "tok");
    assert!(!starts[2].headers.contains_key(TOKEN_HEADER));
}

#[tokio::test]
async fn service_unavailable_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vm/v3/host/2/vnc_settings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting up"))
        .up_to_n_times(4)
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vm/v3/host/2/vnc_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"port": 5900})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = client_for(&server).vnc_settings(2u64).await.unwrap();
    assert_eq!(settings["port"], 5900);
}

#[tokio::test]
async fn bounded_retry_surfaces_503() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/vm/v3/host/2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(2)
        .mount(&server)
        .await;

    let client = Vm6Client::builder(server.uri(), "ops@example.com", "pw")
        .unwrap()
        .with_retry_policy(RetryPolicy::new().with_max_retries(1))
        .build()
        .unwrap();
    let err = client.remove(2u64).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.body(), Some("down"));
}

#[tokio::test]
async fn statuses_above_201_are_errors() {
    let server = MockServer::start().await;
    for (id, status) in [(1u64, 202u16), (2, 400), (3, 403), (4, 500)] {
        Mock::given(method("POST"))
            .and(path(format!("/vm/v3/host/{id}/stop").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_string(format!("status {status}")))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    for (id, status) in [(1u64, 202u16), (2, 400), (3, 403), (4, 500)] {
        let err = client.stop(id).await.unwrap_err();
        assert_eq!(
            err,
            Error::Status {
                status,
                body: format!("status {status}")
            }
        );
    }
}

#[tokio::test]
async fn create_returns_body_unchanged() {
    let server = MockServer::start().await;
    let reply = json!({"id": 77, "task": 901, "ip_addresses": ["10.0.0.7"]});
    Mock::given(method("POST"))
        .and(path("/vm/v3/host"))
        .and(body_json(json!({"name": "web", "cluster": 1})))
        .respond_with(ResponseTemplate::new(201).set_body_json(&reply))
        .expect(1)
        .mount(&server)
        .await;

    let mut params = JsonObject::new();
    params.insert("name".to_string(), json!("web"));
    params.insert("cluster".to_string(), json!(1));

    let created = client_for(&server).create(&params).await.unwrap();
    assert_eq!(serde_json::Value::Object(created), reply);
}

#[tokio::test]
async fn restart_is_forced_and_uses_string_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vm/v3/host/abc/restart"))
        .and(body_json(json!({"force": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let id: HostId = "abc".parse().unwrap();
    client_for(&server).restart(id).await.unwrap();
}

#[tokio::test]
async fn failed_login_leaves_client_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v4/public/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":{"code":3001}}"#))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.login().await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn login_accepts_null_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v4/public/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "confirmed": null,
            "id": null,
            "token": "t-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vm/v3/host/6"))
        .and(header(TOKEN_HEADER, "t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 6})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.login().await.unwrap();
    assert_eq!(response.id, 0);
    assert!(client.is_authenticated());
    client.vm(6u64).await.unwrap();
}

fn client_with_token(server: &MockServer, token: &str) -> Vm6Client {
    Vm6Client::builder(server.uri(), "ops@example.com", "pw")
        .unwrap()
        .with_token(token)
        .build()
        .unwrap()
}

#[tokio::test]
async fn login_with_empty_token_logs_out() {
    let server = MockServer::start().await;
    mount_login(&server, "").await;
    Mock::given(method("POST"))
        .and(path("/vm/v3/host/4/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "old");
    assert!(client.is_authenticated());
    client.login().await.unwrap();
    assert!(!client.is_authenticated());

    client.start(4u64).await.unwrap();
    let requests = server.received_requests().await.unwrap();
    let start = requests
        .iter()
        .find(|request| request.url.path() == "/vm/v3/host/4/start")
        .unwrap();
    assert!(!start.headers.contains_key(TOKEN_HEADER));
}

#[tokio::test]
async fn rejected_login_keeps_previous_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v4/public/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vm/v3/host/4"))
        .and(header(TOKEN_HEADER, "old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "old");
    let err = client.login().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(client.is_authenticated());
    client.vm(4u64).await.unwrap();
}

#[tokio::test]
async fn ids_cannot_leave_their_path_segment() {
    for raw in ["5/stop", "..", ".", "../../auth/v4/public/token", "5?force=true", "%2e%2e"] {
        assert!(raw.parse::<HostId>().is_err(), "accepted host id {raw:?}");
        assert!(UserId::try_from(raw).is_err(), "accepted user id {raw:?}");
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vm/v3/host/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let id: HostId = serde_json::from_value(json!("5")).unwrap();
    client_for(&server).vm(id).await.unwrap();
    assert!(serde_json::from_value::<HostId>(json!("5/stop")).is_err());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/vm/v3/host/5");
}
