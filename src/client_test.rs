use super::*;
use crate::cookies::{CSRF_TOKEN_COOKIE, SESSION_ID_COOKIE};
use crate::request::{CSRF_TOKEN_HEADER, MultipartForm, PreparedBody, SESSION_ID_HEADER};
use crate::transport::test_helpers::{MockTransport, ok, status};
use serde_json::json;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn config() -> ClientConfig {
    ClientConfig::new("http://backend.test").unwrap()
}

fn client_with(transport: Arc<MockTransport>) -> (ApiClient, Arc<MemoryCookieStore>) {
    let store = Arc::new(MemoryCookieStore::new());
    let client = ApiClient::new(config(), store.clone(), transport);
    (client, store)
}

fn login_body() -> Value {
    json!({
        "approval": true,
        "username": "a",
        "session_id": "s1",
        "email": "a@b.com",
        "role": "Admin",
        "csrf_token": "tok1"
    })
}

// =========================================================================
// auth scenarios
// =========================================================================

#[tokio::test]
async fn login_caches_token_and_next_get_carries_credentials() {
    let transport = Arc::new(MockTransport::new(vec![ok(login_body()), ok(json!({ "name": "a" }))]));
    let (client, store) = client_with(transport.clone());

    let body = json!({ "email_id": "a@b.com", "password": "x", "role": "Admin" });
    let resp = client.post("/login", body, RequestConfig::new()).await.unwrap();
    assert_eq!(resp["approval"], json!(true));
    assert_eq!(client.token_cache().token().as_deref(), Some("tok1"));
    assert_eq!(store.get(CSRF_TOKEN_COOKIE).as_deref(), Some("tok1"));
    assert_eq!(store.get(SESSION_ID_COOKIE).as_deref(), Some("s1"));

    client.get("/fetchuser", RequestConfig::new()).await.unwrap();
    let sent = transport.sent();
    assert!(sent[0].header(CSRF_TOKEN_HEADER).is_none());
    assert_eq!(sent[1].url, "http://backend.test/fetchuser");
    assert_eq!(sent[1].header(CSRF_TOKEN_HEADER), Some("tok1"));
    assert_eq!(sent[1].header(SESSION_ID_HEADER), Some("s1"));
}

#[tokio::test]
async fn guest_login_without_token_leaves_cache_empty() {
    let guest = json!({ "approval": true, "username": "guest" });
    let transport = Arc::new(MockTransport::new(vec![ok(guest), ok(json!({ "ok": true }))]));
    let (client, _store) = client_with(transport.clone());

    client.get("/login_guest", RequestConfig::new()).await.unwrap();
    assert_eq!(client.token_cache().token(), None);

    client
        .post("/add-tool", json!({ "tool_name": "search" }), RequestConfig::new())
        .await
        .unwrap();
    let sent = transport.sent();
    assert!(sent[1].header(CSRF_TOKEN_HEADER).is_none());
    assert!(sent[1].header(SESSION_ID_HEADER).is_none());
}

#[tokio::test]
async fn token_on_unrelated_path_is_ignored() {
    let transport = Arc::new(MockTransport::new(vec![ok(json!({ "csrf_token": "abc" }))]));
    let (client, store) = client_with(transport);

    client.get("/login_history", RequestConfig::new()).await.unwrap();
    assert_eq!(client.token_cache().token(), None);
    assert_eq!(store.get(CSRF_TOKEN_COOKIE), None);
}

#[tokio::test]
async fn registration_and_exact_login_paths_cache_token() {
    let transport = Arc::new(MockTransport::new(vec![ok(json!({ "csrf_token": "reg" }))]));
    let (client, _store) = client_with(transport);

    client
        .post("/registration", json!({ "username": "b" }), RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(client.token_cache().token().as_deref(), Some("reg"));
}

#[tokio::test]
async fn malformed_csrf_token_is_skipped() {
    let transport = Arc::new(MockTransport::new(vec![ok(json!({ "csrf_token": 42 })), ok(json!({ "csrf_token": "" }))]));
    let (client, _store) = client_with(transport);

    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    assert_eq!(client.token_cache().token(), None);
}

#[tokio::test]
async fn relogin_replaces_cached_session_id() {
    let mut second = login_body();
    second["session_id"] = json!("s2");
    second["csrf_token"] = json!("tok2");
    let transport = Arc::new(MockTransport::new(vec![ok(login_body()), ok(second), ok(json!({}))]));
    let (client, _store) = client_with(transport.clone());

    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    assert_eq!(client.token_cache().session_id().as_deref(), Some("s1"));
    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    client.get("/fetchuser", RequestConfig::new()).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent[2].header(CSRF_TOKEN_HEADER), Some("tok2"));
    assert_eq!(sent[2].header(SESSION_ID_HEADER), Some("s2"));
}

#[tokio::test]
async fn guest_session_id_is_kept_without_full_credentials() {
    let guest = json!({ "username": "guest-7", "session_id": "g1", "role": "Guest", "csrf_token": "gtok" });
    let transport = Arc::new(MockTransport::new(vec![ok(guest), ok(json!({}))]));
    let (client, store) = client_with(transport.clone());

    client.get("/login_guest", RequestConfig::new()).await.unwrap();
    assert_eq!(store.get(SESSION_ID_COOKIE).as_deref(), Some("g1"));
    assert!(SessionCredentials::load(&*store).is_none());

    client
        .post("/add-tool", json!({ "tool_name": "search" }), RequestConfig::new())
        .await
        .unwrap();
    let sent = transport.sent();
    assert_eq!(sent[1].header(CSRF_TOKEN_HEADER), Some("gtok"));
    assert_eq!(sent[1].header(SESSION_ID_HEADER), Some("g1"));
}

#[tokio::test]
async fn relogin_with_bare_session_id_pairs_new_token() {
    let partial = json!({ "session_id": "s2", "csrf_token": "tok2" });
    let transport = Arc::new(MockTransport::new(vec![ok(login_body()), ok(partial), ok(json!({}))]));
    let (client, store) = client_with(transport.clone());

    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    assert_eq!(client.token_cache().session_id().as_deref(), Some("s1"));
    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    client.get("/fetchuser", RequestConfig::new()).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent[2].header(CSRF_TOKEN_HEADER), Some("tok2"));
    assert_eq!(sent[2].header(SESSION_ID_HEADER), Some("s2"));
    // The rest of the earlier credential set is left as it was.
    assert_eq!(SessionCredentials::load(&*store).unwrap().session_id, "s2");
}

#[tokio::test]
async fn empty_session_id_does_not_overwrite_cookie() {
    let blank = json!({ "session_id": "", "csrf_token": "tok2" });
    let transport = Arc::new(MockTransport::new(vec![ok(login_body()), ok(blank)]));
    let (client, store) = client_with(transport);

    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    assert_eq!(store.get(SESSION_ID_COOKIE).as_deref(), Some("s1"));
}

#[tokio::test]
async fn token_survives_fresh_client_over_same_cookies() {
    let transport = Arc::new(MockTransport::new(vec![ok(login_body())]));
    let (client, store) = client_with(transport);
    client.post("/login", json!({}), RequestConfig::new()).await.unwrap();
    drop(client);

    let transport = Arc::new(MockTransport::new(Vec::new()));
    let reloaded = ApiClient::new(config(), store, transport.clone());
    reloaded.get("/agents", RequestConfig::new()).await.unwrap();
    assert_eq!(transport.sent()[0].header(CSRF_TOKEN_HEADER), Some("tok1"));
    assert_eq!(transport.sent()[0].header(SESSION_ID_HEADER), Some("s1"));
}

// =========================================================================
// bodies
// =========================================================================

#[tokio::test]
async fn multipart_post_has_no_content_type() {
    let transport = Arc::new(MockTransport::new(Vec::new()));
    let (client, _store) = client_with(transport.clone());

    let form = MultipartForm::new().text("name", "csv").file("file", "rows.csv", b"a,b".to_vec(), None);
    client.post("/upload", form, RequestConfig::new()).await.unwrap();

    let sent = transport.sent();
    assert!(sent[0].header("content-type").is_none());
    assert!(matches!(sent[0].body, PreparedBody::Multipart(_)));
}

#[tokio::test]
async fn delete_without_body_sends_empty() {
    let transport = Arc::new(MockTransport::new(vec![TransportResponse { status: 204, body: Vec::new() }]));
    let (client, _store) = client_with(transport.clone());

    let resp = client.delete("/agents/7", (), RequestConfig::new()).await.unwrap();
    assert_eq!(resp, Value::Null);
    assert_eq!(transport.sent()[0].body, PreparedBody::Empty);
}

#[tokio::test]
async fn get_json_decodes_typed_body() {
    #[derive(serde::Deserialize)]
    struct Agent {
        name: String,
    }
    let transport = Arc::new(MockTransport::new(vec![ok(json!([{ "name": "planner" }, { "name": "critic" }]))]));
    let (client, _store) = client_with(transport);

    let agents: Vec<Agent> = client.get_json("/agents", RequestConfig::new()).await.unwrap();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1].name, "critic");
}

// =========================================================================
// errors
// =========================================================================

#[tokio::test]
async fn non_2xx_is_recorded_and_returned() {
    let transport = Arc::new(MockTransport::new(vec![status(403, "csrf mismatch"), ok(json!({}))]));
    let (client, _store) = client_with(transport);

    let err = client.post("/add-tool", json!({}), RequestConfig::new()).await.unwrap_err();
    assert_eq!(err, ClientError::Status { status: 403, body: "csrf mismatch".into() });
    assert!(err.is_unauthorized());
    assert_eq!(client.error(Verb::Post), Some(err));
    assert!(client.error(Verb::Get).is_none());

    // The next post clears the slot when it starts.
    client.post("/add-tool", json!({}), RequestConfig::new()).await.unwrap();
    assert!(client.error(Verb::Post).is_none());
}

#[tokio::test]
async fn failed_login_does_not_cache_token() {
    let transport = Arc::new(MockTransport::new(vec![status(401, r#"{"csrf_token":"nope"}"#)]));
    let (client, _store) = client_with(transport);

    assert!(client.post("/login", json!({}), RequestConfig::new()).await.is_err());
    assert_eq!(client.token_cache().token(), None);
}

#[tokio::test]
async fn invalid_json_body_is_decode_error() {
    let transport = Arc::new(MockTransport::new(vec![status(200, "<html>")]));
    let (client, _store) = client_with(transport);

    let err = client.get("/eval/metrics", RequestConfig::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert_eq!(client.tracker().error_by_key("fetch"), Some(err));
}

#[tokio::test]
async fn slow_transport_times_out() {
    let transport = Arc::new(MockTransport::slow(Duration::from_secs(5)));
    let (client, _store) = client_with(transport);

    let config = RequestConfig::new().timeout(Duration::from_millis(20));
    let err = client.put("/agents/1", json!({}), config).await.unwrap_err();
    assert_eq!(err, ClientError::Timeout { after_ms: 20 });
    assert_eq!(client.error(Verb::Put), Some(err));
    assert!(!client.loading());
}

#[tokio::test]
async fn cancelled_request_settles_with_cancelled() {
    let transport = Arc::new(MockTransport::slow(Duration::from_secs(5)));
    let (client, _store) = client_with(transport);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .get("/agents", RequestConfig::new().cancel_on(cancel))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Cancelled);
    assert!(!client.is_loading(Verb::Get));
}

#[tokio::test]
async fn cancel_mid_flight_releases_loading_and_records_error() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(MockTransport::gated(Vec::new(), gate));
    let (client, _store) = client_with(transport.clone());

    let cancel = CancellationToken::new();
    let pending = client.clone();
    let config = RequestConfig::new().cancel_on(cancel.clone());
    let handle = tokio::spawn(async move { pending.get("/agents", config).await });

    while transport.sent().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(client.is_loading(Verb::Get));
    cancel.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err, ClientError::Cancelled);
    assert!(!client.is_loading(Verb::Get));
    assert_eq!(client.tracker().in_flight(Verb::Get), 0);
    assert_eq!(client.error(Verb::Get), Some(ClientError::Cancelled));
}

// =========================================================================
// loading
// =========================================================================

#[tokio::test]
async fn loading_true_while_post_pending() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(MockTransport::gated(vec![ok(json!({ "saved": true }))], gate.clone()));
    let (client, _store) = client_with(transport);
    assert!(!client.loading());

    let pending = client.clone();
    let handle = tokio::spawn(async move { pending.post("/add-agent", json!({ "name": "x" }), RequestConfig::new()).await });

    while !client.is_loading(Verb::Post) {
        tokio::task::yield_now().await;
    }
    assert!(client.loading());
    assert!(!client.is_loading(Verb::Get));

    gate.notify_one();
    let resp = handle.await.unwrap().unwrap();
    assert_eq!(resp["saved"], json!(true));
    assert!(!client.loading());
}
