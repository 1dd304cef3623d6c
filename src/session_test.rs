use super::*;
use crate::cookies::MemoryCookieStore;
use serde_json::json;

fn alice() -> SessionCredentials {
    SessionCredentials {
        username: "alice".into(),
        session_id: "s1".into(),
        email: "a@b.com".into(),
        role: "Admin".into(),
    }
}

#[test]
fn persist_then_load_round_trips() {
    let store = MemoryCookieStore::new();
    alice().persist(&store).unwrap();
    assert_eq!(SessionCredentials::load(&store), Some(alice()));
    assert_eq!(store.get("userName").as_deref(), Some("alice"));
}

#[test]
fn partial_set_is_not_authenticated() {
    let store = MemoryCookieStore::new();
    alice().persist(&store).unwrap();
    store.remove(ROLE_COOKIE).unwrap();
    assert_eq!(SessionCredentials::load(&store), None);
}

#[test]
fn empty_cookie_value_is_not_authenticated() {
    let store = MemoryCookieStore::new();
    alice().persist(&store).unwrap();
    store.set(EMAIL_COOKIE, "").unwrap();
    assert_eq!(SessionCredentials::load(&store), None);
}

#[test]
fn clear_removes_all_four() {
    let store = MemoryCookieStore::new();
    alice().persist(&store).unwrap();
    SessionCredentials::clear(&store).unwrap();
    for name in [USERNAME_COOKIE, SESSION_ID_COOKIE, EMAIL_COOKIE, ROLE_COOKIE] {
        assert_eq!(store.get(name), None, "{name} should be removed");
    }
}

#[test]
fn from_auth_response_reads_login_body() {
    let body = json!({
        "approval": true,
        "username": "alice",
        "session_id": "s1",
        "email": "a@b.com",
        "role": "Admin",
        "csrf_token": "tok1"
    });
    assert_eq!(SessionCredentials::from_auth_response(&body), Some(alice()));
}

#[test]
fn from_auth_response_requires_every_field() {
    let body = json!({ "username": "alice", "session_id": "s1", "email": "a@b.com" });
    assert_eq!(SessionCredentials::from_auth_response(&body), None);

    let body = json!({ "username": "alice", "session_id": 7, "email": "a@b.com", "role": "User" });
    assert_eq!(SessionCredentials::from_auth_response(&body), None);
}
