//! HTTP-level tests against the router on the in-memory backend.

use axum::http::StatusCode;
use axum_test::TestServer;
use memogram_api::{routes::create_router, startup::memory_state};
use serde_json::{Value, json};

fn test_server() -> TestServer {
    let state = memory_state("api-tests-secret", 4).unwrap();
    TestServer::new(create_router(state)).unwrap()
}

async fn register(server: &TestServer, email: &str, username: &str) -> Value {
    let response = server
        .post("/auth/register")
        .json(&json!({ "email": email, "username": username, "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

fn token_of(body: &Value) -> String {
    body["token"].as_str().unwrap().to_string()
}

fn meme(id: &str) -> Value {
    json!({
        "memeId": id,
        "title": format!("Meme {id}"),
        "imageUrl": format!("https://i.redd.it/{id}.jpg"),
        "subreddit": "memes",
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = test_server();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["ok"], true);
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let server = test_server();
    let response = server.get("/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>(), json!({ "error": "Not found" }));
}

#[tokio::test]
async fn register_then_wrong_password_login() {
    let server = test_server();
    let body = register(&server, "a@x.com", "alice").await;
    assert_eq!(body["user"]["username"], "alice");
    assert!(!body.to_string().to_lowercase().contains("password"));

    let response = server
        .post("/auth/login")
        .json(&json!({ "emailOrUsername": "alice", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>(), json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() {
    let server = test_server();
    register(&server, "a@x.com", "alice").await;

    let wrong_password = server
        .post("/auth/login")
        .json(&json!({ "emailOrUsername": "a@x.com", "password": "nottheone" }))
        .await;
    let unknown_user = server
        .post("/auth/login")
        .json(&json!({ "emailOrUsername": "ghost", "password": "secret1" }))
        .await;
    assert_eq!(wrong_password.status_code(), unknown_user.status_code());
    assert_eq!(wrong_password.json::<Value>(), unknown_user.json::<Value>());
}

#[tokio::test]
async fn login_by_email_and_username_return_same_user() {
    let server = test_server();
    register(&server, "a@x.com", "alice").await;

    let mut users = Vec::new();
    for identifier in ["alice", "a@x.com"] {
        let response = server
            .post("/auth/login")
            .json(&json!({ "emailOrUsername": identifier, "password": "secret1" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert!(body["token"].is_string());
        users.push(body["user"].clone());
    }
    assert_eq!(users[0], users[1]);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let server = test_server();
    register(&server, "a@x.com", "alice").await;

    for (email, username) in [("a@x.com", "alice2"), ("b@x.com", "alice")] {
        let response = server
            .post("/auth/register")
            .json(&json!({ "email": email, "username": username, "password": "secret1" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        assert!(response.json::<Value>()["error"].is_string());
    }
}

#[tokio::test]
async fn invalid_registration_reports_fields() {
    let server = test_server();
    let response = server
        .post("/auth/register")
        .json(&json!({ "email": "nope", "username": "x", "password": "1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    for field in ["email", "username", "password"] {
        assert!(body["fieldErrors"][field].is_array(), "missing {field}");
    }
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let server = test_server();
    let response = server
        .post("/auth/login")
        .text("{not json")
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn non_json_content_type_is_unsupported_media_type() {
    let server = test_server();
    let response = server.post("/auth/login").text("emailOrUsername=alice").await;
    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() {
    let server = test_server();
    let response = server
        .post("/auth/login")
        .json(&json!({ "emailOrUsername": "a".repeat(100 * 1024), "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let server = test_server();
    let body = register(&server, "a@x.com", "alice").await;

    let missing = server.get("/me").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>(), json!({ "error": "Missing token" }));

    let invalid = server.get("/me").authorization_bearer("garbage").await;
    assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);

    let response = server.get("/me").authorization_bearer(token_of(&body)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), body["user"]);
}

#[tokio::test]
async fn me_is_not_found_when_user_is_gone() {
    let server = test_server();
    let state = memory_state("api-tests-secret", 4).unwrap();
    // Same secret, different store: the token verifies but the user does not exist.
    let token = state.tokens.issue(uuid::Uuid::new_v4()).unwrap();
    let response = server.get("/me").authorization_bearer(token).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn token_from_other_secret_is_rejected() {
    let server = test_server();
    let foreign = memory_state("some-other-secret", 4).unwrap();
    let token = foreign.tokens.issue(uuid::Uuid::new_v4()).unwrap();
    let response = server.get("/saved-memes").authorization_bearer(token).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn toggle_saves_then_unsaves() {
    let server = test_server();
    let token = token_of(&register(&server, "a@x.com", "alice").await);

    let first = server.post("/saved-memes").authorization_bearer(&token).json(&meme("abc")).await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    let body = first.json::<Value>();
    assert_eq!(body["saved"], true);
    assert_eq!(body["item"]["memeId"], "abc");

    let second = server.post("/saved-memes").authorization_bearer(&token).json(&meme("abc")).await;
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(second.json::<Value>(), json!({ "saved": false }));

    let list = server.get("/saved-memes").authorization_bearer(&token).await;
    assert_eq!(list.status_code(), StatusCode::OK);
    assert_eq!(list.json::<Value>(), json!([]));
}

#[tokio::test]
async fn saved_memes_list_newest_first_and_per_user() {
    let server = test_server();
    let alice = token_of(&register(&server, "a@x.com", "alice").await);
    let bob = token_of(&register(&server, "b@x.com", "bob").await);

    for id in ["first", "second", "third"] {
        let response = server.post("/saved-memes").authorization_bearer(&alice).json(&meme(id)).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    let list = server.get("/saved-memes").authorization_bearer(&alice).await.json::<Value>();
    let ids: Vec<&str> = list.as_array().unwrap().iter().map(|m| m["memeId"].as_str().unwrap()).collect();
    assert_eq!(ids, ["third", "second", "first"]);

    let bobs = server.get("/saved-memes").authorization_bearer(&bob).await.json::<Value>();
    assert_eq!(bobs, json!([]));
}

#[tokio::test]
async fn toggle_validates_input_and_requires_auth() {
    let server = test_server();
    let unauthenticated = server.post("/saved-memes").json(&meme("abc")).await;
    assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);

    let token = token_of(&register(&server, "a@x.com", "alice").await);
    let response = server
        .post("/saved-memes")
        .authorization_bearer(&token)
        .json(&json!({ "memeId": "abc", "title": "t", "imageUrl": "not-a-url" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["fieldErrors"]["imageUrl"].is_array());
}
