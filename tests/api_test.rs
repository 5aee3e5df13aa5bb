use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};
use todo_api::{routes, ApiKeySettings, AppState, Config, Database};
use tower::ServiceExt;

fn setup(name: &str, api_key_limit: usize) -> (Router, Database) {
    setup_with_release(name, api_key_limit, None)
}

fn setup_with_release(
    name: &str,
    api_key_limit: usize,
    todos_release_date: Option<chrono::NaiveDate>,
) -> (Router, Database) {
    let test_db_dir = "tests/test_db";
    if !Path::new(test_db_dir).exists() {
        fs::create_dir_all(test_db_dir).expect("Failed to create test_db directory");
    }
    let db_path = format!("{}/{}.sqlite", test_db_dir, name);
    let _ = fs::remove_file(&db_path);

    let db = Database::new(&db_path).expect("Failed to create test database");
    let config = Config {
        server_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_path: db_path,
        api_key_prefix: "todo".to_string(),
        api_keys: ApiKeySettings {
            api_key_limit,
            expiration_minutes: 10,
        },
        todos_release_date,
    };

    (routes::router(AppState::new(db.clone(), &config)), db)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    (status, body)
}

fn json_request(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn keyed(method: &str, uri: &str, api_key: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Api-Key", api_key);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn text(body: &[u8]) -> String {
    String::from_utf8(body.to_vec()).unwrap()
}

fn parse(body: &[u8]) -> JsonValue {
    serde_json::from_slice(body).expect("json body")
}

async fn issue_key(app: &Router, username: &str, password: &str) -> JsonValue {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/apiKeys",
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", text(&body));
    parse(&body)
}

#[tokio::test]
async fn api_key_quota_is_enforced() {
    let (app, db) = setup("api_quota", 1);
    let alice = db.create_user("alice", "secret").unwrap();

    let created = issue_key(&app, "alice", "secret").await;
    assert_eq!(created["userId"], json!(alice.id));
    assert_eq!(created["isActive"], json!(true));
    assert!(created["apiKey"].as_str().unwrap().starts_with("todo_"));

    let issued_at: chrono::DateTime<Utc> =
        serde_json::from_value(created["dateCreated"].clone()).unwrap();
    let expires_at: chrono::DateTime<Utc> =
        serde_json::from_value(created["expirationDate"].clone()).unwrap();
    assert_eq!(expires_at - issued_at, Duration::minutes(10));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/apiKeys",
            json!({ "username": "alice", "password": "secret" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text(&body), "Api key limit is reached");
}

#[tokio::test]
async fn api_key_creation_rejects_bad_credentials() {
    let (app, db) = setup("api_bad_credentials", 3);
    db.create_user("alice", "secret").unwrap();

    let (status, body) = send(
        &app,
        json_request("POST", "/apiKeys", json!({ "username": "bob", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(text(&body), "User with Username: 'bob' does not exists!");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/apiKeys",
            json!({ "username": "alice", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text(&body), "Wrong password for user: 'alice'");
}

#[tokio::test]
async fn api_keys_are_listed_per_user() {
    let (app, db) = setup("api_list", 3);
    db.create_user("alice", "secret").unwrap();
    db.create_user("bob", "hunter2").unwrap();

    let first = issue_key(&app, "alice", "secret").await;
    let second = issue_key(&app, "alice", "secret").await;
    issue_key(&app, "bob", "hunter2").await;

    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(&app, get("/apiKeys?username=alice&password=secret")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = parse(&body);
    let ids: Vec<&JsonValue> = listed.as_array().unwrap().iter().map(|k| &k["id"]).collect();
    assert_eq!(ids, vec![&first["id"], &second["id"]]);

    let (status, body) = send(&app, get("/apiKeys?username=alice&password=nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text(&body), "Wrong password for user: 'alice'");

    let (status, _) = send(&app, get("/apiKeys?username=carol&password=secret")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_key_state_can_be_toggled() {
    let (app, db) = setup("api_toggle", 3);
    db.create_user("alice", "secret").unwrap();
    let created = issue_key(&app, "alice", "secret").await;
    let uri = format!("/apiKeys/{}/isActive", created["id"].as_str().unwrap());

    for _ in 0..2 {
        let (status, body) =
            send(&app, json_request("PUT", &uri, json!({ "isActive": false }))).await;
        assert_eq!(status, StatusCode::OK);
        let updated = parse(&body);
        assert_eq!(updated["isActive"], json!(false));
        assert_eq!(updated["apiKey"], created["apiKey"]);
    }

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/apiKeys/{}/isActive", missing),
            json!({ "isActive": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        text(&body),
        format!("Api key with Id: '{}' does not exists", missing)
    );
}

#[tokio::test]
async fn todos_require_a_valid_api_key() {
    let (app, db) = setup("todos_auth", 3);
    db.create_user("alice", "secret").unwrap();

    let (status, _) = send(
        &app,
        Request::builder().uri("/todos").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, keyed("GET", "/todos", "todo_forged_key", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let created = issue_key(&app, "alice", "secret").await;
    let api_key = created["apiKey"].as_str().unwrap();

    let bearer = Request::builder()
        .uri("/todos")
        .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, bearer).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/apiKeys/{}/isActive", created["id"].as_str().unwrap());
    send(&app, json_request("PUT", &uri, json!({ "isActive": false }))).await;

    let (status, body) = send(&app, keyed("GET", "/todos", api_key, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(text(&body), "API key is inactive");
}

#[tokio::test]
async fn todo_crud_flow() {
    let (app, db) = setup("todos_crud", 3);
    db.create_user("alice", "secret").unwrap();
    let created = issue_key(&app, "alice", "secret").await;
    let api_key = created["apiKey"].as_str().unwrap();

    let request = keyed(
        "POST",
        "/todos",
        api_key,
        Some(json!({ "title": "Buy milk", "description": null, "difficulty": "Easy" })),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let todo = parse(&body);
    assert_eq!(location, format!("/todos/{}", todo["id"].as_str().unwrap()));
    assert_eq!(todo["isDone"], json!(false));
    assert_eq!(todo["difficulty"], json!("Easy"));

    let (status, body) = send(&app, keyed("GET", "/todos", api_key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body).as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        keyed(
            "PUT",
            &location,
            api_key,
            Some(json!({ "title": "Buy oat milk", "description": "2 litres" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = parse(&body);
    assert_eq!(updated["title"], json!("Buy oat milk"));
    assert_eq!(updated["description"], json!("2 litres"));
    assert_eq!(updated["difficulty"], json!("Easy"));

    let toggle = format!("{}/toggleStatus", location);
    let (status, body) = send(&app, keyed("PATCH", &toggle, api_key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["isDone"], json!(true));

    let (status, body) = send(&app, keyed("GET", &location, api_key, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["isDone"], json!(true));

    let (status, _) = send(&app, keyed("DELETE", &location, api_key, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, keyed("GET", &location, api_key, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        text(&body),
        format!(
            "Todo item with id: '{}' does not exist",
            todo["id"].as_str().unwrap()
        )
    );
}

#[tokio::test]
async fn todos_of_other_users_are_not_visible() {
    let (app, db) = setup("todos_isolation", 3);
    db.create_user("alice", "secret").unwrap();
    db.create_user("bob", "hunter2").unwrap();
    let alice_key = issue_key(&app, "alice", "secret").await;
    let bob_key = issue_key(&app, "bob", "hunter2").await;
    let alice_key = alice_key["apiKey"].as_str().unwrap();
    let bob_key = bob_key["apiKey"].as_str().unwrap();

    let (_, body) = send(
        &app,
        keyed(
            "POST",
            "/todos",
            alice_key,
            Some(json!({ "title": "Private", "difficulty": "Hard" })),
        ),
    )
    .await;
    let uri = format!("/todos/{}", parse(&body)["id"].as_str().unwrap());

    let (status, _) = send(&app, keyed("GET", &uri, bob_key, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, keyed("DELETE", &uri, bob_key, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, keyed("GET", "/todos", bob_key, None)).await;
    assert!(parse(&body).as_array().unwrap().is_empty());

    let (status, _) = send(&app, keyed("GET", &uri, alice_key, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn todo_listing_waits_for_release_date() {
    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let (app, db) = setup_with_release("todos_release", 3, Some(tomorrow));
    db.create_user("alice", "secret").unwrap();
    let created = issue_key(&app, "alice", "secret").await;

    let (status, body) = send(
        &app,
        keyed("GET", "/todos", created["apiKey"].as_str().unwrap(), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text(&body), "Feature not released");
}

#[tokio::test]
async fn todo_listing_is_open_from_release_date_on() {
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);

    for (name, release_date) in [("todos_release_today", today), ("todos_release_past", yesterday)] {
        let (app, db) = setup_with_release(name, 3, Some(release_date));
        db.create_user("alice", "secret").unwrap();
        let created = issue_key(&app, "alice", "secret").await;

        let (status, body) = send(
            &app,
            keyed("GET", "/todos", created["apiKey"].as_str().unwrap(), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "release date {}: {}", release_date, text(&body));
        assert!(parse(&body).as_array().unwrap().is_empty());
    }
}
