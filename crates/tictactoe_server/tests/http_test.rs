//! Tests for the REST routes, driven through the router without a socket.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tictactoe_engine::GamePolicy;
use tictactoe_server::{
    ChannelReminderQueue, LeagueService, SqliteRepository, router, run_migrations,
};
use tower::ServiceExt;

fn setup_app() -> (NamedTempFile, Router) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    run_migrations(&db_path).expect("Migrations failed");
    let store = SqliteRepository::new(db_path).expect("Failed to create repository");
    // Reminders are dropped with the receiver; enqueue failures only log.
    let (queue, _receiver) = ChannelReminderQueue::channel();
    let service = LeagueService::new(store, queue, GamePolicy::default());
    (db_file, router(service))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };
    (status, value)
}

async fn register(app: &Router, name: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/user",
        Some(json!({ "user_name": name, "email": format!("{name}@example.com") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn start_game(app: &Router) -> String {
    register(app, "alice").await;
    register(app, "bob").await;
    let (status, game) = send(
        app,
        Method::POST,
        "/game",
        Some(json!({ "player_x": "alice", "player_o": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    game["key"].as_str().expect("Missing key").to_string()
}

#[tokio::test]
async fn test_create_user_and_duplicate() {
    let (_db, app) = setup_app();
    let (status, user) = send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "user_name": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["name"], "alice");
    assert_eq!(user["score"], 0);

    let (status, err) = send(
        &app,
        Method::POST,
        "/user",
        Some(json!({ "user_name": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "duplicate_user");
}

#[tokio::test]
async fn test_play_to_win() {
    let (_db, app) = setup_app();
    let key = start_game(&app).await;
    let uri = format!("/game/{key}");

    for (user, cell) in [("alice", 0), ("bob", 4), ("alice", 1), ("bob", 5)] {
        let (status, game) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({ "user_name": user, "move": cell })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(game["game_over"], false);
    }
    let (status, game) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "user_name": "alice", "move": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["game_over"], true);
    assert_eq!(game["winner"], "alice");
    assert_eq!(game["has_to_move"], Value::Null);

    let (_, history) = send(&app, Method::GET, &format!("{uri}/history"), None).await;
    assert_eq!(history.as_array().map(Vec::len), Some(6));

    let (_, ranking) = send(&app, Method::GET, "/user/ranking", None).await;
    assert_eq!(ranking[0]["name"], "alice");
    assert_eq!(ranking[0]["score"], 3);

    let (_, scores) = send(&app, Method::GET, "/scores/user/bob", None).await;
    assert_eq!(scores[0]["result"], "player_x_won");

    let (status, err) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "game_already_over");
}

#[tokio::test]
async fn test_error_statuses() {
    let (_db, app) = setup_app();
    let key = start_game(&app).await;
    let uri = format!("/game/{key}");

    let (status, err) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "user_name": "bob", "move": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "not_your_turn");

    let (status, err) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "user_name": "alice", "move": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_move");

    let (status, err) = send(&app, Method::GET, "/game/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "game_not_found");

    let (status, err) = send(&app, Method::GET, "/game/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_key");

    let (status, err) = send(&app, Method::GET, "/user/nobody/games", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "user_not_found");

    let (status, err) = send(
        &app,
        Method::POST,
        "/game",
        Some(json!({ "player_x": "alice", "player_o": "bob", "board_dimension": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_dimension");
}

#[tokio::test]
async fn test_user_games_and_cancel() {
    let (_db, app) = setup_app();
    let key = start_game(&app).await;

    let (status, games) = send(&app, Method::GET, "/user/bob/games", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(games[0]["key"], key.as_str());
    assert_eq!(games[0]["has_to_move"], "alice");

    let (status, body) = send(&app, Method::DELETE, &format!("/game/{key}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, games) = send(&app, Method::GET, "/user/bob/games", None).await;
    assert_eq!(games, json!([]));
    let (_, scores) = send(&app, Method::GET, "/scores", None).await;
    assert_eq!(scores, json!([]));
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let (_db, app) = setup_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/user")
        .header("content-type", "application/json")
        .body(Body::from("{\"user_name\": "))
        .expect("Failed to build request");
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let err: Value = serde_json::from_slice(&bytes).expect("Body is not JSON");
    assert_eq!(err["code"], "invalid_request");
    assert!(err["message"].as_str().is_some_and(|m| !m.is_empty()));

    // Well-formed JSON missing a required field.
    let (status, err) = send(
        &app,
        Method::PUT,
        "/game/1",
        Some(json!({ "user_name": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_request");

    let (status, err) = send(&app, Method::POST, "/game", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_request");
}
