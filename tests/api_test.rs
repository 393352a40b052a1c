//! End-to-end tests over the HTTP surface.
//!
//! Each test builds the full router on a fresh on-disk database and drives
//! it with `oneshot` requests, so extractors, error envelopes and the social
//! core are exercised together.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use bhasa::config::Config;
use bhasa::db;
use bhasa::media::{DisabledMediaStore, LocalMediaStore, MediaStore};
use bhasa::routes;
use bhasa::state::AppState;

const PASSWORD: &str = "Password123";
const BASE_URL: &str = "http://localhost:8000";
const TEST_BCRYPT_COST: u32 = 4;

struct TestApp {
    _tmp: TempDir,
    router: Router,
}

fn build_app(media_enabled: bool) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let mut config = Config::default();
    config.auth.bcrypt_cost = TEST_BCRYPT_COST;
    config.media.path = Some(tmp.path().join("uploads"));

    let media: Arc<dyn MediaStore> = if media_enabled {
        Arc::new(LocalMediaStore::new(config.uploads_path(), BASE_URL))
    } else {
        Arc::new(DisabledMediaStore)
    };

    let state = AppState {
        db: pool,
        config: Arc::new(config),
        media,
    };
    TestApp {
        _tmp: tmp,
        router: routes::router(state),
    }
}

fn test_app() -> TestApp {
    build_app(true)
}

impl TestApp {
    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Register and log in; returns (user_id, token).
    async fn signup(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": "User",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let user_id = body["data"]["user_id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        assert_eq!(body["data"]["token_type"], "bearer");
        let token = body["data"]["access_token"].as_str().unwrap().to_string();

        (user_id, token)
    }

    async fn create_post(&self, token: &str, content: &str) -> String {
        let (status, body) = self
            .post("/api/posts", Some(token), json!({ "content": content }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");
        body["data"]["post_id"].as_str().unwrap().to_string()
    }

    async fn upload(&self, uri: &str, token: &str, content_type: &str, data: &[u8]) -> (StatusCode, Value) {
        let boundary = "bhasa-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"img\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_reports_service() {
    let app = test_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "bhasa");
}

#[tokio::test]
async fn register_login_post_like_follow_flow() {
    let app = test_app();
    let (alice_id, alice) = app.signup("alice@example.com").await;
    let (bob_id, bob) = app.signup("bob@example.com").await;

    let (status, body) = app
        .post("/api/posts", Some(&alice), json!({ "content": "Namaste!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["language"], "English");
    assert_eq!(body["data"]["content"], "Namaste!");
    let post_id = body["data"]["post_id"].as_str().unwrap().to_string();

    let like_uri = format!("/api/posts/{post_id}/like");
    let (_, first) = app.post(&like_uri, Some(&bob), json!({})).await;
    assert_eq!(first["success"], true);
    assert_eq!(first["message"], "Post liked successfully");
    let (status, second) = app.post(&like_uri, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["success"], false);
    assert_eq!(second["message"], "Post already liked");

    let (_, post) = app.get(&format!("/api/posts/{post_id}"), Some(&bob)).await;
    assert_eq!(post["data"]["like_count"], 1);
    assert_eq!(post["data"]["is_liked"], true);
    assert_eq!(post["data"]["user"]["id"], alice_id.as_str());

    let follow_uri = format!("/api/users/{alice_id}/follow");
    let (_, followed) = app.post(&follow_uri, Some(&bob), json!({})).await;
    assert_eq!(followed["success"], true);
    let (_, unfollowed) = app.delete(&follow_uri, &bob).await;
    assert_eq!(unfollowed["success"], true);
    let (_, again) = app.delete(&follow_uri, &bob).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["message"], "Not following this user");

    let (_, profile) = app.get(&format!("/api/users/{bob_id}"), Some(&alice)).await;
    assert_eq!(profile["data"]["following_count"], 0);
}

#[tokio::test]
async fn mutations_require_a_valid_token() {
    let app = test_app();
    let (status, body) = app
        .post("/api/posts", None, json!({ "content": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 401);

    let (status, _) = app
        .post("/api/posts", Some("not-a-token"), json!({ "content": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads accept an invalid token as anonymous
    let (status, _) = app.get("/api/posts", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "a@example.com");
    assert!(me["data"].get("password_hash").is_none());

    let (status, _) = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_bad_login_is_401() {
    let app = test_app();
    app.signup("a@example.com").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "email": "a@example.com",
                "password": PASSWORD,
                "first_name": "Other",
                "last_name": "Person",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with email a@example.com already exists");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "a@example.com", "password": "Wrong1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn post_validation_errors_name_the_field() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .post("/api/posts", Some(&token), json!({ "content": "x".repeat(501) }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "content");

    let (status, body) = app
        .post(
            "/api/posts",
            Some(&token),
            json!({ "content": "hola", "language": "Spanish" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Language must be one of: English, Hindi");
}

#[tokio::test]
async fn malformed_bodies_and_queries_use_the_envelope() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .post("/api/posts", Some(&token), json!({ "content": 42 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/posts?limit=51", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "limit");

    let (status, _) = app.get("/api/posts?page=abc", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_path_ids_are_unprocessable() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    for uri in [
        "/api/posts/not-a-uuid",
        "/api/users/not-a-uuid",
        "/api/posts/not-a-uuid/comments",
    ] {
        let (status, body) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["status_code"], 422);
    }
}

#[tokio::test]
async fn only_author_deletes_post() {
    let app = test_app();
    let (_, alice) = app.signup("a@example.com").await;
    let (_, bob) = app.signup("b@example.com").await;
    let post_id = app.create_post(&alice, "mine").await;

    let uri = format!("/api/posts/{post_id}");
    let (status, body) = app.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not authorized to delete this post");

    let (status, _) = app.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_lifecycle() {
    let app = test_app();
    let (_, alice) = app.signup("a@example.com").await;
    let (_, bob) = app.signup("b@example.com").await;
    let (_, carol) = app.signup("c@example.com").await;
    let post_id = app.create_post(&alice, "discuss").await;

    let comments_uri = format!("/api/posts/{post_id}/comments");
    let (status, created) = app
        .post(&comments_uri, Some(&bob), json!({ "content": "first!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["content"], "first!");
    assert_eq!(created["data"]["can_delete"], true);
    let comment_id = created["data"]["id"].as_str().unwrap().to_string();

    let (_, listing) = app.get(&comments_uri, Some(&alice)).await;
    assert_eq!(listing["data"]["total"], 1);
    assert_eq!(listing["data"]["has_next"], false);
    assert_eq!(listing["data"]["comments"][0]["can_delete"], true);

    let (_, post) = app.get(&format!("/api/posts/{post_id}"), None).await;
    assert_eq!(post["data"]["comment_count"], 1);

    let delete_uri = format!("/api/comments/{comment_id}");
    let (status, _) = app.delete(&delete_uri, &carol).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&delete_uri, &alice).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.delete(&delete_uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment not found");

    let (_, post) = app.get(&format!("/api/posts/{post_id}"), None).await;
    assert_eq!(post["data"]["comment_count"], 0);
}

#[tokio::test]
async fn exactly_twenty_posts_reports_has_next() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;
    for i in 0..20 {
        app.create_post(&token, &format!("post {i}")).await;
    }

    let (_, first) = app.get("/api/posts?page=1&limit=20", None).await;
    assert_eq!(first["data"]["items"].as_array().unwrap().len(), 20);
    assert_eq!(first["data"]["has_next"], true);

    let (_, second) = app.get("/api/posts?page=2&limit=20", None).await;
    assert!(second["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(second["data"]["has_next"], false);
}

#[tokio::test]
async fn following_only_feed_and_user_posts() {
    let app = test_app();
    let (alice_id, alice) = app.signup("a@example.com").await;
    let (bob_id, bob) = app.signup("b@example.com").await;
    let (_, carol) = app.signup("c@example.com").await;
    app.create_post(&alice, "from alice").await;
    app.create_post(&bob, "from bob").await;
    app.create_post(&carol, "from carol").await;

    app.post(&format!("/api/users/{bob_id}/follow"), Some(&alice), json!({}))
        .await;

    let (_, feed) = app.get("/api/posts?following_only=true", Some(&alice)).await;
    let items = feed["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items
        .iter()
        .all(|p| p["user"]["id"] == alice_id.as_str() || p["user"]["id"] == bob_id.as_str()));

    let (_, all) = app.get("/api/posts", Some(&alice)).await;
    assert_eq!(all["data"]["items"].as_array().unwrap().len(), 3);

    let (_, bobs) = app
        .get(&format!("/api/posts/user/{bob_id}"), Some(&alice))
        .await;
    let items = bobs["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["user"]["is_following"], false);
}

#[tokio::test]
async fn self_follow_is_rejected() {
    let app = test_app();
    let (id, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .post(&format!("/api/users/{id}/follow"), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Cannot follow yourself");
}

#[tokio::test]
async fn profile_update_and_search() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({
                "first_name": "Meera",
                "last_name": "Iyer",
                "bio": "Poet",
                "languages": ["Hindi", "English"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["first_name"], "Meera");

    let (_, own) = app.get("/api/users/profile", Some(&token)).await;
    assert_eq!(own["data"]["bio"], "Poet");
    assert_eq!(own["data"]["languages"], json!(["Hindi", "English"]));

    let (_, found) = app.get("/api/users/search?q=meer", None).await;
    assert_eq!(found["data"]["items"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/users/search?q=", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/users/password",
            Some(&token),
            Some(json!({ "current_password": "Wrong1234", "new_password": "NewPass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/users/password",
            Some(&token),
            Some(json!({ "current_password": PASSWORD, "new_password": "NewPass123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "a@example.com", "password": "NewPass123" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn image_upload_is_served_back() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .upload("/api/posts/upload-image", &token, "image/png", b"\x89PNG-data")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["data"]["image_url"].as_str().unwrap();
    let path = url.strip_prefix(BASE_URL).unwrap();
    assert!(path.starts_with("/media/posts/"));

    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG-data");

    let (status, avatar) = app
        .upload("/api/users/upload-avatar", &token, "image/jpeg", b"jpeg")
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, me) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me["data"]["profile_picture"], avatar["data"]["profile_picture"]);
}

#[tokio::test]
async fn upload_rejects_unsupported_type() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .upload("/api/posts/upload-image", &token, "image/gif", b"GIF89a")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "file");
}

#[tokio::test]
async fn disabled_media_is_service_unavailable() {
    let app = build_app(false);
    let (_, token) = app.signup("a@example.com").await;

    let (status, body) = app
        .upload("/api/posts/upload-image", &token, "image/png", b"png")
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status_code"], 503);
}

#[tokio::test]
async fn media_path_traversal_is_not_found() {
    let app = test_app();
    let (status, _) = app.get("/media/../test.db", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn media_directory_is_not_found() {
    let app = test_app();
    let (_, token) = app.signup("a@example.com").await;
    let (status, _) = app
        .upload("/api/posts/upload-image", &token, "image/png", b"png")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/media/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
