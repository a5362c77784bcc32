//! Router behaviour against an in-process stub of the directory API, without a database

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tiue_api::{router, AppState};
use tiue_core::config::{AppConfig, DirectoryConfig};
use tiue_directory::DirectoryClient;
use tower::ServiceExt;

type Hits = Arc<AtomicUsize>;

async fn login(State(hits): State<Hits>, Json(body): Json<Value>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    if body["username"] == "u22312" && body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({ "access_token": "acc-1", "refresh_token": "ref-1" })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid credentials" })),
        )
    }
}

async fn refresh(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "access_token": "acc-2", "refresh_token": "ref-2" }))
}

async fn profile(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "full_name": "MATYOKUBOV UMAR", "email": "u22312@tiue.uz" }))
}

async fn courses(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "echo": params }))
}

async fn grades(State(hits): State<Hits>) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::FORBIDDEN, Json(json!({ "detail": "Token expired" })))
}

async fn students(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        { "display_name": "SABINA SULAYMONOVA", "uid": "u1", "department": "BM_01 EN Year1" },
        { "display_name": "MADINA", "uid": "u2", "department": "BM_24" },
        { "display_name": "ALI VALIEV", "uid": "u3", "department": "BM_01 EN Year1" },
    ]))
}

async fn spawn_stub(hits: Hits) -> String {
    let app = Router::new()
        .route("/mobile/login", post(login))
        .route("/mobile/refresh", post(refresh))
        .route("/mobile/data-student-profile", post(profile))
        .route("/mobile/active-course-list", get(courses))
        .route("/mobile/course-grades-list", get(grades))
        .route("/mobile/students", get(students))
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct TestApp {
    app: Router,
    hits: Hits,
    base_url: String,
}

async fn test_app() -> TestApp {
    let hits = Hits::default();
    let base_url = spawn_stub(hits.clone()).await;

    let config = AppConfig {
        directory: DirectoryConfig {
            base_url: base_url.clone(),
            timeout_seconds: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let directory = DirectoryClient::new(config.directory.clone()).unwrap();
    let app = router().with_state(AppState::new(config, directory, None));

    TestApp {
        app,
        hits,
        base_url,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_missing_bearer_is_rejected_before_upstream() {
    let t = test_app().await;

    for uri in [
        "/api/auth/me",
        "/api/auth/courses",
        "/api/auth/grades",
        "/api/auth/attendance",
        "/api/auth/search/students?q=ali",
    ] {
        let (status, body) = send(&t.app, get_request(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Bearer token required");
    }

    assert_eq!(t.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_check_with_and_without_trailing_slash() {
    let t = test_app().await;

    for uri in ["/api/auth/test", "/api/auth/test/"] {
        let (status, body) = send(&t.app, get_request(uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn test_login_without_database_returns_tokens_and_profile() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        post_json("/api/auth/login", json!({ "username": "u22312", "password": "secret" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["access_token"], "acc-1");
    assert_eq!(body["data"]["refresh_token"], "ref-1");
    assert_eq!(body["data"]["user"]["full_name"], "MATYOKUBOV UMAR");
}

#[tokio::test]
async fn test_login_rejection_is_unauthorized() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        post_json("/api/auth/login", json!({ "username": "u22312", "password": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_body_problems_are_bad_requests() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        post_json("/api/auth/login", json!({ "username": "", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "username can't be blank");

    let (status, body) = send(&t.app, post_json("/api/auth/login", json!({ "username": "a" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    assert_eq!(t.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refresh_requires_token() {
    let t = test_app().await;

    let (status, _) = send(&t.app, post_json("/api/auth/refresh", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        post_json("/api/auth/refresh/", json!({ "refresh_token": "ref-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["access_token"], "acc-2");
}

#[tokio::test]
async fn test_courses_forward_paging() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        get_request("/api/auth/courses?page=2&pageSize=10", Some("acc-1")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["echo"]["skip"], "10");
    assert_eq!(body["data"]["echo"]["lang"], "en");
}

#[tokio::test]
async fn test_upstream_forbidden_maps_to_unauthorized() {
    let t = test_app().await;

    let (status, body) = send(&t.app, get_request("/api/auth/grades", Some("old"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn test_student_search_filters_by_exact_group() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        get_request(
            "/api/auth/search/students?group=BM_01%20EN%20Year1",
            Some("acc-1"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let students = body["data"].as_array().unwrap();
    assert_eq!(students.len(), 2);
    for student in students {
        assert_eq!(student["department"], "BM_01 EN Year1");
        assert_eq!(student["course_year"], 1);
    }
    assert_eq!(students[0]["first_name"], "Sabina");
    assert_eq!(
        students[0]["avatar"],
        format!("{}/mobile/img/u1", t.base_url)
    );
}

#[tokio::test]
async fn test_student_search_needs_query_or_group() {
    let t = test_app().await;

    let (status, body) = send(
        &t.app,
        get_request("/api/auth/search/students?limit=5", Some("acc-1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &t.app,
        get_request("/api/auth/search/students?q=ali&limit=0", Some("acc-1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_without_image_field() {
    let t = test_app().await;

    let boundary = "XBOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/upload")
        .header(header::AUTHORIZATION, "Bearer acc-1")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn test_local_resources_unavailable_without_database() {
    let t = test_app().await;

    for uri in ["/api/news", "/api/events/", "/api/news/1"] {
        let (status, body) = send(&t.app, get_request(uri, None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["success"], false);
    }

    let (status, _) = send(&t.app, get_request("/api/users/dashboard", Some("acc-1"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&t.app, get_request("/api/groups", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_database() {
    let t = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::AUTHORIZATION, "Bearer acc-1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Logged out");
}
