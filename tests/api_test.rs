//! Router-level tests: requests go through extractors, handlers and error
//! rendering exactly as they would over HTTP.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::*;
use gigit::api::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, email: &str, body: Value) -> String {
    let mut payload = json!({ "email": email, "password": TEST_PASSWORD });
    if let (Some(target), Some(extra)) = (payload.as_object_mut(), body.as_object()) {
        target.extend(extra.clone());
    }
    let (status, response) = call(app, Method::POST, "/api/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", response);
    response["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());

    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], false);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());

    let (status, body) = call(&app, Method::GET, "/api/notifications/count", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, body) = call(&app, Method::GET, "/api/workers/profile", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_register_login_and_welcome_email() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());

    let body = json!({ "userType": "WORKER", "firstName": "Ada", "lastName": "Lovelace" });
    register(&app, "ada@example.com", body).await;

    let sent = test.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["userType"], "WORKER");
    assert!(body["user"].get("passwordHash").is_none());
    let token = body["token"].as_str().unwrap();

    let (status, profile) = call(&app, Method::GET, "/api/workers/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["firstName"], "Ada");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_password_reset_answers_uniformly() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());
    register(&app, "ada@example.com", json!({ "userType": "WORKER" })).await;

    let (status, unknown) = call(
        &app,
        Method::POST,
        "/api/auth/password-reset",
        None,
        Some(json!({ "email": "nobody@example.com" })),
    )
    .await;
    let (_, known) = call(
        &app,
        Method::POST,
        "/api/auth/password-reset",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown, known);

    // Welcome plus one reset email.
    let sent = test.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].html.contains("/reset-password?token="));
}

#[tokio::test]
async fn test_job_flow_over_http() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());

    let business = register(&app, "owner@acme.test", json!({ "userType": "BUSINESS", "companyName": "Acme" })).await;
    let worker = register(
        &app,
        "worker@example.com",
        json!({ "userType": "WORKER", "firstName": "Sam", "lastName": "Reyes" }),
    )
    .await;

    let (status, job) = call(
        &app,
        Method::POST,
        "/api/jobs",
        Some(&business),
        Some(json!({
            "title": "Drywall installer",
            "description": "Two week commercial fit-out",
            "jobType": "INDIVIDUAL",
            "paymentType": "DAILY",
            "locationType": "ON_SITE",
            "budgetMin": "180",
            "budgetMax": 220,
            "publish": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", job);
    let job_id = job["id"].as_str().unwrap().to_string();

    // Workers cannot post jobs.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/jobs",
        Some(&worker),
        Some(json!({ "title": "x", "description": "y", "jobType": "BULK", "paymentType": "FIXED", "locationType": "REMOTE" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = call(&app, Method::GET, "/api/jobs?search=drywall&sortBy=budget_high", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["jobs"][0]["business"]["companyName"], "Acme");

    let (status, _) = call(&app, Method::GET, "/api/jobs?sortBy=sideways", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let apply_uri = format!("/api/jobs/{}/apply", job_id);
    let (status, application) = call(
        &app,
        Method::POST,
        &apply_uri,
        Some(&worker),
        Some(json!({ "coverLetter": "Available immediately", "proposedRate": "200" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", application);
    let (status, body) = call(&app, Method::POST, &apply_uri, Some(&worker), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already applied to this job");

    let (_, detail) = call(&app, Method::GET, &format!("/api/jobs/{}", job_id), Some(&worker), None).await;
    assert_eq!(detail["hasApplied"], true);
    let (_, anonymous) = call(&app, Method::GET, &format!("/api/jobs/{}", job_id), None, None).await;
    assert_eq!(anonymous["hasApplied"], false);

    let application_id = application["id"].as_str().unwrap();
    let (status, accepted) = call(
        &app,
        Method::PATCH,
        &format!("/api/business/applications/{}", application_id),
        Some(&business),
        Some(json!({ "status": "ACCEPTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "ACCEPTED");

    let (status, contracts) = call(&app, Method::GET, "/api/workers/contracts?status=ACTIVE", Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contracts["pagination"]["total"], 1);
    assert_eq!(contracts["contracts"][0]["agreedRate"], 200.0);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/jobs/{}", job_id), Some(&business), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, count) = call(&app, Method::GET, "/api/notifications/count", Some(&worker), None).await;
    assert_eq!(count["count"], 1);

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/notifications",
        Some(&worker),
        Some(json!({ "action": "markAllRead" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = call(&app, Method::GET, "/api/notifications/count", Some(&worker), None).await;
    assert_eq!(count["count"], 0);
}

#[tokio::test]
async fn test_upload_without_storage_is_unavailable() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());
    let token = register(&app, "ada@example.com", json!({ "userType": "WORKER" })).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/upload",
        Some(&token),
        Some(json!({ "filename": "cv.pdf", "contentType": "application/pdf", "folder": "resumes" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "File storage is not configured");
}

#[tokio::test]
async fn test_upload_presigns_into_user_folder() {
    let test = test_app(true).await;
    let app = build_router(test.state.clone());
    let token = register(&app, "ada@example.com", json!({ "userType": "WORKER" })).await;

    let (status, ticket) = call(
        &app,
        Method::POST,
        "/api/upload",
        Some(&token),
        Some(json!({ "filename": "my cv (final).pdf", "contentType": "application/pdf", "folder": "resumes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", ticket);
    let key = ticket["key"].as_str().unwrap();
    assert!(key.starts_with("resumes/"));
    assert!(key.ends_with("-my_cv__final_.pdf"));
    assert_eq!(ticket["publicUrl"], format!("{}/{}", FAKE_PUBLIC_URL, key));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/upload",
        Some(&token),
        Some(json!({ "filename": "cv.exe", "contentType": "application/x-msdownload", "folder": "resumes" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid file type"));
}

#[tokio::test]
async fn test_download_presigns_only_own_files() {
    let test = test_app(true).await;
    let app = build_router(test.state.clone());
    let token = register(&app, "ada@example.com", json!({ "userType": "WORKER" })).await;
    let other = register(&app, "bo@example.com", json!({ "userType": "WORKER" })).await;

    let (_, ticket) = call(
        &app,
        Method::POST,
        "/api/upload",
        Some(&token),
        Some(json!({ "filename": "license.pdf", "contentType": "application/pdf", "folder": "licenses" })),
    )
    .await;
    let key = ticket["key"].as_str().unwrap().to_string();
    let uri = format!("/api/upload/download?key={}", key);

    let (status, body) = call(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["key"], key.as_str());
    assert_eq!(body["downloadUrl"], format!("https://bucket.test/{}?sig=fake", key));

    let (status, _) = call(&app, Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/api/upload/download?key=licenses", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bare = test_app(false).await;
    let bare_app = build_router(bare.state.clone());
    let bare_token = register(&bare_app, "ada@example.com", json!({ "userType": "WORKER" })).await;
    let (status, _) = call(&bare_app, Method::GET, &uri, Some(&bare_token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_portfolio_delete_removes_stored_images() {
    let test = test_app(true).await;
    let app = build_router(test.state.clone());
    let token = register(
        &app,
        "worker@example.com",
        json!({ "userType": "WORKER", "firstName": "Sam", "lastName": "Reyes" }),
    )
    .await;

    let stored = format!("{}/portfolios/u1/1-deck.jpg", FAKE_PUBLIC_URL);
    let (status, item) = call(
        &app,
        Method::POST,
        "/api/workers/portfolio",
        Some(&token),
        Some(json!({
            "title": "Deck build",
            "projectDate": "2024-06",
            "images": [stored, "https://elsewhere.test/photo.jpg"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", item);

    let uri = format!("/api/workers/portfolio/{}", item["id"].as_str().unwrap());
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let store = test.store.as_ref().unwrap();
    assert_eq!(*store.deleted.lock().unwrap(), vec!["portfolios/u1/1-deck.jpg".to_string()]);

    let (status, _) = call(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages_over_http() {
    let test = test_app(false).await;
    let app = build_router(test.state.clone());
    let business = register(&app, "owner@acme.test", json!({ "userType": "BUSINESS", "companyName": "Acme" })).await;
    let worker = register(
        &app,
        "worker@example.com",
        json!({ "userType": "WORKER", "firstName": "Sam", "lastName": "Reyes" }),
    )
    .await;

    let (_, profile) = call(&app, Method::GET, "/api/workers/profile", Some(&worker), None).await;
    let worker_profile_id = profile["id"].as_str().unwrap();
    let worker_user_id = profile["userId"].as_str().unwrap();

    // Any signed-in user can view a worker profile.
    let (status, public) = call(&app, Method::GET, &format!("/api/workers/{}", worker_profile_id), Some(&business), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["firstName"], "Sam");

    let (status, sent) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(&business),
        Some(json!({ "receiverId": worker_profile_id, "content": "Can you start Monday?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sent);
    let business_user_id = sent["senderId"].as_str().unwrap();

    let (status, conversations) = call(&app, Method::GET, "/api/messages", Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conversations[0]["unreadCount"], 1);
    assert_eq!(conversations[0]["otherUser"]["id"], business_user_id);

    let (status, thread) = call(&app, Method::GET, &format!("/api/messages/{}", business_user_id), Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["messages"][0]["content"], "Can you start Monday?");
    assert_eq!(thread["otherUser"]["businessProfile"]["companyName"], "Acme");

    let (_, conversations) = call(&app, Method::GET, "/api/messages", Some(&worker), None).await;
    assert_eq!(conversations[0]["unreadCount"], 0);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(&worker),
        Some(json!({ "receiverId": worker_user_id, "content": "note to self" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
