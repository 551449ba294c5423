//! End-to-end tests over the full router with an in-memory store: register →
//! verify → login → listing CRUD, plus the authorization edges.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use quadlist_api::session::SessionStore;
use quadlist_api::{AppStateInner, router};
use quadlist_db::Database;

fn test_app(require_verification: bool) -> Router {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        sessions: SessionStore::new(),
        email_domain: "asu.edu".to_string(),
        require_verification,
    });
    router(state)
}

/// Fire one request; returns (status, session cookie if set, parsed body).
async fn send(
    app: &Router,
    method: Method,
    path: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(';').next().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, set_cookie, body)
}

/// Register and verify a user, returning the session cookie from the
/// verification response.
async fn register_and_verify(app: &Router, email: &str, first: &str, last: &str) -> String {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "email": email,
            "password": "pw123456",
            "firstName": first,
            "lastName": last,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["verificationCode"].as_str().unwrap().to_string();

    let (status, cookie, _) = send(
        app,
        Method::POST,
        "/api/verify-email",
        None,
        Some(json!({ "email": email, "verificationCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie.unwrap()
}

#[tokio::test]
async fn register_verify_login_create_and_browse() {
    let app = test_app(true);

    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "email": "alice@asu.edu",
            "password": "pw123456",
            "firstName": "Alice",
            "lastName": "Anderson",
            "major": "Design",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(cookie.is_none()); // no session before verification
    let code = body["verificationCode"].as_str().unwrap().to_string();

    // login is gated until the email is verified
    let login = json!({ "email": "alice@asu.edu", "password": "pw123456" });
    let (status, _, body) = send(&app, Method::POST, "/api/login", None, Some(login.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Please verify your email before logging in"));

    // a wrong code is rejected without leaking anything
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/verify-email",
        None,
        Some(json!({ "email": "alice@asu.edu", "verificationCode": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid verification code"));

    // the right code verifies and logs the user in
    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/verify-email",
        None,
        Some(json!({ "email": "alice@asu.edu", "verificationCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], json!("alice@asu.edu"));
    let session = cookie.expect("verification issues a session");

    // replaying the consumed code fails exactly like an unknown one
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/verify-email",
        None,
        Some(json!({ "email": "alice@asu.edu", "verificationCode": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid verification code"));

    // a normal login also works now
    let (status, _, body) = send(&app, Method::POST, "/api/login", None, Some(login)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["firstName"], json!("Alice"));

    // create a listing and find it on the public feed
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/listings",
        Some(&session),
        Some(json!({
            "title": "Desk",
            "description": "Sturdy oak desk",
            "category": "Furniture",
            "price": 50,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, _, body) = send(&app, Method::GET, "/api/listings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let feed = body.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["title"], json!("Desk"));
    assert_eq!(feed[0]["price"], json!(50.0));
    assert_eq!(feed[0]["images"], json!([]));
    assert_eq!(feed[0]["first_name"], json!("Alice"));
    assert_eq!(feed[0]["last_name"], json!("Anderson"));

    // logout invalidates the session
    let (status, _, _) = send(&app, Method::POST, "/api/logout", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, Method::GET, "/api/listings/my", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rejects_foreign_domains_and_duplicates() {
    let app = test_app(true);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "email": "bob@gmail.com",
            "password": "pw123456",
            "firstName": "Bob",
            "lastName": "Brown",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("@asu.edu"));

    let carol = json!({
        "email": "carol@asu.edu",
        "password": "pw123456",
        "firstName": "Carol",
        "lastName": "Chen",
    });
    let (status, _, _) = send(&app, Method::POST, "/api/register", None, Some(carol.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, Method::POST, "/api/register", None, Some(carol)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("User already exists with this email"));

    // bad credentials always get the same generic answer
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "nobody@asu.edu", "password": "pw123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid email or password"));
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "carol@asu.edu", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid email or password"));
}

#[tokio::test]
async fn mutating_someone_elses_listing_is_a_404() {
    let app = test_app(true);
    let owner = register_and_verify(&app, "owner@asu.edu", "Olive", "Owens").await;
    let intruder = register_and_verify(&app, "intruder@asu.edu", "Ivan", "Reyes").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/listings",
        Some(&owner),
        Some(json!({
            "title": "Bike",
            "description": "Road bike, lightly used",
            "category": "Miscellaneous",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listing_id = body["listingId"].as_i64().unwrap();

    let update = json!({
        "title": "Hijacked",
        "description": "x",
        "category": "Miscellaneous",
        "price": 1,
    });
    let path = format!("/api/listings/{}", listing_id);
    let (status, _, _) =
        send(&app, Method::PUT, &path, Some(&intruder), Some(update)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status_path = format!("/api/listings/{}/status", listing_id);
    let (status, _, _) = send(
        &app,
        Method::PUT,
        &status_path,
        Some(&intruder),
        Some(json!({ "status": "sold" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, Method::DELETE, &path, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the listing is untouched and still the owner's
    let (status, _, body) = send(&app, Method::GET, "/api/listings/my", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let mine = body.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["title"], json!("Bike"));
    assert_eq!(mine[0]["status"], json!("active"));
}

#[tokio::test]
async fn session_gated_routes_reject_anonymous_callers() {
    let app = test_app(true);

    for (method, path) in [
        (Method::GET, "/api/listings/my"),
        (Method::GET, "/api/profile"),
        (Method::DELETE, "/api/listings/1"),
    ] {
        let (status, _, _) = send(&app, method, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "expected 401 for {}", path);
    }

    // a made-up token is as good as none
    let (status, _, _) = send(
        &app,
        Method::GET,
        "/api/profile",
        Some("quadlist_session=deadbeef"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the public feed stays open
    let (status, _, _) = send(&app, Method::GET, "/api/listings", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn auth_check_reflects_session_state() {
    let app = test_app(true);

    let (status, _, body) = send(&app, Method::GET, "/api/auth/check", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "authenticated": false }));

    let session = register_and_verify(&app, "dana@asu.edu", "Dana", "Diaz").await;
    let (status, _, body) = send(&app, Method::GET, "/api/auth/check", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["userEmail"], json!("dana@asu.edu"));
    assert!(body["userId"].as_i64().is_some());
}

#[tokio::test]
async fn invalid_category_and_price_are_rejected() {
    let app = test_app(true);
    let session = register_and_verify(&app, "erin@asu.edu", "Erin", "Ellis").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/listings",
        Some(&session),
        Some(json!({
            "title": "Mystery",
            "description": "x",
            "category": "Vehicles",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid category"));

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/listings",
        Some(&session),
        Some(json!({
            "title": "Freebie",
            "description": "x",
            "category": "Services",
            "price": -5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn simplified_mode_logs_in_at_registration() {
    let app = test_app(false);

    let (status, cookie, body) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "email": "fred@asu.edu",
            "password": "pw123456",
            "firstName": "Fred",
            "lastName": "Fox",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["verificationCode"].is_null());
    let session = cookie.expect("simplified mode starts a session immediately");

    // usable right away, no verification step
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/listings",
        Some(&session),
        Some(json!({
            "title": "Headphones",
            "description": "Noise cancelling",
            "category": "Technology",
            "price": 60,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // and login does not demand a verified email
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "fred@asu.edu", "password": "pw123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn filters_compose_conjunctively_over_the_feed() {
    let app = test_app(true);
    let session = register_and_verify(&app, "gail@asu.edu", "Gail", "Gomez").await;

    for (title, category, price) in [
        ("MacBook Pro", "Technology", Some(800.0)),
        ("Mac OS X Handbook", "Books", Some(15.0)),
        ("Calculus Textbook", "Books", Some(120.0)),
    ] {
        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/listings",
            Some(&session),
            Some(json!({
                "title": title,
                "description": "as described",
                "category": category,
                "price": price,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/api/listings?category=Books&search=Mac",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], json!("Mac OS X Handbook"));

    // unknown sort values fall back to the default feed order
    let (status, _, body) =
        send(&app, Method::GET, "/api/listings?sort=bogus", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _, body) =
        send(&app, Method::GET, "/api/listings?sort=price_asc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let prices: Vec<f64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![15.0, 120.0, 800.0]);
}

#[tokio::test]
async fn profile_roundtrip_replaces_the_whole_record() {
    let app = test_app(true);
    let session = register_and_verify(&app, "hana@asu.edu", "Hana", "Hill").await;

    let (status, _, body) = send(&app, Method::GET, "/api/profile", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("hana@asu.edu"));
    assert_eq!(body["first_name"], json!("Hana"));
    // the password hash never leaves the server
    assert!(body.get("password").is_none());

    let (status, _, _) = send(
        &app,
        Method::PUT,
        "/api/profile",
        Some(&session),
        Some(json!({
            "firstName": "Hana",
            "lastName": "Hill",
            "bio": "Senior, selling everything before graduation",
            "notifications": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, Method::GET, "/api/profile", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], json!("Senior, selling everything before graduation"));
    // absent optional fields were overwritten, not kept
    assert_eq!(body["phone"], Value::Null);
    assert_eq!(body["messages"], json!(false));
    assert_eq!(body["notifications"], json!(true));
}
