mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use common::{cleanup_user, lazy_pool, register_user, test_pool};
use serde_json::json;

#[actix_rt::test]
async fn test_register_validation_rejects_bad_input() {
    // Every request here fails validation before any store call, so no
    // database is needed.
    let pool = lazy_pool();
    let app = test_app!(pool);

    let cases = [
        json!({"name": "Alice", "email": "not-an-email", "password": "mypassw0rd1"}),
        json!({"name": "Alice", "email": "a@x.com", "password": "short"}),
        json!({"name": "Alice", "email": "a@x.com", "password": "myPASSword1"}),
        json!({"name": "   ", "email": "a@x.com", "password": "mypassw0rd1"}),
        json!({"name": "Alice", "email": "a@x.com", "password": "mypassw0rd1", "age": -3}),
    ];

    for payload in cases {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "payload should be rejected: {}",
            payload
        );

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string(), "expected an error body");
    }
}

#[actix_rt::test]
async fn test_protected_routes_require_token() {
    let pool = lazy_pool();
    let app = test_app!(pool);

    // Missing token
    let req = test::TestRequest::get().uri("/users/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Please authenticate.");

    // Garbage token
    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header((header::AUTHORIZATION, "Bearer not.a.token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme
    let req = test::TestRequest::post()
        .uri("/users/logout")
        .append_header((header::AUTHORIZATION, "Basic abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_register_login_logout_flow() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app!(pool);

    let email = "session_flow@example.com";
    cleanup_user(&pool, email).await;

    // Register
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(&json!({
            "name": "Alice",
            "email": email,
            "password": "mypassw0rd1"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let first_token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["age"], 0);
    // The stored hash and the session list never leave the server.
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("tokens").is_none());
    assert!(body["user"].get("avatar").is_none());

    // The submitted plaintext is not what got stored.
    let (stored_password,): (String,) =
        sqlx::query_as("SELECT password FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_ne!(stored_password, "mypassw0rd1");

    // Login opens a second, independent session
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(&json!({"email": email, "password": "mypassw0rd1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let second_token = body["token"].as_str().unwrap().to_string();

    // Both sessions see the profile
    for token in [&first_token, &second_token] {
        let req = test::TestRequest::get()
            .uri("/users/me")
            .append_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Logout revokes only the presented token
    let req = test::TestRequest::post()
        .uri("/users/logout")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", first_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", first_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", second_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // logoutAll revokes the rest
    let req = test::TestRequest::post()
        .uri("/users/logoutAll")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", second_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", second_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_login_failure_is_uniform() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app!(pool);

    let email = "uniform_login@example.com";
    cleanup_user(&pool, email).await;
    register_user(&app, "Alice", email, "mypassw0rd1").await;

    // Wrong password
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(&json!({"email": email, "password": "wrong_secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let wrong_password_status = resp.status();
    let wrong_password_body: serde_json::Value = test::read_body_json(resp).await;

    // Nonexistent account
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(&json!({"email": "nobody@example.com", "password": "mypassw0rd1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let unknown_email_status = resp.status();
    let unknown_email_body: serde_json::Value = test::read_body_json(resp).await;

    assert_eq!(wrong_password_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password_status, unknown_email_status);
    assert_eq!(wrong_password_body, unknown_email_body);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_update_profile() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app!(pool);

    let email = "update_me@example.com";
    cleanup_user(&pool, email).await;
    let user = register_user(&app, "Alice", email, "mypassw0rd1").await;
    let auth = (header::AUTHORIZATION, format!("Bearer {}", user.token));

    // Whitelisted fields apply
    let req = test::TestRequest::patch()
        .uri("/users/me")
        .append_header(auth.clone())
        .set_json(&json!({"name": "Alicia", "age": 31}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Alicia");
    assert_eq!(body["age"], 31);
    assert!(body.get("password").is_none());

    // Any unknown field rejects the whole request
    let req = test::TestRequest::patch()
        .uri("/users/me")
        .append_header(auth.clone())
        .set_json(&json!({"name": "Mallory", "tokens": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Alicia", "rejected update must not apply");

    // Password changes take effect on the next login
    let req = test::TestRequest::patch()
        .uri("/users/me")
        .append_header(auth)
        .set_json(&json!({"password": "an0ther-secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(&json!({"email": email, "password": "an0ther-secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_delete_account_cascades_to_tasks() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app!(pool);

    let email = "delete_me@example.com";
    cleanup_user(&pool, email).await;
    let user = register_user(&app, "Alice", email, "mypassw0rd1").await;
    let auth = (header::AUTHORIZATION, format!("Bearer {}", user.token));

    for description in ["buy milk", "walk dog"] {
        let req = test::TestRequest::post()
            .uri("/tasks")
            .append_header(auth.clone())
            .set_json(&json!({"description": description}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::delete()
        .uri("/users/me")
        .append_header(auth)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], email);
    assert!(body.get("password").is_none());

    // No task may still reference the deleted owner
    let (remaining,): (i64,) = sqlx::query_as("SELECT count(*) FROM tasks WHERE owner = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    // The account is gone
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(&json!({"email": email, "password": "mypassw0rd1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn multipart_body(boundary: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        image::Rgb([10, 140, 90]),
    ));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Jpeg(80))
        .unwrap();
    out.into_inner()
}

#[actix_rt::test]
async fn test_avatar_upload_and_fetch() {
    let Some(pool) = test_pool().await else { return };
    let app = test_app!(pool);

    let email = "avatar_user@example.com";
    cleanup_user(&pool, email).await;
    let user = register_user(&app, "Alice", email, "mypassw0rd1").await;
    let auth = (header::AUTHORIZATION, format!("Bearer {}", user.token));
    let boundary = "------------------------taskkeeper-test";

    // Disallowed extension is rejected with a structured error
    let body = multipart_body(boundary, "photo.gif", "image/gif", b"GIF89a");
    let req = test::TestRequest::post()
        .uri("/users/me/avatar")
        .append_header(auth.clone())
        .append_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: serde_json::Value = test::read_body_json(resp).await;
    assert!(error["error"].as_str().unwrap().contains("image"));

    // A large JPEG is accepted and stored as a 250x250 PNG
    let body = multipart_body(
        boundary,
        "photo.jpg",
        "image/jpeg",
        &jpeg_fixture(2000, 2000),
    );
    let req = test::TestRequest::post()
        .uri("/users/me/avatar")
        .append_header(auth.clone())
        .append_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // Fetching is public
    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", user.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let png = test::read_body(resp).await;
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (250, 250));

    // Deleting clears it
    let req = test::TestRequest::delete()
        .uri("/users/me/avatar")
        .append_header(auth)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", user.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    cleanup_user(&pool, email).await;
}
