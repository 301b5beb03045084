//! End-to-end tests for authentication endpoints
//!
//! Tests registration, login, logout and session requirements.

mod common;

use common::{ServerOptions, TestClient, TestServer, TEST_PASS, TEST_USER};
use reqwest::{header, StatusCode};
use std::time::Duration;

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("No session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["msg"], "Login successful");
    assert_eq!(body["token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(TEST_USER, "wrong_password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InvalidCredentials");
}

#[tokio::test]
async fn test_login_with_nonexistent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login("nonexistent_user", "password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_malformed_body() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/api/token", server.base_url))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{\"username\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_then_login() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register("newuser", "newpass").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "newuser");
    assert_eq!(body["msg"], "User created");

    let response = client.login("newuser", "newpass").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.get_dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"], "newuser");
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register(TEST_USER, "whatever").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The original password still works
    let response = client.login(TEST_USER, TEST_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_with_empty_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register("", "password").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.register("someone", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_when_disabled() {
    let server = TestServer::spawn_with(ServerOptions {
        allow_registration: false,
        ..ServerOptions::default()
    })
    .await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.register("newuser", "newpass").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.login("newuser", "newpass").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.logout().await;
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/static/login.html"
    );

    let response = client.get_dashboard().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token_for_header_clients() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let body: serde_json::Value = client
        .login(TEST_USER, TEST_PASS)
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // Logging out through the cookie deletes the same token
    client.logout().await;

    let header_client = TestClient::new(server.base_url.clone());
    let response = header_client
        .client
        .get(format!("{}/api/dashboard", server.base_url))
        .header(header::AUTHORIZATION, &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_still_redirects() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.logout().await;
    assert!(response.status().is_redirection());
}

#[tokio::test]
async fn test_authorization_header_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let body: serde_json::Value = client
        .login(TEST_USER, TEST_PASS)
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let header_client = TestClient::new(server.base_url.clone());
    for value in [token.clone(), format!("Bearer {}", token)] {
        let response = header_client
            .client
            .get(format!("{}/api/dashboard", server.base_url))
            .header(header::AUTHORIZATION, value)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let server = TestServer::spawn_with(ServerOptions {
        session_ttl: Duration::from_secs(1),
        ..ServerOptions::default()
    })
    .await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_dashboard().await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = client.get_dashboard().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_endpoints_require_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(
        client.get_dashboard().await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(client.get_reports().await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        client.run_report("tablespace").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client
            .download_report("tablespace_report.html")
            .await
            .status(),
        StatusCode::UNAUTHORIZED
    );

    let response = client.get_dashboard().await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .get(format!("{}/api/dashboard", server.base_url))
        .header(header::COOKIE, "session_token=not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
