//! Login, registration, session restore and 401 handling.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use lending_client::api::{ApiError, Upload};
use lending_client::validation::{LoginForm, ProfileForm, RegisterForm};
use lending_client::{AppError, QueryKey, Route};
use lending_core::UserRole;
use lending_integration_tests::{
    TEST_TOKEN, TestContext, cart_json, profile_json, user, user_json,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn login_form() -> LoginForm {
    LoginForm {
        email: "reader1@example.org".to_string(),
        password: "correct horse".to_string(),
    }
}

#[tokio::test]
async fn test_login_persists_token_and_authenticates_requests() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "reader1@example.org",
            "password": "correct horse"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-123",
            "user": user_json(1, UserRole::User)
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(&[])))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let user = ctx.app.login(&login_form()).await.unwrap();
    assert_eq!(user.name, "Reader 1");
    assert!(ctx.app.store().is_authenticated().await);
    assert_eq!(Route::home(&ctx.app.snapshot().await), Route::Books);

    let stored = ctx.session_file().load().await.unwrap().unwrap();
    assert_eq!(stored.expose_secret(), "tok-123");

    ctx.app.cart().await.unwrap();
}

#[tokio::test]
async fn test_login_rejection_shows_server_message() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&ctx.server)
        .await;

    let err = ctx.app.login(&login_form()).await.unwrap_err();
    assert!(matches!(&err, AppError::LoginFailed(m) if m == "Invalid credentials"));
    assert!(!ctx.app.store().is_authenticated().await);
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx.app.login(&login_form()).await.unwrap_err();
    assert!(matches!(err, AppError::LoginFailed(_)));
    assert!(!err.requires_login());

    assert!(ctx.app.store().is_authenticated().await);
    let stored = ctx.session_file().load().await.unwrap().unwrap();
    assert_eq!(stored.expose_secret(), TEST_TOKEN);
}

#[tokio::test]
async fn test_late_rejection_of_replaced_token_keeps_new_session() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "name": "Poetry" }])),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "jwt expired" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.categories().await.unwrap();

    // The user signs in again while the old token's request is in flight
    let (cart, ()) = tokio::join!(ctx.app.cart(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.app
            .store()
            .sign_in(SecretString::from("fresh-token"), user(2, UserRole::Admin))
            .await;
    });

    let err = cart.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::Unauthorized(_))));
    assert!(!err.requires_login());

    let token = ctx.app.store().token().await.unwrap();
    assert_eq!(token.expose_secret(), "fresh-token");
    assert!(ctx.app.store().is_admin().await);
    let stored = ctx.session_file().load().await.unwrap().unwrap();
    assert_eq!(stored.expose_secret(), "fresh-token");
    assert!(ctx.app.cache().contains(&QueryKey::Categories));
}

#[tokio::test]
async fn test_invalid_login_form_sends_nothing() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let form = LoginForm {
        email: "not-an-email".to_string(),
        password: String::new(),
    };
    let AppError::Validation(errors) = ctx.app.login(&form).await.unwrap_err() else {
        panic!("expected validation errors");
    };
    assert!(errors.get("email").is_some());
    assert!(errors.get("password").is_some());
}

#[tokio::test]
async fn test_register_signs_in() {
    let ctx = TestContext::new().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "tok-new",
            "user": user_json(5, UserRole::User)
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let form = RegisterForm {
        name: "Reader 5".to_string(),
        email: "reader5@example.org".to_string(),
        password: "long enough".to_string(),
        phone: None,
    };
    let user = ctx.app.register(&form).await.unwrap();
    assert_eq!(user.id.as_i32(), 5);
    assert!(ctx.app.store().is_authenticated().await);
}

#[tokio::test]
async fn test_unauthorized_response_clears_session_and_cache() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 2, "name": "Poetry" }])),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.app.categories().await.unwrap();
    assert!(ctx.app.cache().contains(&QueryKey::Categories));

    let err = ctx.app.cart().await.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::SessionExpired(_))));
    assert!(err.requires_login());
    assert!(!ctx.app.store().is_authenticated().await);
    assert!(!ctx.app.cache().contains(&QueryKey::Categories));
    assert!(ctx.session_file().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_session_loads_user() {
    let ctx = TestContext::signed_in(UserRole::Admin).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(1, UserRole::Admin)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let app = ctx.relaunch();
    assert!(!app.store().is_authenticated().await);

    let user = app.restore_session().await.unwrap().unwrap();
    assert_eq!(user.role, UserRole::Admin);
    assert!(app.store().is_admin().await);
}

#[tokio::test]
async fn test_restore_session_with_expired_token() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&ctx.server)
        .await;

    let app = ctx.relaunch();
    assert!(app.restore_session().await.unwrap().is_none());
    assert!(!app.store().is_authenticated().await);
    assert!(ctx.session_file().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_without_session_file() {
    let ctx = TestContext::new().await;
    assert!(ctx.app.restore_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_forgets_session() {
    let ctx = TestContext::signed_in(UserRole::User).await;
    assert!(ctx.session_file().load().await.unwrap().is_some());

    ctx.app.logout().await;

    assert!(!ctx.app.store().is_authenticated().await);
    assert!(ctx.session_file().load().await.unwrap().is_none());
    assert!(matches!(ctx.app.cart().await, Err(AppError::NotSignedIn)));
}

#[tokio::test]
async fn test_profile_update_sends_multipart_and_reloads() {
    let ctx = TestContext::signed_in(UserRole::User).await;

    Mock::given(method("PATCH"))
        .and(path("/me"))
        .and(body_string_contains("name=\"name\""))
        .and(body_string_contains("Ada Lovelace"))
        .and(body_string_contains("name=\"phone\""))
        .and(body_string_contains("name=\"profilePhoto\""))
        .and(body_string_contains("filename=\"me.png\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Profile updated" })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut profile = profile_json(1, UserRole::User);
            profile["name"] = json!("Ada Lovelace");
            profile["phone"] = json!("+44 20 7946 0000");
            profile
        }))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let form = ProfileForm {
        name: "Ada Lovelace".to_string(),
        phone: Some("+44 20 7946 0000".to_string()),
        profile_photo: Some(Upload {
            file_name: "me.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: b"not really a png".to_vec(),
        }),
    };
    let updated = ctx.app.update_profile(&form).await.unwrap();
    assert!(updated.invalidation.contains(lending_client::ResourceTag::Profile));

    let profile = updated.into_inner();
    assert_eq!(profile.user.name, "Ada Lovelace");
    assert_eq!(profile.loan_stats.total, 4);
    let stored = ctx.app.store().current_user().await.unwrap();
    assert_eq!(stored.name, "Ada Lovelace");
    assert!(ctx.app.cache().contains(&QueryKey::Profile));
}
