mod common;

use axum::http::StatusCode;
use common::{body_text, session_cookie, TestApp, USER_ACCESS, USER_REFRESH};

#[tokio::test]
async fn index_lists_chapters_in_requested_language() {
    let app = TestApp::new();

    let english = body_text(app.get("/", None).await).await;
    let russian = body_text(app.get("/?lang=ru", None).await).await;

    assert!(english.contains("Globalisation"));
    assert!(english.contains("2 cases"));
    assert!(english.contains("Sign in"));
    assert!(russian.contains("Глобализация"));
}

#[tokio::test]
async fn index_shows_signed_in_caller() {
    let app = TestApp::new();

    let body = body_text(
        app.get("/", Some(&session_cookie(USER_ACCESS, USER_REFRESH)))
            .await,
    )
    .await;

    assert!(body.contains("user@example.com"));
    assert!(body.contains("Sign out"));
}

#[tokio::test]
async fn chapter_page_shows_cases_with_audio_fallback() {
    let app = TestApp::new();

    let response = app
        .get("/chapter/globalisation?voice=female", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("TruckLabs"));
    assert!(body.contains("trucklabs-male.mp3"));
    assert!(body.contains("No audio available."));
}

#[tokio::test]
async fn unknown_chapter_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/chapter/nope", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("nope"));
}
