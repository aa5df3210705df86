mod common;

use audio_browser::services::file_store::RemoteEntry;
use axum::http::{header, StatusCode};
use common::{body_string, session_cookie, TestApp, VOX_ID};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn first_visit_selects_first_folder() {
    let app = TestApp::new();

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains("Sample Library"));
    assert!(html.contains(r#"<option value="Drums" selected>"#));
    assert!(html.contains("kick.wav"));
    assert!(html.contains("Snare.WAVE"));
    assert!(!html.contains("notes.txt"));
    assert!(html.contains("2 matching file(s)"));
}

#[tokio::test]
async fn audio_elements_discourage_download() {
    let app = TestApp::new();

    let html = body_string(app.get("/", None).await).await;

    assert!(html.contains(r#"controlsList="nodownload noplaybackrate""#));
    assert!(html.contains(r#"oncontextmenu="return false""#));
    assert!(html.contains(r#"preload="none""#));
    assert!(html.contains(r#"src="/audio/kick""#));
}

#[tokio::test]
async fn selected_folder_persists_in_session() {
    let app = TestApp::new();

    let response = app.post_form("/browse/folder", "name=Vox", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = session_cookie(&response).expect("session cookie");

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains(r#"<option value="Vox" selected>"#));
    assert!(html.contains("25 matching file(s)"));
    assert!(html.contains("Page 1 of 1"));
}

#[tokio::test]
async fn unknown_folder_name_is_ignored() {
    let app = TestApp::new();

    let response = app.post_form("/browse/folder", "name=Bass", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_string(app.get("/", None).await).await;
    assert!(html.contains(r#"<option value="Drums" selected>"#));
}

#[tokio::test]
async fn search_page_size_and_paging() {
    let app = TestApp::new();

    let response = app.post_form("/browse/folder", "name=Vox", None).await;
    let cookie = session_cookie(&response).unwrap();

    app.post_form("/browse/page-size", "page_size=10", Some(&cookie))
        .await;
    app.post_form("/browse/page", "page=3", Some(&cookie)).await;

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("Page 3 of 3"));
    assert!(html.contains("Vocal_Take20.wav"));
    assert!(html.contains("Vocal_Take24.wav"));
    assert!(!html.contains("Vocal_Take19.wav"));

    app.post_form("/browse/search", "q=take1", Some(&cookie)).await;

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("10 matching file(s). Page 1 of 1."));
    assert!(html.contains("Vocal_Take10.wav"));
    assert!(!html.contains("Vocal_Take20.wav"));
}

#[tokio::test]
async fn page_number_beyond_range_shows_last_page() {
    let app = TestApp::new();

    let response = app.post_form("/browse/folder", "name=Vox", None).await;
    let cookie = session_cookie(&response).unwrap();
    app.post_form("/browse/page-size", "page_size=10", Some(&cookie))
        .await;
    app.post_form("/browse/page", "page=99", Some(&cookie)).await;

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("Page 3 of 3"));
}

#[tokio::test]
async fn page_size_is_clamped() {
    let app = TestApp::new();

    let response = app.post_form("/browse/page-size", "page_size=3", None).await;
    let cookie = session_cookie(&response).unwrap();

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains(r#"step="10" value="10""#));
}

#[tokio::test]
async fn negative_page_size_is_clamped() {
    let app = TestApp::new();

    let response = app.post_form("/browse/page-size", "page_size=-5", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response).unwrap();

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains(r#"step="10" value="10""#));
}

#[tokio::test]
async fn unreadable_page_input_keeps_current_values() {
    let app = TestApp::new();

    let response = app.post_form("/browse/page-size", "page_size=50", None).await;
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .post_form("/browse/page-size", "page_size=lots", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app.post_form("/browse/page", "page=", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains(r#"step="10" value="50""#));
}

#[tokio::test]
async fn search_without_matches_shows_info() {
    let app = TestApp::new();

    let response = app.post_form("/browse/search", "q=cymbal", None).await;
    let cookie = session_cookie(&response).unwrap();

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains("No matching audio files"));
}

#[tokio::test]
async fn listings_are_cached_until_refresh() {
    let app = TestApp::new();

    app.get("/", None).await;
    app.get("/", None).await;
    let calls = app.store.list_calls.load(Ordering::SeqCst);
    assert_eq!(calls, 2, "one folder listing and one file listing");

    let response = app.post_form("/refresh", "", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    app.get("/", None).await;
    assert_eq!(app.store.list_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn vanished_folder_falls_back_to_first() {
    let app = TestApp::new();

    let response = app.post_form("/browse/folder", "name=Vox", None).await;
    let cookie = session_cookie(&response).unwrap();

    app.store.set_children(common::ROOT_ID, vec![drums_folder()]);
    app.post_form("/refresh", "", Some(&cookie)).await;

    let html = body_string(app.get("/", Some(&cookie)).await).await;
    assert!(html.contains(r#"<option value="Drums" selected>"#));
    assert!(!html.contains(VOX_ID));
}

fn drums_folder() -> RemoteEntry {
    RemoteEntry {
        id: common::DRUMS_ID.to_string(),
        name: "Drums".to_string(),
        mime_type: Some("application/vnd.google-apps.folder".to_string()),
        size: None,
    }
}

#[tokio::test]
async fn empty_root_shows_warning() {
    let app = TestApp::new();
    app.store.set_children(common::ROOT_ID, Vec::new());

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains("No subfolders found"));
}

#[tokio::test]
async fn store_failure_renders_error_banner() {
    let app = TestApp::new();
    app.store.fail(true);

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let html = body_string(response).await;
    assert!(html.contains(r#"role="alert""#));
    assert!(html.contains("shared with the service account"));
}

#[tokio::test]
async fn failures_are_not_cached() {
    let app = TestApp::new();
    app.store.fail(true);
    app.get("/", None).await;

    app.store.fail(false);
    let response = app.get("/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("kick.wav"));
}
