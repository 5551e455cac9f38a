use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;

use nvshu::backend::{HttpBackend, MediaUpload, PoemBackend};
use nvshu::errors::{StageError, UploadError};
use nvshu::glyphs::GlyphToken;
use nvshu::media::MediaKind;
use nvshu::types::SessionId;

async fn spawn(router: Router) -> HttpBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    HttpBackend::new(&format!("http://{addr}"), 5).unwrap()
}

fn upload(name: &str) -> MediaUpload {
    MediaUpload {
        file_name: name.to_string(),
        mime: "video/mp4".to_string(),
        bytes: b"fake-video-bytes".to_vec(),
        kind: MediaKind::Video,
        session_id: SessionId::new("visitor-7"),
    }
}

#[tokio::test]
async fn describe_posts_the_media_url() {
    let backend = spawn(Router::new().route(
        "/describe_video",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "video_desc": format!("描述 {}", body["media_url"].as_str().unwrap_or("")),
                "video_desc_eng": "A description."
            }))
        }),
    ))
    .await;

    let text = backend.describe_media("/uploads/a.mp4").await.unwrap();
    assert_eq!(text.primary, "描述 /uploads/a.mp4");
    assert_eq!(text.secondary, "A description.");
}

#[tokio::test]
async fn similar_poems_pair_translations_in_order() {
    let backend = spawn(Router::new().route(
        "/find_similar_poems",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["video_description"], "江水");
            Json(json!({
                "similar_poems": ["春江水暖", "明月松间"],
                "similar_poems_eng": ["Spring river"]
            }))
        }),
    ))
    .await;

    let similar = backend.find_similar_poems("江水").await.unwrap();
    assert_eq!(similar.poems.len(), 2);
    assert_eq!(similar.poems[0].secondary, "Spring river");
    assert_eq!(similar.poems[1].secondary, "");
}

#[tokio::test]
async fn generate_sends_description_and_poems() {
    let backend = spawn(Router::new().route(
        "/generate_poem",
        post(|Json(body): Json<Value>| async move {
            let count = body["similar_poems"].as_array().map(Vec::len).unwrap_or(0);
            Json(json!({ "poem": format!("诗{count}"), "poem_eng": "poem" }))
        }),
    ))
    .await;

    let poem = backend
        .generate_poem("江水", &["一".to_string(), "二".to_string()])
        .await
        .unwrap();
    assert_eq!(poem.primary, "诗2");
}

#[tokio::test]
async fn application_error_field_fails_the_stage() {
    let backend = spawn(Router::new().route(
        "/generate_poem",
        post(|| async { Json(json!({ "error": "model offline" })) }),
    ))
    .await;

    let err = backend.generate_poem("江水", &[]).await.unwrap_err();
    assert!(matches!(err, StageError::Application(ref m) if m == "model offline"));
}

#[tokio::test]
async fn error_envelope_on_failed_status_is_preferred() {
    let backend = spawn(Router::new().route(
        "/describe_video",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "ffmpeg crashed" })),
            )
        }),
    ))
    .await;

    let err = backend.describe_media("/uploads/a.mp4").await.unwrap_err();
    assert_eq!(err.to_string(), "ffmpeg crashed");
}

#[tokio::test]
async fn bare_failed_status_reports_the_code() {
    let backend = spawn(Router::new().route(
        "/describe_video",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
    ))
    .await;

    let err = backend.describe_media("/uploads/a.mp4").await.unwrap_err();
    assert!(matches!(err, StageError::Status(503)));
}

#[tokio::test]
async fn missing_required_field_is_a_decode_error() {
    let backend = spawn(Router::new().route(
        "/generate_poem",
        post(|| async { Json(json!({ "poem_eng": "only english" })) }),
    ))
    .await;

    let err = backend.generate_poem("江水", &[]).await.unwrap_err();
    assert!(matches!(err, StageError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&format!("http://{addr}"), 5).unwrap();
    let err = backend.describe_media("/uploads/a.mp4").await.unwrap_err();
    assert!(matches!(err, StageError::Transport(_)));
}

#[tokio::test]
async fn upload_sends_multipart_fields() {
    let backend = spawn(Router::new().route(
        "/upload",
        post(|headers: HeaderMap, body: Bytes| async move {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = String::from_utf8_lossy(&body).to_string();
            let ok = content_type.starts_with("multipart/form-data")
                && body.contains("name=\"session_id\"")
                && body.contains("visitor-7")
                && body.contains("name=\"file_type\"")
                && body.contains("filename=\"clip.mp4\"");
            if ok {
                Json(json!({ "success": true, "file_url": "/uploads/clip.mp4" })).into_response()
            } else {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad form" }))).into_response()
            }
        }),
    ))
    .await;

    let receipt = backend.upload_media(upload("clip.mp4")).await.unwrap();
    assert_eq!(receipt.file_url, "/uploads/clip.mp4");
}

#[tokio::test]
async fn upload_html_response_is_not_json() {
    let backend = spawn(Router::new().route(
        "/upload",
        post(|| async { (StatusCode::BAD_GATEWAY, Html("<h1>Bad gateway</h1>")) }),
    ))
    .await;

    let err = backend.upload_media(upload("clip.mp4")).await.unwrap_err();
    assert!(matches!(err, UploadError::NotJson { status: 502 }));
    assert_eq!(
        err.to_string(),
        "Server returned a non-JSON response. Status: 502"
    );
}

#[tokio::test]
async fn upload_success_false_is_rejected_with_message() {
    let backend = spawn(Router::new().route(
        "/upload",
        post(|| async { Json(json!({ "success": false, "message": "quota exceeded" })) }),
    ))
    .await;

    let err = backend.upload_media(upload("clip.mp4")).await.unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: quota exceeded");
}

#[tokio::test]
async fn upload_without_file_url_fails() {
    let backend = spawn(Router::new().route(
        "/upload",
        post(|| async { Json(json!({ "success": true })) }),
    ))
    .await;

    let err = backend.upload_media(upload("clip.mp4")).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingUrl));
}

#[tokio::test]
async fn upload_malformed_json_is_reported() {
    let backend = spawn(Router::new().route(
        "/upload",
        post(|| async {
            (
                [(header::CONTENT_TYPE, "application/json")],
                "{ not really json",
            )
        }),
    ))
    .await;

    let err = backend.upload_media(upload("clip.mp4")).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidJson(ref body) if body == "{ not really json"));
}

#[tokio::test]
async fn glyph_poem_mixes_text_and_glyph_items() {
    let backend = spawn(Router::new().route(
        "/replace_with_created_char",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["poem"], "江永女书奇");
            Json(json!({
                "poem_in_simple_el": "江永[14,0,16]书奇",
                "poem_in_list": ["江", "永", [14, 0, 16], "书", "奇"],
                "replaced_ind": [2]
            }))
        }),
    ))
    .await;

    let poem = backend.replace_with_glyphs("江永女书奇").await.unwrap();
    assert_eq!(poem.poem_in_list.len(), 5);
    assert_eq!(poem.poem_in_list[2], GlyphToken::Glyph(vec![14, 0, 16]));
    assert_eq!(poem.replaced_ind, vec![2]);
}

#[tokio::test]
async fn generated_character_error_includes_message() {
    let backend = spawn(Router::new().route(
        "/generate_char",
        post(|| async {
            Json(json!({ "error": "generation failed", "message": "no candidates" }))
        }),
    ))
    .await;

    let err = backend.generate_character("江永").await.unwrap_err();
    assert_eq!(err.to_string(), "generation failed: no candidates");
}

#[tokio::test]
async fn blank_error_field_continues_the_stage() {
    let backend = spawn(Router::new().route(
        "/describe_video",
        post(|| async {
            Json(json!({ "video_desc": "花", "video_desc_eng": "flower", "error": "" }))
        }),
    ))
    .await;

    let text = backend.describe_media("/uploads/a.mp4").await.unwrap();
    assert_eq!(text.primary, "花");
}

#[tokio::test]
async fn keep_calls_share_the_cookie_session() {
    let backend = spawn(
        Router::new()
            .route(
                "/generate_char",
                post(|| async {
                    (
                        [(header::SET_COOKIE, "session=visitor-7; Path=/")],
                        Json(json!({ "char_cn": "花", "char_pos": 0 })),
                    )
                }),
            )
            .route(
                "/save_user_name",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["user_name"], "Mei");
                    Json(json!({ "status": "success" }))
                }),
            )
            .route(
                "/save_storage_preference",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["storage_preference"], "yes");
                    Json(json!({ "status": "success" }))
                }),
            )
            .route(
                "/add_to_dictionary",
                post(|headers: HeaderMap| async move {
                    let has_session = headers
                        .get(header::COOKIE)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.contains("session=visitor-7"));
                    if has_session {
                        Json(json!({ "status": "success" })).into_response()
                    } else {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "status": "error", "message": "Missing character data" })),
                        )
                            .into_response()
                    }
                }),
            ),
    )
    .await;

    backend.generate_character("花开").await.unwrap();
    backend.save_user_name("Mei").await.unwrap();
    backend.save_storage_preference("yes").await.unwrap();
    backend.add_to_dictionary().await.unwrap();
}

#[tokio::test]
async fn add_without_session_reports_the_message() {
    let backend = spawn(Router::new().route(
        "/add_to_dictionary",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": "Missing character data" })),
            )
        }),
    ))
    .await;

    let err = backend.add_to_dictionary().await.unwrap_err();
    assert!(matches!(err, StageError::Application(ref m) if m == "Missing character data"));
}

#[tokio::test]
async fn dictionary_lists_mixed_entries() {
    let backend = spawn(Router::new().route(
        "/get_dictionary",
        get(|| async {
            Json(json!({
                "江": [14, 0, 16],
                "花": { "char_3dim": [3, 1, 2], "char_translate": "flower" }
            }))
        }),
    ))
    .await;

    let dictionary = backend.get_dictionary().await.unwrap();
    assert_eq!(dictionary.len(), 2);
    assert_eq!(dictionary["江"].components(), &[14, 0, 16]);
    assert_eq!(dictionary["花"].translation("花"), "flower");
}

#[tokio::test]
async fn search_sends_the_term_as_a_query() {
    let backend = spawn(Router::new().route(
        "/search_dictionary",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            let term = query.get("term").cloned().unwrap_or_default();
            Json(json!({ term: { "char_3dim": [1, 2, 3], "char_translate": "moon" } }))
        }),
    ))
    .await;

    let found = backend.search_dictionary("月").await.unwrap();
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["月"]);
}

#[tokio::test]
async fn dictionary_error_is_an_application_error() {
    let backend = spawn(Router::new().route(
        "/get_dictionary",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "dictionary file missing" })),
            )
        }),
    ))
    .await;

    let err = backend.get_dictionary().await.unwrap_err();
    assert_eq!(err.to_string(), "dictionary file missing");
}
