use std::path::Path;

use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use serde_json::json;

use dream_weaver_rmcp::{
    config::AppConfig,
    options::{ImageSize, OutputFormat, Quality},
    tools::{
        EditImageRequest, GenerateImageRequest, ImageInput, ToolContext, run_edit, run_generation,
    },
};

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn context(server: &MockServer, dir: &Path, api_key: Option<&str>) -> ToolContext {
    let config = AppConfig::new(
        api_key.map(str::to_string),
        server.url("/v1"),
        dir.join("generated_images"),
    )
    .with_input_dir(dir);
    ToolContext::new(&config)
}

fn images_body(created: u64, count: usize) -> String {
    let data: Vec<_> = (0..count).map(|_| json!({ "b64_json": "aGVsbG8=" })).collect();
    json!({
        "created": created,
        "data": data,
        "usage": {
            "total_tokens": 3500,
            "input_tokens": 1500,
            "output_tokens": 2000,
            "input_tokens_details": { "text_tokens": 1000, "image_tokens": 500 }
        }
    })
    .to_string()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap()
}

#[tokio::test]
async fn generate_saves_every_image_and_reports_options() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/images/generations")
                .header("authorization", "Bearer sk-test")
                .body_includes("\"model\":\"gpt-image-1\"")
                .body_includes("\"prompt\":\"a paper boat\"")
                .body_includes("\"n\":2")
                .body_includes("\"quality\":\"high\"")
                .body_includes("\"size\":\"1536x1024\"")
                .body_includes("\"output_format\":\"png\"")
                .body_includes("\"moderation\":\"low\"")
                .body_includes("\"output_compression\":85");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(1_700_000_000, 2));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let mut request = GenerateImageRequest::new("a paper boat");
    request.n = 2;
    request.quality = Quality::High;
    request.size = ImageSize::Landscape;
    request.output_format = OutputFormat::Png;
    let outcome = run_generation(&ctx, request).await;

    mock.assert_async().await;
    assert!(outcome.is_success(), "{}", outcome.render_markdown());
    assert_eq!(outcome.paths.len(), 2);
    assert_eq!(file_name(&outcome.paths[0]), "generated_1700000000_1.png");
    assert_eq!(file_name(&outcome.paths[1]), "generated_1700000000_2.png");
    assert!(outcome.paths[0].starts_with(dir.path().join("generated_images")));
    assert_eq!(std::fs::read(&outcome.paths[0]).unwrap(), b"hello");

    let report = outcome.render_markdown();
    assert!(report.contains("high"));
    assert!(report.contains("1536x1024"));
    assert!(report.contains("- **Format:** png"));
    assert!(report.contains("- **Input Cost:** $0.0050"));
    assert!(report.contains("- **Output Cost:** $0.0800"));
    assert!(report.contains("- **Total Cost:** $0.0850"));
    assert!(report.contains("- **Images Created:** 2"));
}

#[tokio::test]
async fn generate_uses_jpg_extension_for_jpeg() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/images/generations");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(42, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let outcome = run_generation(&ctx, GenerateImageRequest::new("a fox")).await;

    assert_eq!(outcome.paths.len(), 1);
    assert_eq!(file_name(&outcome.paths[0]), "generated_42_1.jpg");
    assert!(outcome.render_markdown().contains("- **Format:** jpeg"));
}

#[tokio::test]
async fn blank_prompt_never_reaches_the_api() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body(images_body(1, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let outcome = run_generation(&ctx, GenerateImageRequest::new("  \t\n")).await;

    mock.assert_calls_async(0).await;
    assert!(outcome.paths.is_empty());
    assert!(!outcome.is_success());
    assert!(outcome.render_markdown().contains("Prompt cannot be empty"));
}

#[tokio::test]
async fn missing_credential_never_reaches_the_api() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body(images_body(1, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("cat.png");
    std::fs::write(&source, PNG_MAGIC).unwrap();
    let ctx = context(&server, dir.path(), None);

    let generated = run_generation(&ctx, GenerateImageRequest::new("a fox")).await;
    let edited = run_edit(
        &ctx,
        EditImageRequest::new(ImageInput::Single(source.display().to_string()), "add a hat"),
    )
    .await;

    mock.assert_calls_async(0).await;
    for (paths, report) in [
        (generated.paths.len(), generated.render_markdown()),
        (edited.paths.len(), edited.render_markdown()),
    ] {
        assert_eq!(paths, 0);
        assert!(report.contains("API key not found"));
    }
}

#[tokio::test]
async fn edit_without_images_never_reaches_the_api() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body(images_body(1, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let mut request = EditImageRequest::new(ImageInput::Sequence(Vec::new()), "add a hat");
    let empty = run_edit(&ctx, request.clone()).await;
    request.images = None;
    let missing = run_edit(&ctx, request).await;

    mock.assert_calls_async(0).await;
    assert!(empty.paths.is_empty());
    assert!(missing.paths.is_empty());
    assert!(missing.render_markdown().contains("at least one image"));
}

#[tokio::test]
async fn edit_uploads_images_and_mask_and_saves_png() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/images/edits")
                .header("authorization", "Bearer sk-test")
                .body_includes("name=\"image[]\"; filename=\"cat.png\"")
                .body_includes("name=\"image[]\"; filename=\"hat.png\"")
                .body_includes("name=\"mask\"; filename=\"mask.png\"")
                .body_includes("name=\"prompt\"")
                .body_includes("put the hat on the cat")
                .body_includes("name=\"quality\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(1_700_000_123, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let mut references = Vec::new();
    for name in ["cat.png", "hat.png", "mask.png"] {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("placeholder {name}")).unwrap();
        references.push(path.display().to_string());
    }
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let mut request = EditImageRequest::new(
        ImageInput::Sequence(references[..2].to_vec()),
        "put the hat on the cat",
    );
    request.mask = Some(references[2].clone());
    let outcome = run_edit(&ctx, request).await;

    mock.assert_async().await;
    assert!(outcome.is_success(), "{}", outcome.render_markdown());
    assert_eq!(outcome.paths.len(), 1);
    assert_eq!(file_name(&outcome.paths[0]), "edited_1700000123_1.png");

    let report = outcome.render_markdown();
    assert!(report.contains("- **Input Images:** 2"));
    assert!(report.contains("- **Mask Applied:** Yes"));
    // 1000 text tokens at $5/M plus 500 image tokens at $10/M.
    assert!(report.contains("- **Input Cost:** $0.0100 (text + images)"));
}

#[tokio::test]
async fn remote_errors_become_failure_reports() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/images/generations");
            then.status(400)
                .header("content-type", "application/json")
                .body(json!({ "error": { "message": "Your request was rejected by the safety system." } }).to_string());
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let outcome = run_generation(&ctx, GenerateImageRequest::new("a fox")).await;

    assert!(outcome.paths.is_empty());
    let report = outcome.render_markdown();
    assert!(report.starts_with("## ❌ Generation Failed"));
    assert!(report.contains("rejected by the safety system"));
    assert!(report.contains("**Troubleshooting:**"));
}

#[tokio::test]
async fn out_of_range_count_becomes_a_failure_report() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body(images_body(1, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let request: GenerateImageRequest =
        serde_json::from_value(json!({ "prompt": "a fox", "n": 300 })).unwrap();
    let outcome = run_generation(&ctx, request).await;

    mock.assert_calls_async(0).await;
    assert!(outcome.paths.is_empty());
    assert!(outcome.render_markdown().starts_with("❌ **Error:** Number of images must be between 1 and 10"));
}

#[tokio::test]
async fn edit_refuses_files_outside_the_input_dir() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/images/edits");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(1, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let secret = outside.path().join("secret.png");
    std::fs::write(&secret, "placeholder secret").unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    for reference in ["/etc/passwd".to_string(), secret.display().to_string()] {
        let outcome = run_edit(&ctx, EditImageRequest::new(ImageInput::Single(reference), "add a hat")).await;
        assert!(outcome.paths.is_empty());
        assert!(outcome.render_markdown().starts_with("❌ **Error:**"));
    }

    let no_input_dir = ToolContext::new(&AppConfig::new(
        Some("sk-test".to_string()),
        server.url("/v1"),
        dir.path().join("generated_images"),
    ));
    let cat = dir.path().join("cat.png");
    std::fs::write(&cat, "placeholder cat").unwrap();
    let outcome = run_edit(
        &no_input_dir,
        EditImageRequest::new(ImageInput::Single(cat.display().to_string()), "add a hat"),
    )
    .await;
    assert!(outcome.paths.is_empty());
    assert!(outcome.render_markdown().contains("local image paths are disabled"));

    mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn single_image_edit_uses_the_plain_image_field() {
    let server = MockServer::start_async().await;
    let source = server
        .mock_async(|when, then| {
            when.method(GET).path("/assets/cat.png");
            then.status(200).body("placeholder remote cat");
        })
        .await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/images/edits")
                .body_includes("name=\"image\"; filename=\"cat.png\"")
                .body_includes("placeholder remote cat");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(1_700_000_200, 1));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let request = EditImageRequest::new(ImageInput::Single(server.url("/assets/cat.png")), "add a hat");
    let outcome = run_edit(&ctx, request).await;

    source.assert_async().await;
    mock.assert_async().await;
    assert!(outcome.is_success(), "{}", outcome.render_markdown());
    assert_eq!(file_name(&outcome.paths[0]), "edited_1700000200_1.png");
    let report = outcome.render_markdown();
    assert!(report.contains("- **Input Images:** 1"));
    assert!(report.contains("- **Mask Applied:** No"));
}

#[tokio::test]
async fn edit_saves_one_file_per_requested_variation() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/images/edits")
                .body_includes("name=\"n\"\r\n\r\n3\r\n");
            then.status(200)
                .header("content-type", "application/json")
                .body(images_body(1_700_000_300, 3));
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cat.png"), "placeholder cat").unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let mut request = EditImageRequest::new(ImageInput::Single("cat.png".to_string()), "add a hat");
    request.n = 3;
    let outcome = run_edit(&ctx, request).await;

    mock.assert_async().await;
    assert!(outcome.is_success(), "{}", outcome.render_markdown());
    let names: Vec<_> = outcome.paths.iter().map(|path| file_name(path)).collect();
    assert_eq!(
        names,
        [
            "edited_1700000300_1.png",
            "edited_1700000300_2.png",
            "edited_1700000300_3.png",
        ]
    );
    assert!(outcome.render_markdown().contains("- **Output Images:** 3"));
}

#[tokio::test]
async fn remote_edit_errors_become_failure_reports() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/images/edits");
            then.status(400)
                .header("content-type", "application/json")
                .body(json!({ "error": { "message": "Invalid mask image format." } }).to_string());
        })
        .await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cat.png"), "placeholder cat").unwrap();
    let ctx = context(&server, dir.path(), Some("sk-test"));

    let outcome = run_edit(
        &ctx,
        EditImageRequest::new(ImageInput::Single("cat.png".to_string()), "add a hat"),
    )
    .await;

    assert!(outcome.paths.is_empty());
    let report = outcome.render_markdown();
    assert!(report.starts_with("## ❌ Edit Failed"));
    assert!(report.contains("Invalid mask image format."));
    assert!(report.contains("**Troubleshooting:**"));
}
