use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;

use crate::options::{Background, ImageSize, Moderation, OutputFormat, Quality};
use crate::pricing::TokenUsage;

async fn assert_ok_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or(text);
    Err(anyhow!("OpenAI request failed: {status} {message}"))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub data: Vec<ImageData>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub b64_json: Option<String>,
}

pub struct GenerateOptions<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub background: Background,
    pub moderation: Moderation,
    pub n: u8,
    pub output_compression: u8,
    pub output_format: OutputFormat,
    pub quality: Quality,
    pub size: ImageSize,
}

/// An image read into memory for a multipart upload.
#[derive(Debug)]
pub struct UploadImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct EditOptions<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: Vec<UploadImage>,
    pub mask: Option<UploadImage>,
    pub background: Background,
    pub n: u8,
    pub quality: Quality,
    pub size: ImageSize,
}

#[derive(Clone, Debug)]
pub struct OpenAiImagesClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiImagesClient {
    pub fn new(http: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn generate(&self, options: GenerateOptions<'_>) -> Result<ImagesResponse> {
        let body = json!({
            "model": options.model,
            "prompt": options.prompt,
            "background": options.background,
            "moderation": options.moderation,
            "n": options.n,
            "output_compression": options.output_compression,
            "output_format": options.output_format,
            "quality": options.quality,
            "size": options.size,
        });
        tracing::debug!(model = options.model, n = options.n, "sending image generation request");

        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("image generation request failed")?;

        let response = assert_ok_response(response).await?;
        let payload: ImagesResponse = response
            .json()
            .await
            .context("failed to parse image generation response")?;
        Ok(payload)
    }

    pub async fn edit(&self, options: EditOptions<'_>) -> Result<ImagesResponse> {
        let image_field = if options.images.len() > 1 { "image[]" } else { "image" };
        let mut form = Form::new()
            .text("model", options.model.to_string())
            .text("prompt", options.prompt.to_string())
            .text("background", options.background.as_str())
            .text("n", options.n.to_string())
            .text("quality", options.quality.as_str())
            .text("size", options.size.as_str());
        for image in options.images {
            form = form.part(image_field, upload_part(image)?);
        }
        if let Some(mask) = options.mask {
            form = form.part("mask", upload_part(mask)?);
        }
        tracing::debug!(model = options.model, n = options.n, "sending image edit request");

        let response = self
            .http
            .post(format!("{}/images/edits", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("image edit request failed")?;

        let response = assert_ok_response(response).await?;
        let payload: ImagesResponse = response
            .json()
            .await
            .context("failed to parse image edit response")?;
        Ok(payload)
    }
}

fn upload_part(image: UploadImage) -> Result<Part> {
    Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(image.mime_type)
        .map_err(|err| anyhow!("invalid mime type {}: {err}", image.mime_type))
}
