pub mod edit_image;
pub mod generate_image;
pub mod sources;
pub mod url_validation;

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::{
    config::AppConfig,
    error::ToolError,
    openai::{ImageData, OpenAiImagesClient},
    report::{EditSummary, FailureReport, GenerationSummary, Operation},
    storage::ImageStore,
};

pub use edit_image::{edit_image, run_edit, EditImageRequest, ImageInput};
pub use generate_image::{generate_image, run_generation, GenerateImageRequest};
pub use url_validation::validate_http_url;

#[derive(Serialize)]
pub struct ToolResponse<'a, S> {
    pub paths: Vec<String>,
    pub urls: Vec<String>,
    pub summary: &'a S,
}

pub trait Summary: Serialize {
    fn render_markdown(&self) -> String;
}

impl Summary for GenerationSummary {
    fn render_markdown(&self) -> String {
        GenerationSummary::render_markdown(self)
    }
}

impl Summary for EditSummary {
    fn render_markdown(&self) -> String {
        EditSummary::render_markdown(self)
    }
}

/// Result of one operation: saved paths plus either a summary or a failure.
/// Failed operations always carry an empty path list.
#[derive(Debug)]
pub struct ToolOutcome<S> {
    pub paths: Vec<PathBuf>,
    pub report: Result<S, FailureReport>,
}

impl<S: Summary> ToolOutcome<S> {
    pub(crate) fn from_result(operation: Operation, result: Result<(Vec<PathBuf>, S), ToolError>) -> Self {
        match result {
            Ok((paths, summary)) => Self {
                paths,
                report: Ok(summary),
            },
            Err(err) => {
                if err.is_precondition() {
                    tracing::info!(?operation, error = %err, "request rejected");
                } else {
                    tracing::warn!(?operation, error = %err, "operation failed");
                }
                Self {
                    paths: Vec::new(),
                    report: Err(FailureReport::new(operation, &err)),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.report.is_ok()
    }

    pub fn render_markdown(&self) -> String {
        match &self.report {
            Ok(summary) => summary.render_markdown(),
            Err(failure) => failure.render_markdown(),
        }
    }

    pub fn into_call_result(self, store: &ImageStore) -> Result<CallToolResult, McpError> {
        let markdown = self.render_markdown();
        let summary = match &self.report {
            Ok(summary) => summary,
            Err(_) => return Ok(CallToolResult::error(vec![Content::text(markdown)])),
        };
        let response = ToolResponse {
            paths: self
                .paths
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
            urls: self.paths.iter().map(|path| store.get_public_url(path)).collect(),
            summary,
        };
        let json = serde_json::to_string(&response).map_err(|err| {
            McpError::internal_error(
                "serialize tool response failed",
                Some(serde_json::Value::String(err.to_string())),
            )
        })?;
        Ok(CallToolResult::success(vec![
            Content::text(markdown),
            Content::text(json),
        ]))
    }
}

/// Shared state for both operations, built once from [`AppConfig`].
#[derive(Clone, Debug)]
pub struct ToolContext {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    input_dir: Option<PathBuf>,
    store: ImageStore,
}

impl ToolContext {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            input_dir: config.input_dir.clone(),
            store: ImageStore::new(config.output_dir.clone(), config.images_base_url.clone()),
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn input_dir(&self) -> Option<&Path> {
        self.input_dir.as_deref()
    }

    pub(crate) fn client(&self) -> Result<OpenAiImagesClient, ToolError> {
        let api_key = self.api_key.as_deref().ok_or(ToolError::MissingCredential)?;
        Ok(OpenAiImagesClient::new(self.http.clone(), &self.base_url, api_key))
    }
}

/// Decodes every returned image and writes it under the name chosen by `name_for`
/// (called with the 1-based index).
pub(crate) async fn save_images(
    store: &ImageStore,
    data: Vec<ImageData>,
    name_for: impl Fn(usize) -> String,
) -> Result<Vec<PathBuf>, ToolError> {
    if data.is_empty() {
        return Err(ToolError::Remote(anyhow::anyhow!("the API returned no images")));
    }
    let mut paths = Vec::with_capacity(data.len());
    for (i, item) in data.into_iter().enumerate() {
        let index = i + 1;
        let encoded = item
            .b64_json
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ToolError::Remote(anyhow::anyhow!("image {index} has no b64_json payload")))?;
        let bytes = BASE64.decode(encoded.trim())?;
        let path = store.put_new(&name_for(index), &bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "saved image");
        paths.push(path);
    }
    Ok(paths)
}
