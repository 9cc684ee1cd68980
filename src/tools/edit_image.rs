use std::path::PathBuf;

use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    error::ToolError,
    image_processing,
    openai::EditOptions,
    options::{self, Background, ImageSize, MAX_SOURCE_IMAGES, Quality},
    pricing::CostBreakdown,
    report::{EditSummary, Operation},
    storage::ImageStore,
    tools::{ToolContext, ToolOutcome, save_images, sources::load_image},
};

/// One source image, or several to combine.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ImageInput {
    Single(String),
    Sequence(Vec<String>),
}

impl ImageInput {
    /// Normalizes to a list, dropping blank references.
    pub fn into_vec(self) -> Vec<String> {
        let refs = match self {
            Self::Single(reference) => vec![reference],
            Self::Sequence(references) => references,
        };
        refs.into_iter()
            .map(|reference| reference.trim().to_string())
            .filter(|reference| !reference.is_empty())
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct EditImageRequest {
    #[schemars(description = "Image to edit, or a list of up to 16 images to combine. http(s) URLs, or paths under the server's INPUT_DIR; PNG, JPEG or WebP, max 50MB each")]
    #[serde(default)]
    pub images: Option<ImageInput>,
    #[schemars(description = "Instructions describing the entire desired result (max 32,000 characters)")]
    pub prompt: String,
    #[schemars(description = "Background handling: auto, transparent or opaque")]
    #[serde(default)]
    pub background: Background,
    #[schemars(description = "Optional mask (URL or INPUT_DIR path) for the first image. Transparent areas are edited; it must have an alpha channel and match the first image's dimensions")]
    #[serde(default)]
    pub mask: Option<String>,
    #[schemars(description = "Model to use for editing, default gpt-image-1")]
    #[serde(default = "options::default_model")]
    pub model: String,
    #[schemars(description = "Number of edited variations (1-10)")]
    #[serde(default = "options::default_count")]
    pub n: i64,
    #[schemars(description = "Quality: auto, low, medium or high")]
    #[serde(default)]
    pub quality: Quality,
    #[schemars(description = "Size: auto, 1024x1024, 1536x1024 or 1024x1536")]
    #[serde(default)]
    pub size: ImageSize,
}

impl EditImageRequest {
    pub fn new(images: ImageInput, prompt: impl Into<String>) -> Self {
        Self {
            images: Some(images),
            prompt: prompt.into(),
            background: Background::default(),
            mask: None,
            model: options::default_model(),
            n: options::default_count(),
            quality: Quality::default(),
            size: ImageSize::default(),
        }
    }
}

/// Edits or combines source images and saves the results as PNG.
/// Never fails: every error is folded into the returned report.
pub async fn run_edit(ctx: &ToolContext, request: EditImageRequest) -> ToolOutcome<EditSummary> {
    ToolOutcome::from_result(Operation::Edit, edit(ctx, request).await)
}

async fn edit(
    ctx: &ToolContext,
    request: EditImageRequest,
) -> Result<(Vec<PathBuf>, EditSummary), ToolError> {
    let references = request.images.map(ImageInput::into_vec).unwrap_or_default();
    if references.is_empty() {
        return Err(ToolError::validation("Please upload at least one image file."));
    }
    options::validate_prompt(&request.prompt, "Edit prompt cannot be empty.").map_err(ToolError::Validation)?;
    if references.len() > MAX_SOURCE_IMAGES {
        return Err(ToolError::validation(format!(
            "At most {MAX_SOURCE_IMAGES} images can be edited together, got {}.",
            references.len()
        )));
    }
    let n = options::validate_count(request.n).map_err(ToolError::Validation)?;
    let client = ctx.client()?;
    let mask_reference = request
        .mask
        .as_deref()
        .map(str::trim)
        .filter(|reference| !reference.is_empty());

    let mut images = Vec::with_capacity(references.len());
    for (i, reference) in references.iter().enumerate() {
        images.push(load_image(ctx.http(), ctx.input_dir(), reference, &format!("image-{}", i + 1)).await?);
    }
    let mask = match mask_reference {
        Some(reference) => {
            let mask = load_image(ctx.http(), ctx.input_dir(), reference, "mask").await?;
            for warning in image_processing::inspect_mask(&images[0].bytes, &mask.bytes) {
                tracing::warn!(%warning, "mask may be rejected by the API");
            }
            Some(mask)
        }
        None => None,
    };
    let input_images = images.len();
    let mask_applied = mask.is_some();

    tracing::info!(
        model = %request.model,
        input_images,
        mask_applied,
        n,
        quality = %request.quality,
        size = %request.size,
        "editing images"
    );
    let response = client
        .edit(EditOptions {
            model: &request.model,
            prompt: &request.prompt,
            images,
            mask,
            background: request.background,
            n,
            quality: request.quality,
            size: request.size,
        })
        .await?;

    let created = response.created;
    let paths = save_images(ctx.store(), response.data, |index| {
        ImageStore::edited_file_name(created, index)
    })
    .await?;

    let cost = CostBreakdown::for_edit(&response.usage, paths.len());
    tracing::info!(images = paths.len(), total_cost = cost.total_cost, "images edited");
    let summary = EditSummary {
        model: request.model,
        input_images,
        output_images: paths.len(),
        quality: request.quality,
        size: request.size,
        background: request.background,
        mask_applied,
        created,
        usage: response.usage,
        cost,
        prompt: request.prompt,
    };
    Ok((paths, summary))
}

pub async fn edit_image(
    ctx: &ToolContext,
    Parameters(request): Parameters<EditImageRequest>,
) -> Result<CallToolResult, McpError> {
    run_edit(ctx, request).await.into_call_result(ctx.store())
}
