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
    openai::GenerateOptions,
    options::{self, Background, ImageSize, Moderation, OutputFormat, Quality},
    pricing::CostBreakdown,
    report::{GenerationSummary, Operation},
    storage::ImageStore,
    tools::{ToolContext, ToolOutcome, save_images},
};

#[derive(Clone, Debug, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "Detailed description of the image to generate (max 32,000 characters)")]
    pub prompt: String,
    #[schemars(description = "Background transparency: auto, transparent (png/webp only) or opaque")]
    #[serde(default)]
    pub background: Background,
    #[schemars(description = "Image generation model, default gpt-image-1")]
    #[serde(default = "options::default_model")]
    pub model: String,
    #[schemars(description = "Content filtering level: low or auto")]
    #[serde(default)]
    pub moderation: Moderation,
    #[schemars(description = "Number of images to generate (1-10)")]
    #[serde(default = "options::default_count")]
    pub n: i64,
    #[schemars(description = "Compression level for jpeg/webp output (0-100)")]
    #[serde(default = "options::default_compression")]
    pub output_compression: i64,
    #[schemars(description = "Output file format: jpeg, png or webp")]
    #[serde(default)]
    pub output_format: OutputFormat,
    #[schemars(description = "Quality: auto, low, medium or high")]
    #[serde(default)]
    pub quality: Quality,
    #[schemars(description = "Size: auto, 1024x1024, 1536x1024 or 1024x1536")]
    #[serde(default)]
    pub size: ImageSize,
}

impl GenerateImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            background: Background::default(),
            model: options::default_model(),
            moderation: Moderation::default(),
            n: options::default_count(),
            output_compression: options::default_compression(),
            output_format: OutputFormat::default(),
            quality: Quality::default(),
            size: ImageSize::default(),
        }
    }

    /// Checks the request and returns the image count and compression as
    /// they go on the wire.
    fn validate(&self) -> Result<(u8, u8), ToolError> {
        options::validate_prompt(&self.prompt, "Prompt cannot be empty.").map_err(ToolError::Validation)?;
        let n = options::validate_count(self.n).map_err(ToolError::Validation)?;
        let compression =
            options::validate_compression(self.output_compression).map_err(ToolError::Validation)?;
        Ok((n, compression))
    }
}

/// Generates images from a text prompt and saves them to the output directory.
/// Never fails: every error is folded into the returned report.
pub async fn run_generation(
    ctx: &ToolContext,
    request: GenerateImageRequest,
) -> ToolOutcome<GenerationSummary> {
    ToolOutcome::from_result(Operation::Generate, generate(ctx, request).await)
}

async fn generate(
    ctx: &ToolContext,
    request: GenerateImageRequest,
) -> Result<(Vec<PathBuf>, GenerationSummary), ToolError> {
    let (n, output_compression) = request.validate()?;
    let client = ctx.client()?;

    tracing::info!(
        model = %request.model,
        n,
        quality = %request.quality,
        size = %request.size,
        format = %request.output_format,
        "generating images"
    );
    let response = client
        .generate(GenerateOptions {
            model: &request.model,
            prompt: &request.prompt,
            background: request.background,
            moderation: request.moderation,
            n,
            output_compression,
            output_format: request.output_format,
            quality: request.quality,
            size: request.size,
        })
        .await?;

    let created = response.created;
    let extension = request.output_format.extension();
    let paths = save_images(ctx.store(), response.data, |index| {
        ImageStore::generated_file_name(created, index, extension)
    })
    .await?;

    let cost = CostBreakdown::for_generation(&response.usage, paths.len());
    tracing::info!(images = paths.len(), total_cost = cost.total_cost, "images generated");
    let summary = GenerationSummary {
        model: request.model,
        image_count: paths.len(),
        quality: request.quality,
        size: request.size,
        output_format: request.output_format,
        background: request.background,
        output_compression,
        created,
        usage: response.usage,
        cost,
        prompt: request.prompt,
    };
    Ok((paths, summary))
}

pub async fn generate_image(
    ctx: &ToolContext,
    Parameters(request): Parameters<GenerateImageRequest>,
) -> Result<CallToolResult, McpError> {
    run_generation(ctx, request).await.into_call_result(ctx.store())
}
