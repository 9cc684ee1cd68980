use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::tools::{EditImageRequest, GenerateImageRequest, ToolContext};

const INSTRUCTIONS: &str = "Dream Weaver generates and edits images with the OpenAI Images API. \
Each call returns a markdown report with token usage and cost, plus a JSON block listing the saved files.";

#[derive(Clone)]
pub struct DreamWeaverServer {
    tool_router: ToolRouter<Self>,
    ctx: ToolContext,
}

impl DreamWeaverServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            tool_router: Self::tool_router(),
            ctx,
        }
    }
}

#[tool_router]
impl DreamWeaverServer {
    #[tool(
        description = "Generate images from a text prompt. Be specific about style, composition and lighting. Returns saved file paths and a cost report."
    )]
    async fn generate_image(
        &self,
        Parameters(request): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_image(&self.ctx, Parameters(request)).await
    }

    #[tool(
        description = "Edit or combine existing images with text instructions, optionally restricted by a mask on the first image. Outputs are saved as PNG."
    )]
    async fn edit_image(
        &self,
        Parameters(request): Parameters<EditImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::edit_image(&self.ctx, Parameters(request)).await
    }
}

#[tool_handler]
impl ServerHandler for DreamWeaverServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}
