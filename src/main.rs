use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tower_http::services::ServeDir;

use dream_weaver_rmcp::{
    config::{AppConfig, Transport},
    mcp_server::DreamWeaverServer,
    tools::ToolContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = AppConfig::from_env();
    if config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; tool calls will report a missing credential");
    }
    match &config.input_dir {
        Some(dir) => tracing::info!(input_dir = %dir.display(), "local edit sources enabled"),
        None => tracing::info!("INPUT_DIR is not set; edit sources must be http(s) URLs"),
    }
    let ctx = ToolContext::new(&config);

    match config.transport {
        Transport::Stdio => serve_stdio(ctx).await,
        Transport::Http => serve_http(&config, ctx).await,
    }
}

async fn serve_stdio(ctx: ToolContext) -> Result<()> {
    tracing::info!("Dream Weaver MCP server listening on stdio");
    let service = DreamWeaverServer::new(ctx).serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

async fn serve_http(config: &AppConfig, ctx: ToolContext) -> Result<()> {
    let bind_address = config.bind_address();
    let mcp_path = config.mcp_path();
    let output_dir = config.output_dir.clone();

    let service = StreamableHttpService::new(
        move || Ok(DreamWeaverServer::new(ctx.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new()
        .nest_service(&mcp_path, service)
        .nest_service("/images", ServeDir::new(output_dir));
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(
        "Dream Weaver MCP HTTP server started at http://{}{}",
        bind_address,
        mcp_path
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
