mod config;
mod protocol;
mod server;
mod tools;

use std::sync::Arc;

use clap::Parser;
use clickup_service::HttpService;

use crate::config::McpConfig;
use crate::tools::ToolContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "clickup_mcp=info,clickup_aggregate=info,clickup_service=info",
                )
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = McpConfig::parse();
    let service = HttpService::with_timeout(
        &config.base_url,
        config.api_token.clone(),
        config.request_timeout(),
    )?;
    tracing::info!(base_url = %config.base_url, "using ClickUp API");

    let ctx = ToolContext::new(Arc::new(service), config.output_dir, config.concurrency);
    server::run(ctx).await
}
