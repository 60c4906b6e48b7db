use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clickup_service::DEFAULT_BASE_URL;

#[derive(Debug, Parser)]
#[command(name = "clickup-mcp", about = "MCP server exposing ClickUp task data")]
pub struct McpConfig {
    /// ClickUp personal API token
    #[arg(long, env = "CLICKUP_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// ClickUp API base URL
    #[arg(long, env = "CLICKUP_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout for each API request; for attachment downloads, the limit on
    /// connecting and on each read of the body (seconds)
    #[arg(long, env = "CLICKUP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Default directory for downloaded attachments
    #[arg(long, env = "CLICKUP_OUTPUT_DIR", default_value = "./downloads")]
    pub output_dir: PathBuf,

    /// Maximum concurrent reply fetches / downloads per tool call
    #[arg(long, env = "CLICKUP_CONCURRENCY", default_value = "8")]
    pub concurrency: usize,
}

impl McpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
