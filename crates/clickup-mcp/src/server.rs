use std::io::{BufRead, Write};

use serde_json::json;
use tracing::{debug, error, info};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::tools::{self, ToolContext};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Run the MCP server loop, reading JSON-RPC from stdin and writing to stdout.
pub async fn run(ctx: ToolContext) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let reader = stdin.lock();
    info!("clickup-mcp ready on stdio");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        };

        if let Some(resp) = handle_line(&ctx, &line).await {
            write_response(&resp);
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// One input line in, at most one response out.
async fn handle_line(ctx: &ToolContext, line: &str) -> Option<JsonRpcResponse> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
        Ok(r) => r,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {e}"),
            ))
        }
    };

    debug!("MCP request: method={}", request.method);
    handle_request(ctx, &request).await
}

async fn handle_request(ctx: &ToolContext, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    if req.is_notification() {
        debug!("notification {}", req.method);
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "clickup-mcp",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "ping" => JsonRpcResponse::success(req.id.clone(), json!({})),
        "tools/list" => {
            let defs = tools::tool_definitions();
            JsonRpcResponse::success(req.id.clone(), json!({ "tools": defs }))
        }
        "tools/call" => {
            let tool_name = req
                .params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let arguments = req.params.get("arguments").cloned().unwrap_or(json!({}));
            info!("tool call: {tool_name}");
            let result = tools::dispatch_tool(ctx, tool_name, &arguments).await;
            match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(req.id.clone(), value),
                Err(e) => JsonRpcResponse::error(
                    req.id.clone(),
                    INTERNAL_ERROR,
                    format!("Internal error: {e}"),
                ),
            }
        }
        _ => JsonRpcResponse::error(
            req.id.clone(),
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };
    Some(response)
}

fn write_response(resp: &JsonRpcResponse) {
    match serde_json::to_string(resp) {
        Ok(json) => {
            let mut out = std::io::stdout().lock();
            if let Err(e) = writeln!(out, "{json}").and_then(|_| out.flush()) {
                error!("stdout write error: {e}");
            }
        }
        Err(e) => error!("response serialization failed: {e}"),
    }
}
