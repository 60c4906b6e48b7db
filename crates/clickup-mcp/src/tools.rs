use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use clickup_aggregate::summary::render_comments;
use clickup_aggregate::{
    aggregate_task, download_task_attachments, resolve_comments, AggregateOptions,
    DownloadOptions,
};
use clickup_core::task::{CreateTask, Task, UpdateTask};
use clickup_service::ClickUpService;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::protocol::{ToolDefinition, ToolResult};

/// Everything a tool call needs: the shared API client and the defaults
/// for optional arguments.
pub struct ToolContext {
    pub service: Arc<dyn ClickUpService>,
    pub output_dir: PathBuf,
    pub concurrency: usize,
}

impl ToolContext {
    pub fn new(service: Arc<dyn ClickUpService>, output_dir: PathBuf, concurrency: usize) -> Self {
        Self {
            service,
            output_dir,
            concurrency,
        }
    }
}

/// Return the list of MCP tool definitions.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get-task".into(),
            description: "Get a task with its comment threads, hierarchy (workspace, folder, list, parent, subtasks) and attachments.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "download_attachments": { "type": "boolean", "description": "Download attachments to the local output directory (default: true)" },
                    "output_dir": { "type": "string", "description": "Directory to save attachments to (default: server setting)" },
                    "include_subtasks": { "type": "boolean", "description": "Include subtasks (default: true)" },
                    "include_replies": { "type": "boolean", "description": "Resolve reply threads for each comment (default: true)" }
                },
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: "get-task-comments".into(),
            description: "Get all comments of a task, optionally with their reply threads.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "include_replies": { "type": "boolean", "description": "Resolve reply threads (default: true)" }
                },
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: "download-task-attachments".into(),
            description: "Download all attachments of a task.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "output_dir": { "type": "string", "description": "Directory to save the attachments to (optional)" }
                },
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: "create-task-attachment".into(),
            description: "Upload a local file as an attachment to a task.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "file_path": { "type": "string", "description": "The path to the file to upload" }
                },
                "required": ["task_id", "file_path"]
            }),
        },
        ToolDefinition {
            name: "get-workspaces".into(),
            description: "List the workspaces the API token can access.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "get-spaces".into(),
            description: "List the spaces of a workspace.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_id": { "type": "string", "description": "The ID of the workspace" }
                },
                "required": ["workspace_id"]
            }),
        },
        ToolDefinition {
            name: "get-folders".into(),
            description: "List the folders of a space.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "space_id": { "type": "string", "description": "The ID of the space" }
                },
                "required": ["space_id"]
            }),
        },
        ToolDefinition {
            name: "get-lists".into(),
            description: "List the lists of a folder, or the folderless lists of a space.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "folder_id": { "type": "string", "description": "The ID of the folder" },
                    "space_id": { "type": "string", "description": "The ID of the space (folderless lists)" }
                }
            }),
        },
        ToolDefinition {
            name: "get-tasks".into(),
            description: "List the tasks of a list, one page at a time.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": { "type": "string", "description": "The ID of the list" },
                    "page": { "type": "integer", "minimum": 0, "description": "Page number, starting at 0 (default: 0)" }
                },
                "required": ["list_id"]
            }),
        },
        ToolDefinition {
            name: "search-tasks".into(),
            description: "Search the tasks of a workspace by text, to find task IDs.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "workspace_id": { "type": "string", "description": "The ID of the workspace" },
                    "query": { "type": "string", "description": "Text to search for" },
                    "page": { "type": "integer", "minimum": 0, "description": "Page number, starting at 0 (default: 0)" }
                },
                "required": ["workspace_id", "query"]
            }),
        },
        ToolDefinition {
            name: "create-task".into(),
            description: "Create a task in a list.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "list_id": { "type": "string", "description": "The ID of the list" },
                    "name": { "type": "string", "description": "Task name" },
                    "description": { "type": "string" },
                    "status": { "type": "string", "description": "Initial status (must exist on the list)" },
                    "parent": { "type": "string", "description": "Parent task ID to create a subtask" }
                },
                "required": ["list_id", "name"]
            }),
        },
        ToolDefinition {
            name: "update-task".into(),
            description: "Update the name, description or status of a task.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "status": { "type": "string" }
                },
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: "create-task-comment".into(),
            description: "Add a comment to a task.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string", "description": "The ID of the task" },
                    "comment_text": { "type": "string", "description": "Comment body" }
                },
                "required": ["task_id", "comment_text"]
            }),
        },
    ]
}

/// Dispatch a tool call by name, returning a ToolResult.
pub async fn dispatch_tool(ctx: &ToolContext, name: &str, args: &serde_json::Value) -> ToolResult {
    match name {
        "get-task" => handle_get_task(ctx, args).await,
        "get-task-comments" => handle_get_task_comments(ctx, args).await,
        "download-task-attachments" => handle_download_task_attachments(ctx, args).await,
        "create-task-attachment" => handle_create_task_attachment(ctx, args).await,
        "get-workspaces" => handle_get_workspaces(ctx).await,
        "get-spaces" => handle_get_spaces(ctx, args).await,
        "get-folders" => handle_get_folders(ctx, args).await,
        "get-lists" => handle_get_lists(ctx, args).await,
        "get-tasks" => handle_get_tasks(ctx, args).await,
        "search-tasks" => handle_search_tasks(ctx, args).await,
        "create-task" => handle_create_task(ctx, args).await,
        "update-task" => handle_update_task(ctx, args).await,
        "create-task-comment" => handle_create_task_comment(ctx, args).await,
        _ => ToolResult::error(
            format!("unknown tool: {name}"),
            format!("Tool '{name}' not found"),
        ),
    }
}

fn require_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolResult> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            let msg = format!("missing required parameter: {key}");
            ToolResult::error(msg.clone(), msg)
        })
}

fn opt_str<'a>(args: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Booleans arrive as JSON booleans from most hosts and as strings from some.
fn opt_bool(args: &serde_json::Value, key: &str) -> Option<bool> {
    match args.get(key)? {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Page numbers arrive as JSON integers or numeric strings.
fn opt_page(args: &serde_json::Value) -> Result<u32, ToolResult> {
    let page = match args.get("page") {
        None | Some(serde_json::Value::Null) => return Ok(0),
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    page.ok_or_else(|| {
        let msg = "invalid parameter: page must be a non-negative integer";
        ToolResult::error(msg, msg)
    })
}

fn failed(action: &str, err: impl Display, hint: &str) -> ToolResult {
    error!("error {action}: {err}");
    ToolResult::error(err.to_string(), format!("Error {action}: {err}. {hint}"))
}

fn success<T: Serialize>(text: String, value: &T) -> ToolResult {
    match serde_json::to_value(value) {
        Ok(structured) => ToolResult::success(text, structured),
        Err(e) => {
            let msg = format!("serialization error: {e}");
            ToolResult::error(msg.clone(), msg)
        }
    }
}

async fn handle_get_task(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let options = AggregateOptions {
        download_attachments: opt_bool(args, "download_attachments").unwrap_or(true),
        output_dir: opt_str(args, "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| ctx.output_dir.clone()),
        include_subtasks: opt_bool(args, "include_subtasks").unwrap_or(true),
        resolve_replies: opt_bool(args, "include_replies").unwrap_or(true),
        concurrency: ctx.concurrency,
    };
    info!("fetching task {task_id}");
    match aggregate_task(ctx.service.as_ref(), task_id, &options).await {
        Ok(result) => success(result.summary.clone(), &result),
        Err(e) => failed(
            "fetching task",
            e,
            "Please check if the task ID is correct.",
        ),
    }
}

async fn handle_get_task_comments(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let include_replies = opt_bool(args, "include_replies").unwrap_or(true);
    match resolve_comments(ctx.service.as_ref(), task_id, include_replies, ctx.concurrency).await {
        Ok(comments) => {
            info!("found {} comments on task {task_id}", comments.len());
            let text = format!(
                "Comments for task {task_id}:\n\n{}",
                render_comments(&comments)
            );
            success(text, &json!({ "task_id": task_id, "comments": comments }))
        }
        Err(e) => failed(
            "getting task comments",
            e,
            "Please check if the task ID is correct.",
        ),
    }
}

async fn handle_download_task_attachments(
    ctx: &ToolContext,
    args: &serde_json::Value,
) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let options = DownloadOptions {
        output_dir: opt_str(args, "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| ctx.output_dir.clone()),
        concurrency: ctx.concurrency,
    };
    match download_task_attachments(ctx.service.as_ref(), task_id, &options).await {
        Ok(saved_task) => {
            let results = &saved_task.downloads;
            let saved = results.iter().filter(|r| r.is_success()).count();
            let lines: Vec<String> = results
                .iter()
                .map(|r| match (r.file_path(), r.error()) {
                    (Some(path), _) => format!("- {} ({})", r.file_name, path.display()),
                    (None, err) => format!(
                        "- {} (failed: {})",
                        r.file_name,
                        err.unwrap_or("unknown error")
                    ),
                })
                .collect();
            let text = if results.is_empty() {
                format!("Task {task_id} has no attachments.")
            } else {
                format!(
                    "Downloaded {saved} of {} attachments from task {task_id}:\n\n{}\n\nFiles are saved in: {}",
                    results.len(),
                    lines.join("\n"),
                    saved_task.directory.display()
                )
            };
            success(text, &saved_task)
        }
        Err(e) => failed(
            "downloading attachments",
            e,
            "Please check if the task ID is correct.",
        ),
    }
}

async fn handle_create_task_attachment(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let file_path = match require_str(args, "file_path") {
        Ok(v) => Path::new(v),
        Err(e) => return e,
    };
    const HINT: &str = "Please check if the task ID and file path are correct.";
    let Some(file_name) = file_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return failed(
            "uploading attachment",
            format!("not a file: {}", file_path.display()),
            HINT,
        );
    };
    let content = match tokio::fs::read(file_path).await {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            return failed(
                "uploading attachment",
                format!("read {}: {e}", file_path.display()),
                HINT,
            )
        }
    };
    info!(
        "uploading {} ({} bytes) to task {task_id}",
        file_path.display(),
        content.len()
    );
    match ctx
        .service
        .upload_attachment(task_id, &file_name, content)
        .await
    {
        Ok(attachment) => success(
            format!(
                "Uploaded {} to task {task_id} as attachment `{}`: {}",
                attachment.title, attachment.id, attachment.url
            ),
            &json!({ "task_id": task_id, "attachment": attachment }),
        ),
        Err(e) => failed("uploading attachment", e, HINT),
    }
}

async fn handle_get_workspaces(ctx: &ToolContext) -> ToolResult {
    match ctx.service.list_workspaces().await {
        Ok(workspaces) => {
            let text = listing(
                "Workspaces",
                workspaces.iter().map(|w| (w.name.as_str(), w.id.as_str())),
            );
            success(text, &json!({ "workspaces": workspaces }))
        }
        Err(e) => failed("listing workspaces", e, "Please check the API token."),
    }
}

async fn handle_get_spaces(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let workspace_id = match require_str(args, "workspace_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctx.service.list_spaces(workspace_id).await {
        Ok(spaces) => {
            let text = listing(
                &format!("Spaces in workspace {workspace_id}"),
                spaces.iter().map(|s| (s.name.as_str(), s.id.as_str())),
            );
            success(text, &json!({ "spaces": spaces }))
        }
        Err(e) => failed(
            "listing spaces",
            e,
            "Please check if the workspace ID is correct.",
        ),
    }
}

async fn handle_get_folders(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let space_id = match require_str(args, "space_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctx.service.list_folders(space_id).await {
        Ok(folders) => {
            let text = listing(
                &format!("Folders in space {space_id}"),
                folders.iter().map(|f| (f.name.as_str(), f.id.as_str())),
            );
            success(text, &json!({ "folders": folders }))
        }
        Err(e) => failed(
            "listing folders",
            e,
            "Please check if the space ID is correct.",
        ),
    }
}

async fn handle_get_lists(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let (result, title) = match (opt_str(args, "folder_id"), opt_str(args, "space_id")) {
        (Some(folder_id), _) => (
            ctx.service.list_lists(folder_id).await,
            format!("Lists in folder {folder_id}"),
        ),
        (None, Some(space_id)) => (
            ctx.service.list_folderless_lists(space_id).await,
            format!("Folderless lists in space {space_id}"),
        ),
        (None, None) => {
            let msg = "missing required parameter: folder_id or space_id";
            return ToolResult::error(msg, msg);
        }
    };
    match result {
        Ok(lists) => {
            let text = listing(&title, lists.iter().map(|l| (l.name.as_str(), l.id.as_str())));
            success(text, &json!({ "lists": lists }))
        }
        Err(e) => failed(
            "listing lists",
            e,
            "Please check if the folder or space ID is correct.",
        ),
    }
}

async fn handle_get_tasks(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let list_id = match require_str(args, "list_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let page = match opt_page(args) {
        Ok(p) => p,
        Err(e) => return e,
    };
    match ctx.service.list_tasks(list_id, page).await {
        Ok(tasks) => {
            let text = task_listing(&format!("Tasks in list {list_id} (page {page})"), &tasks);
            success(text, &json!({ "list_id": list_id, "page": page, "tasks": tasks }))
        }
        Err(e) => failed(
            "listing tasks",
            e,
            "Please check if the list ID is correct.",
        ),
    }
}

async fn handle_search_tasks(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let workspace_id = match require_str(args, "workspace_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = match require_str(args, "query") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let page = match opt_page(args) {
        Ok(p) => p,
        Err(e) => return e,
    };
    info!("searching workspace {workspace_id} for {query:?}");
    match ctx.service.search_tasks(workspace_id, query, page).await {
        Ok(tasks) => {
            let text = task_listing(&format!("Tasks matching \"{query}\" (page {page})"), &tasks);
            success(text, &json!({ "workspace_id": workspace_id, "page": page, "tasks": tasks }))
        }
        Err(e) => failed(
            "searching tasks",
            e,
            "Please check if the workspace ID is correct.",
        ),
    }
}

async fn handle_create_task(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let list_id = match require_str(args, "list_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match require_str(args, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let input = CreateTask {
        name: name.to_string(),
        description: opt_str(args, "description").map(String::from),
        status: opt_str(args, "status").map(String::from),
        parent: opt_str(args, "parent").map(String::from),
    };
    match ctx.service.create_task(list_id, &input).await {
        Ok(task) => success(
            format!("Created task {} (`{}`) in list {list_id}.", task.name, task.id),
            &task,
        ),
        Err(e) => failed(
            "creating task",
            e,
            "Please check if the list ID is correct.",
        ),
    }
}

async fn handle_update_task(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let update = UpdateTask {
        name: opt_str(args, "name").map(String::from),
        description: opt_str(args, "description").map(String::from),
        status: opt_str(args, "status").map(String::from),
    };
    if update.is_empty() {
        let msg = "nothing to update: provide name, description or status";
        return ToolResult::error(msg, msg);
    }
    match ctx.service.update_task(task_id, &update).await {
        Ok(task) => success(
            format!(
                "Updated task {} (`{}`), status: {}.",
                task.name,
                task.id,
                task.status_name()
            ),
            &task,
        ),
        Err(e) => failed(
            "updating task",
            e,
            "Please check if the task ID is correct.",
        ),
    }
}

async fn handle_create_task_comment(ctx: &ToolContext, args: &serde_json::Value) -> ToolResult {
    let task_id = match require_str(args, "task_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let comment_text = match require_str(args, "comment_text") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ctx.service.create_task_comment(task_id, comment_text).await {
        Ok(created) => success(
            format!("Added comment {} to task {task_id}.", created.id),
            &created,
        ),
        Err(e) => failed(
            "creating comment",
            e,
            "Please check if the task ID is correct.",
        ),
    }
}

fn task_listing(title: &str, tasks: &[Task]) -> String {
    let lines: Vec<String> = tasks
        .iter()
        .map(|t| format!("- {} (`{}`) [{}]", t.name, t.id, t.status_name()))
        .collect();
    if lines.is_empty() {
        format!("{title}: none found.")
    } else {
        format!("{title}:\n\n{}", lines.join("\n"))
    }
}

fn listing<'a>(title: &str, items: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let lines: Vec<String> = items
        .map(|(name, id)| format!("- {name} (`{id}`)"))
        .collect();
    if lines.is_empty() {
        format!("{title}: none found.")
    } else {
        format!("{title}:\n\n{}", lines.join("\n"))
    }
}
