use async_trait::async_trait;
use bytes::Bytes;
use clickup_core::comment::{CreatedComment, RawComment, ReplyEnvelope};
use clickup_core::task::{CreateTask, Task, TaskAttachment, UpdateTask};
use clickup_core::workspace::{Folder, List, Space, Workspace};
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ClickUp API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("ClickUp API request error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Attachment body, delivered chunk by chunk as it arrives.
pub type ByteStream = BoxStream<'static, Result<Bytes, ServiceError>>;

/// Abstraction over the remote work-management API.
///
/// The aggregation pipeline and the MCP tools program against this trait.
/// `HttpService` talks to the real API; `mock::MockService` serves canned
/// records in tests.
#[async_trait]
pub trait ClickUpService: Send + Sync {
    // -- Tasks --
    async fn get_task(&self, task_id: &str, include_subtasks: bool) -> Result<Task, ServiceError>;
    async fn create_task(&self, list_id: &str, input: &CreateTask) -> Result<Task, ServiceError>;
    async fn update_task(&self, task_id: &str, update: &UpdateTask)
        -> Result<Task, ServiceError>;
    /// One page (0-based) of the tasks in a list.
    async fn list_tasks(&self, list_id: &str, page: u32) -> Result<Vec<Task>, ServiceError>;
    /// One page (0-based) of the tasks in a workspace matching `query`.
    async fn search_tasks(
        &self,
        workspace_id: &str,
        query: &str,
        page: u32,
    ) -> Result<Vec<Task>, ServiceError>;

    // -- Comments --
    async fn get_task_comments(&self, task_id: &str) -> Result<Vec<RawComment>, ServiceError>;
    async fn get_comment_replies(&self, comment_id: &str) -> Result<ReplyEnvelope, ServiceError>;
    async fn create_task_comment(
        &self,
        task_id: &str,
        comment_text: &str,
    ) -> Result<CreatedComment, ServiceError>;

    // -- Attachments --
    /// Open the body behind an attachment URL. A non-success status fails
    /// here; transfer errors surface as items of the returned stream.
    async fn download_attachment(&self, url: &str) -> Result<ByteStream, ServiceError>;
    /// Attach `content` to a task under `file_name`.
    async fn upload_attachment(
        &self,
        task_id: &str,
        file_name: &str,
        content: Bytes,
    ) -> Result<TaskAttachment, ServiceError>;

    // -- Containers --
    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ServiceError>;
    async fn list_spaces(&self, workspace_id: &str) -> Result<Vec<Space>, ServiceError>;
    async fn list_folders(&self, space_id: &str) -> Result<Vec<Folder>, ServiceError>;
    async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>, ServiceError>;
    async fn list_folderless_lists(&self, space_id: &str) -> Result<Vec<List>, ServiceError>;
}
