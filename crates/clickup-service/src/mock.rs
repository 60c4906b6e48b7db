use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use clickup_core::comment::{CreatedComment, RawComment, ReplyEnvelope};
use clickup_core::task::{CreateTask, Task, TaskAttachment, UpdateTask};
use clickup_core::workspace::{Folder, List, Space, Workspace};

use crate::{ByteStream, ClickUpService, ServiceError};

enum MockDownload {
    Complete(Bytes),
    Refused(String),
    /// Sends `sent`, then fails mid-transfer.
    Interrupted { sent: Bytes, message: String },
}

/// In-memory ClickUpService for tests.
///
/// Unknown tasks are `NotFound`; unknown comment threads and task comment
/// lists are empty. Failures are injected per id or per URL and surface as
/// `ServiceError::Transport`.
#[derive(Default)]
pub struct MockService {
    tasks: Mutex<HashMap<String, Task>>,
    aliases: HashMap<String, String>,
    comments: HashMap<String, Result<Vec<RawComment>, String>>,
    replies: HashMap<String, Result<serde_json::Value, String>>,
    downloads: HashMap<String, MockDownload>,
    workspaces: Vec<Workspace>,
    spaces: HashMap<String, Vec<Space>>,
    folders: HashMap<String, Vec<Folder>>,
    lists: HashMap<String, Vec<List>>,
    created_comments: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<(String, String, Bytes)>>,
    calls: Mutex<Vec<String>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, task: Task) -> Self {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task);
        self
    }

    /// Register a task from its JSON wire form.
    pub fn with_task_json(self, value: serde_json::Value) -> Self {
        let task: Task = serde_json::from_value(value).expect("valid task json");
        self.with_task(task)
    }

    /// Make `alias` (a custom task id) resolve to the task stored as `task_id`.
    pub fn with_task_alias(mut self, alias: &str, task_id: &str) -> Self {
        self.aliases.insert(alias.to_string(), task_id.to_string());
        self
    }

    pub fn with_comments(mut self, task_id: &str, comments: serde_json::Value) -> Self {
        let comments: Vec<RawComment> =
            serde_json::from_value(comments).expect("valid comment json");
        self.comments.insert(task_id.to_string(), Ok(comments));
        self
    }

    pub fn with_comments_failure(mut self, task_id: &str, message: &str) -> Self {
        self.comments
            .insert(task_id.to_string(), Err(message.to_string()));
        self
    }

    /// Register a reply response body in any of the accepted envelope shapes.
    pub fn with_replies(mut self, comment_id: &str, body: serde_json::Value) -> Self {
        self.replies.insert(comment_id.to_string(), Ok(body));
        self
    }

    pub fn with_replies_failure(mut self, comment_id: &str, message: &str) -> Self {
        self.replies
            .insert(comment_id.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_download(mut self, url: &str, data: impl Into<Bytes>) -> Self {
        self.downloads
            .insert(url.to_string(), MockDownload::Complete(data.into()));
        self
    }

    pub fn with_download_failure(mut self, url: &str, message: &str) -> Self {
        self.downloads
            .insert(url.to_string(), MockDownload::Refused(message.to_string()));
        self
    }

    /// The download starts, delivers `sent`, then breaks off with `message`.
    pub fn with_download_interrupted(
        mut self,
        url: &str,
        sent: impl Into<Bytes>,
        message: &str,
    ) -> Self {
        self.downloads.insert(
            url.to_string(),
            MockDownload::Interrupted {
                sent: sent.into(),
                message: message.to_string(),
            },
        );
        self
    }

    pub fn with_workspace(mut self, id: &str, name: &str) -> Self {
        self.workspaces.push(Workspace {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_space(mut self, workspace_id: &str, space: Space) -> Self {
        self.spaces
            .entry(workspace_id.to_string())
            .or_default()
            .push(space);
        self
    }

    pub fn with_folder(mut self, space_id: &str, folder: Folder) -> Self {
        self.folders
            .entry(space_id.to_string())
            .or_default()
            .push(folder);
        self
    }

    /// Register a list under a folder id, or under a space id for
    /// folderless lists.
    pub fn with_list(mut self, container_id: &str, list: List) -> Self {
        self.lists
            .entry(container_id.to_string())
            .or_default()
            .push(list);
        self
    }

    /// Every call made so far, as `method:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        let prefix = format!("{method}:");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    pub fn created_comments(&self) -> Vec<(String, String)> {
        self.created_comments.lock().unwrap().clone()
    }

    /// Uploaded files as `(task id, file name, content)`.
    pub fn uploads(&self) -> Vec<(String, String, Bytes)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().unwrap().get(task_id).cloned()
    }

    /// Registered tasks passing `keep`, sorted by id. Everything fits on
    /// page 0; later pages are empty.
    fn matching_tasks(&self, page: u32, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        if page > 0 {
            return Vec::new();
        }
        let mut found: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| keep(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    fn record(&self, method: &str, arg: &str) {
        self.calls.lock().unwrap().push(format!("{method}:{arg}"));
    }
}

#[async_trait]
impl ClickUpService for MockService {
    async fn get_task(&self, task_id: &str, include_subtasks: bool) -> Result<Task, ServiceError> {
        self.record("get_task", task_id);
        let key = self.aliases.get(task_id).map(String::as_str).unwrap_or(task_id);
        let mut task = self
            .tasks
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("task {task_id}")))?;
        if !include_subtasks {
            task.subtasks = None;
        }
        Ok(task)
    }

    async fn create_task(&self, list_id: &str, input: &CreateTask) -> Result<Task, ServiceError> {
        self.record("create_task", list_id);
        if input.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("Task name invalid".into()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        let id = format!("new-{}", tasks.len() + 1);
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": input.name,
            "description": input.description,
            "status": input.status.as_ref().map(|s| serde_json::json!({"status": s})),
            "parent": input.parent,
            "list": {"id": list_id},
        }))
        .map_err(|e| ServiceError::Decode(e.to_string()))?;
        tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        self.record("update_task", task_id);
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {task_id}")))?;
        if let Some(ref name) = update.name {
            task.name = name.clone();
        }
        if let Some(ref description) = update.description {
            task.description = Some(description.clone());
        }
        if let Some(ref status) = update.status {
            task.status = Some(clickup_core::TaskStatus {
                status: status.clone(),
                color: None,
                kind: None,
            });
        }
        Ok(task.clone())
    }

    async fn list_tasks(&self, list_id: &str, page: u32) -> Result<Vec<Task>, ServiceError> {
        self.record("list_tasks", list_id);
        Ok(self.matching_tasks(page, |t| {
            t.list.as_ref().map(|l| l.id.as_str()) == Some(list_id)
        }))
    }

    async fn search_tasks(
        &self,
        workspace_id: &str,
        query: &str,
        page: u32,
    ) -> Result<Vec<Task>, ServiceError> {
        self.record("search_tasks", workspace_id);
        let needle = query.to_lowercase();
        Ok(self.matching_tasks(page, |t| {
            t.team_id.as_deref() == Some(workspace_id) && t.name.to_lowercase().contains(&needle)
        }))
    }

    async fn get_task_comments(&self, task_id: &str) -> Result<Vec<RawComment>, ServiceError> {
        self.record("get_task_comments", task_id);
        match self.comments.get(task_id) {
            Some(Ok(comments)) => Ok(comments.clone()),
            Some(Err(msg)) => Err(ServiceError::Transport(msg.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn get_comment_replies(&self, comment_id: &str) -> Result<ReplyEnvelope, ServiceError> {
        self.record("get_comment_replies", comment_id);
        match self.replies.get(comment_id) {
            Some(Ok(body)) => serde_json::from_value(body.clone())
                .map_err(|e| ServiceError::Decode(format!("json decode: {e}"))),
            Some(Err(msg)) => Err(ServiceError::Transport(msg.clone())),
            None => Ok(ReplyEnvelope::Bare(Vec::new())),
        }
    }

    async fn create_task_comment(
        &self,
        task_id: &str,
        comment_text: &str,
    ) -> Result<CreatedComment, ServiceError> {
        self.record("create_task_comment", task_id);
        let mut created = self.created_comments.lock().unwrap();
        created.push((task_id.to_string(), comment_text.to_string()));
        Ok(CreatedComment {
            id: format!("{}", 1000 + created.len()),
            hist_id: None,
            date: None,
        })
    }

    async fn download_attachment(&self, url: &str) -> Result<ByteStream, ServiceError> {
        self.record("download_attachment", url);
        match self.downloads.get(url) {
            Some(MockDownload::Complete(data)) => Ok(stream::iter([Ok(data.clone())]).boxed()),
            Some(MockDownload::Refused(msg)) => Err(ServiceError::Transport(msg.clone())),
            Some(MockDownload::Interrupted { sent, message }) => Ok(stream::iter([
                Ok(sent.clone()),
                Err(ServiceError::Transport(message.clone())),
            ])
            .boxed()),
            None => Err(ServiceError::NotFound(url.to_string())),
        }
    }

    async fn upload_attachment(
        &self,
        task_id: &str,
        file_name: &str,
        content: Bytes,
    ) -> Result<TaskAttachment, ServiceError> {
        self.record("upload_attachment", task_id);
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {task_id}")))?;
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((task_id.to_string(), file_name.to_string(), content.clone()));
        let id = format!("att-{}", uploads.len());
        let attachment = TaskAttachment {
            url: format!("https://attachments.example/{id}/{file_name}"),
            id,
            title: file_name.to_string(),
            extension: file_name.rsplit_once('.').map(|(_, ext)| ext.to_string()),
            size: Some(content.len().to_string()),
            date: None,
        };
        task.attachments.push(attachment.clone());
        Ok(attachment)
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ServiceError> {
        self.record("list_workspaces", "");
        Ok(self.workspaces.clone())
    }

    async fn list_spaces(&self, workspace_id: &str) -> Result<Vec<Space>, ServiceError> {
        self.record("list_spaces", workspace_id);
        Ok(self.spaces.get(workspace_id).cloned().unwrap_or_default())
    }

    async fn list_folders(&self, space_id: &str) -> Result<Vec<Folder>, ServiceError> {
        self.record("list_folders", space_id);
        Ok(self.folders.get(space_id).cloned().unwrap_or_default())
    }

    async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>, ServiceError> {
        self.record("list_lists", folder_id);
        Ok(self.lists.get(folder_id).cloned().unwrap_or_default())
    }

    async fn list_folderless_lists(&self, space_id: &str) -> Result<Vec<List>, ServiceError> {
        self.record("list_folderless_lists", space_id);
        Ok(self.lists.get(space_id).cloned().unwrap_or_default())
    }
}
