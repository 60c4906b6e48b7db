use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use clickup_core::comment::{CommentsEnvelope, CreatedComment, RawComment, ReplyEnvelope};
use clickup_core::task::{CreateTask, Task, TaskAttachment, TasksEnvelope, UpdateTask};
use clickup_core::workspace::{
    Folder, FoldersEnvelope, List, ListsEnvelope, Space, SpacesEnvelope, Workspace,
    WorkspacesEnvelope,
};
use futures::{StreamExt, TryStreamExt};
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::{ByteStream, ClickUpService, ServiceError};

pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Async HTTP client implementation of ClickUpService.
///
/// Constructed once at startup and shared by reference; it holds the API
/// token and a pooled reqwest client.
///
/// The configured timeout bounds each API call as a whole. Attachment
/// transfers can be large, so downloads and uploads are bounded per phase
/// instead: connecting and every read must finish within the timeout, but a
/// transfer that keeps making progress may take as long as it needs.
pub struct HttpService {
    base_url: String,
    client: Client,
    api_token: String,
    timeout: Duration,
}

impl HttpService {
    pub fn new(base_url: &str, api_token: String) -> Result<Self, ServiceError> {
        Self::with_timeout(base_url, api_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        api_token: String,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("build client: {e}")))?;
        Ok(Self {
            base_url,
            client,
            api_token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        // ClickUp personal tokens go in the header verbatim, no Bearer prefix.
        builder.header("Authorization", self.api_token.as_str())
    }

    /// Authenticate an API request and cap its total duration.
    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        self.authorized(builder).timeout(self.timeout)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        debug!("GET {path}");
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(resp).await
    }

    async fn post_json<B: serde::Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        debug!("POST {path}");
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(resp).await
    }

    async fn put_json<B: serde::Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        debug!("PUT {path}");
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(resp).await
    }
}

/// Escape an id for use as a single path segment.
fn seg(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout(e.to_string())
    } else {
        ServiceError::Transport(e.to_string())
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(format!("json decode: {e}")))
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }
}

/// Map a non-success response to a ServiceError. ClickUp reports failures
/// as `{"err": "...", "ECODE": "..."}`.
fn error_for_status(status: StatusCode, body: &str) -> ServiceError {
    let msg = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["err"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(msg),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(msg),
        StatusCode::BAD_REQUEST => ServiceError::InvalidInput(msg),
        _ => ServiceError::Api {
            status: status.as_u16(),
            message: msg,
        },
    }
}

#[async_trait]
impl ClickUpService for HttpService {
    async fn get_task(&self, task_id: &str, include_subtasks: bool) -> Result<Task, ServiceError> {
        self.get_json(&format!(
            "/task/{}?include_subtasks={include_subtasks}",
            seg(task_id)
        ))
        .await
    }

    async fn create_task(&self, list_id: &str, input: &CreateTask) -> Result<Task, ServiceError> {
        self.post_json(&format!("/list/{}/task", seg(list_id)), input)
            .await
    }

    async fn update_task(
        &self,
        task_id: &str,
        update: &UpdateTask,
    ) -> Result<Task, ServiceError> {
        self.put_json(&format!("/task/{}", seg(task_id)), update).await
    }

    async fn list_tasks(&self, list_id: &str, page: u32) -> Result<Vec<Task>, ServiceError> {
        let env: TasksEnvelope = self
            .get_json(&format!("/list/{}/task?page={page}", seg(list_id)))
            .await?;
        Ok(env.tasks)
    }

    async fn search_tasks(
        &self,
        workspace_id: &str,
        query: &str,
        page: u32,
    ) -> Result<Vec<Task>, ServiceError> {
        let env: TasksEnvelope = self
            .get_json(&format!(
                "/team/{}/task?page={page}&search_text={}",
                seg(workspace_id),
                urlencoding::encode(query)
            ))
            .await?;
        Ok(env.tasks)
    }

    async fn get_task_comments(&self, task_id: &str) -> Result<Vec<RawComment>, ServiceError> {
        let env: CommentsEnvelope = self
            .get_json(&format!("/task/{}/comment", seg(task_id)))
            .await?;
        Ok(env.comments)
    }

    async fn get_comment_replies(&self, comment_id: &str) -> Result<ReplyEnvelope, ServiceError> {
        self.get_json(&format!("/comment/{}/reply", seg(comment_id)))
            .await
    }

    async fn create_task_comment(
        &self,
        task_id: &str,
        comment_text: &str,
    ) -> Result<CreatedComment, ServiceError> {
        self.post_json(
            &format!("/task/{}/comment", seg(task_id)),
            &serde_json::json!({ "comment_text": comment_text }),
        )
        .await
    }

    async fn download_attachment(&self, url: &str) -> Result<ByteStream, ServiceError> {
        // Attachment URLs point at the CDN and are pre-signed; the API token
        // is not sent along.
        debug!("GET {url}");
        let resp = self.client.get(url).send().await.map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }
        Ok(resp.bytes_stream().map_err(transport_error).boxed())
    }

    async fn upload_attachment(
        &self,
        task_id: &str,
        file_name: &str,
        content: Bytes,
    ) -> Result<TaskAttachment, ServiceError> {
        let path = format!("/task/{}/attachment", seg(task_id));
        debug!("POST {path} ({} bytes)", content.len());
        let part = Part::bytes(Vec::from(content)).file_name(file_name.to_string());
        let form = Form::new().part("attachment", part);
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .multipart(form);
        let resp = self
            .authorized(builder)
            .send()
            .await
            .map_err(transport_error)?;
        handle_response(resp).await
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, ServiceError> {
        let env: WorkspacesEnvelope = self.get_json("/team").await?;
        Ok(env.teams)
    }

    async fn list_spaces(&self, workspace_id: &str) -> Result<Vec<Space>, ServiceError> {
        let env: SpacesEnvelope = self
            .get_json(&format!("/team/{}/space", seg(workspace_id)))
            .await?;
        Ok(env.spaces)
    }

    async fn list_folders(&self, space_id: &str) -> Result<Vec<Folder>, ServiceError> {
        let env: FoldersEnvelope = self
            .get_json(&format!("/space/{}/folder", seg(space_id)))
            .await?;
        Ok(env.folders)
    }

    async fn list_lists(&self, folder_id: &str) -> Result<Vec<List>, ServiceError> {
        let env: ListsEnvelope = self
            .get_json(&format!("/folder/{}/list", seg(folder_id)))
            .await?;
        Ok(env.lists)
    }

    async fn list_folderless_lists(&self, space_id: &str) -> Result<Vec<List>, ServiceError> {
        let env: ListsEnvelope = self
            .get_json(&format!("/space/{}/list", seg(space_id)))
            .await?;
        Ok(env.lists)
    }
}
