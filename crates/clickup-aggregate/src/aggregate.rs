use std::path::PathBuf;

use clickup_core::comment::Comment;
use clickup_core::hierarchy::{extract_hierarchy, Hierarchy};
use clickup_core::task::Task;
use clickup_service::ClickUpService;
use serde::Serialize;
use tracing::{info, warn};

use crate::attachments::{
    download_attachments, task_dir, DownloadOptions, DownloadResult, DEFAULT_CONCURRENCY,
};
use crate::comments::resolve_comments;
use crate::summary::{render_summary, AttachmentSection};
use crate::AggregateError;

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub download_attachments: bool,
    pub output_dir: PathBuf,
    pub include_subtasks: bool,
    pub resolve_replies: bool,
    /// Bound on concurrent reply fetches and on concurrent downloads.
    pub concurrency: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            download_attachments: true,
            output_dir: PathBuf::from("./downloads"),
            include_subtasks: true,
            resolve_replies: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl AggregateOptions {
    fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            output_dir: self.output_dir.clone(),
            concurrency: self.concurrency,
        }
    }
}

/// Self-contained view of one task, built fresh for every call.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub task: Task,
    pub comments: Vec<Comment>,
    pub hierarchy: Hierarchy,
    pub downloads: Vec<DownloadResult>,
    /// Recoverable problems that have no inline slot in the result.
    pub warnings: Vec<String>,
    pub summary: String,
}

/// Assemble the complete view of a task.
///
/// The task fetch is the only fatal step. Comment threads and attachment
/// downloads start once it succeeds and run concurrently; their failures are
/// recorded in the result.
pub async fn aggregate_task<S>(
    service: &S,
    task_id: &str,
    options: &AggregateOptions,
) -> Result<AggregateResult, AggregateError>
where
    S: ClickUpService + ?Sized,
{
    let mut task = service
        .get_task(task_id, options.include_subtasks)
        .await
        .map_err(|source| AggregateError::TaskFetch {
            task_id: task_id.to_string(),
            source,
        })?;
    info!(task_id, name = %task.name, "fetched task");
    if options.include_subtasks && task.subtasks.is_none() {
        // the API omits the key when there are none
        task.subtasks = Some(Vec::new());
    }

    let download_options = options.download_options();
    let (comments, downloads) = tokio::join!(
        resolve_comments(service, &task.id, options.resolve_replies, options.concurrency),
        download_attachments(
            service,
            &task.id,
            &task.attachments,
            options.download_attachments,
            &download_options,
        ),
    );

    let mut warnings = Vec::new();
    let (comments, comment_error) = match comments {
        Ok(comments) => (comments, None),
        Err(e) => {
            warn!(task_id, "comment fetch failed: {e}");
            warnings.push(format!("comments unavailable: {e}"));
            (Vec::new(), Some(e.to_string()))
        }
    };
    for failed in downloads.iter().filter(|d| !d.is_success()) {
        warnings.push(format!(
            "attachment {} not downloaded: {}",
            failed.file_name,
            failed.error().unwrap_or("unknown error")
        ));
    }

    let extracted = extract_hierarchy(&task);
    if task.subtasks.is_some() {
        task.subtasks = Some(extracted.subtasks);
    }

    let attachment_section = if options.download_attachments {
        AttachmentSection::Downloaded(&downloads)
    } else {
        AttachmentSection::Remote(&task.attachments)
    };
    let summary = render_summary(
        &task,
        &extracted.hierarchy,
        &comments,
        comment_error.as_deref(),
        attachment_section,
    );

    Ok(AggregateResult {
        task,
        comments,
        hierarchy: extracted.hierarchy,
        downloads,
        warnings,
        summary,
    })
}

/// Attachments of one task as saved on disk.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDownloads {
    /// Id of the task record, which may differ from the id it was requested by.
    pub task_id: String,
    pub directory: PathBuf,
    pub downloads: Vec<DownloadResult>,
}

/// Fetch a task and download all of its attachments.
pub async fn download_task_attachments<S>(
    service: &S,
    task_id: &str,
    options: &DownloadOptions,
) -> Result<TaskDownloads, AggregateError>
where
    S: ClickUpService + ?Sized,
{
    let task = service
        .get_task(task_id, false)
        .await
        .map_err(|source| AggregateError::TaskFetch {
            task_id: task_id.to_string(),
            source,
        })?;
    let downloads =
        download_attachments(service, &task.id, &task.attachments, true, options).await;
    Ok(TaskDownloads {
        directory: task_dir(&options.output_dir, &task.id),
        task_id: task.id,
        downloads,
    })
}
