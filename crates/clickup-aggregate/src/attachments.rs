use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clickup_core::task::TaskAttachment;
use clickup_service::{ByteStream, ClickUpService};
use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Root directory; each task gets its own `task_<id>` subdirectory.
    pub output_dir: PathBuf,
    /// Upper bound on simultaneous downloads.
    pub concurrency: usize,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./downloads"),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Saved { file_path: PathBuf },
    Failed { error: String },
}

impl Serialize for DownloadOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DownloadOutcome", 2)?;
        match self {
            DownloadOutcome::Saved { file_path } => {
                s.serialize_field("success", &true)?;
                s.serialize_field("file_path", file_path)?;
            }
            DownloadOutcome::Failed { error } => {
                s.serialize_field("success", &false)?;
                s.serialize_field("error", error)?;
            }
        }
        s.end()
    }
}

/// Result of one attempted attachment download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadResult {
    pub attachment_id: String,
    /// Attachment title as uploaded.
    pub file_name: String,
    #[serde(flatten)]
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Saved { .. })
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.outcome {
            DownloadOutcome::Saved { file_path } => Some(file_path),
            DownloadOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DownloadOutcome::Saved { .. } => None,
            DownloadOutcome::Failed { error } => Some(error),
        }
    }

    fn failed(attachment: &TaskAttachment, error: String) -> Self {
        Self {
            attachment_id: attachment.id.clone(),
            file_name: attachment.title.clone(),
            outcome: DownloadOutcome::Failed { error },
        }
    }
}

/// Directory that holds the downloads of one task.
pub fn task_dir(output_dir: &Path, task_id: &str) -> PathBuf {
    output_dir.join(format!("task_{}", sanitize_component(task_id)))
}

/// Download every attachment of a task into `output_dir/task_<id>`.
///
/// Returns exactly one result per attachment, in no particular order, or
/// nothing at all when `should_download` is false or there is nothing to
/// fetch (in which case no directory is created either). Individual
/// failures are reported in their result and never cancel other downloads.
pub async fn download_attachments<S>(
    service: &S,
    task_id: &str,
    attachments: &[TaskAttachment],
    should_download: bool,
    options: &DownloadOptions,
) -> Vec<DownloadResult>
where
    S: ClickUpService + ?Sized,
{
    if !should_download || attachments.is_empty() {
        return Vec::new();
    }

    let dir = task_dir(&options.output_dir, task_id);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        let error = format!("create directory {}: {e}", dir.display());
        warn!(task_id, "{error}");
        return attachments
            .iter()
            .map(|a| DownloadResult::failed(a, error.clone()))
            .collect();
    }

    let names = plan_file_names(attachments);
    let jobs = attachments.iter().zip(names).map(|(a, name)| (a, dir.join(name)));

    let results: Vec<DownloadResult> = stream::iter(jobs)
        .map(|(attachment, path)| download_one(service, attachment, path))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    let saved = results.iter().filter(|r| r.is_success()).count();
    info!(
        task_id,
        saved,
        failed = results.len() - saved,
        "attachment downloads finished"
    );
    results
}

async fn download_one<S>(service: &S, attachment: &TaskAttachment, path: PathBuf) -> DownloadResult
where
    S: ClickUpService + ?Sized,
{
    let body = match service.download_attachment(&attachment.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(attachment_id = %attachment.id, "download failed: {e}");
            return DownloadResult::failed(attachment, e.to_string());
        }
    };
    let written = match save_stream(&path, body).await {
        Ok(written) => written,
        Err(error) => {
            warn!(attachment_id = %attachment.id, "download failed: {error}");
            // no half-written files left behind
            let _ = tokio::fs::remove_file(&path).await;
            return DownloadResult::failed(attachment, error);
        }
    };
    debug!(attachment_id = %attachment.id, bytes = written, "saved {}", path.display());
    DownloadResult {
        attachment_id: attachment.id.clone(),
        file_name: attachment.title.clone(),
        outcome: DownloadOutcome::Saved { file_path: path },
    }
}

/// Copy the body into `path` chunk by chunk, returning the byte count.
async fn save_stream(path: &Path, mut body: ByteStream) -> Result<u64, String> {
    let write_err = |e: std::io::Error| format!("write {}: {e}", path.display());
    let mut file = tokio::fs::File::create(path).await.map_err(write_err)?;
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;
    Ok(written)
}

/// Local file name for each attachment, in input order.
///
/// The first attachment to claim a name keeps it; later ones that decode to
/// the same name are prefixed with their attachment id.
pub fn plan_file_names(attachments: &[TaskAttachment]) -> Vec<String> {
    let mut taken = HashSet::new();
    attachments
        .iter()
        .map(|attachment| {
            let base = attachment_file_name(attachment);
            let mut name = base.clone();
            if taken.contains(&name) {
                name = format!("{}_{base}", sanitize_component(&attachment.id));
            }
            let mut n = 2;
            while taken.contains(&name) {
                name = format!("{}_{n}_{base}", sanitize_component(&attachment.id));
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Percent-decoded basename of the attachment URL, falling back to the
/// title and then the id when the URL has no usable last segment.
pub fn attachment_file_name(attachment: &TaskAttachment) -> String {
    let from_url = url::Url::parse(&attachment.url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(String::from))
        })
        .or_else(|| {
            // not an absolute URL; take whatever follows the last slash
            let path = attachment.url.split(['?', '#']).next().unwrap_or("");
            path.rsplit('/').next().map(String::from)
        })
        .map(|segment| {
            urlencoding::decode(&segment)
                .map(|s| s.into_owned())
                .unwrap_or(segment)
        })
        .map(|decoded| sanitize_component(&decoded))
        .filter(|name| !name.is_empty());

    from_url
        .or_else(|| Some(sanitize_component(&attachment.title)).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| format!("attachment_{}", sanitize_component(&attachment.id)))
}

/// Reduce a decoded name to a single safe path component.
fn sanitize_component(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().all(|c| c == '.') {
        String::new()
    } else {
        trimmed.to_string()
    }
}
