//! Markdown rendering of an aggregated task.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use clickup_core::comment::{Comment, Reply, User};
use clickup_core::hierarchy::Hierarchy;
use clickup_core::task::{Task, TaskAttachment};

use crate::attachments::DownloadResult;

pub const NO_COMMENTS: &str = "No comments found for this task.";
const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// What the attachments section should list.
#[derive(Debug, Clone, Copy)]
pub enum AttachmentSection<'a> {
    /// Downloads were attempted; list local paths and failures.
    Downloaded(&'a [DownloadResult]),
    /// Downloads were skipped; list the remote URLs.
    Remote(&'a [TaskAttachment]),
}

pub fn render_summary(
    task: &Task,
    hierarchy: &Hierarchy,
    comments: &[Comment],
    comment_error: Option<&str>,
    attachments: AttachmentSection<'_>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}", task.name);
    out.push('\n');
    let _ = writeln!(out, "- **ID:** {}", task.id);
    let _ = writeln!(out, "- **Status:** {}", task.status_name());
    let _ = writeln!(out, "- **Created:** {}", format_timestamp(task.date_created.as_deref()));
    let _ = writeln!(out, "- **Updated:** {}", format_timestamp(task.date_updated.as_deref()));
    if let Some(ref url) = task.url {
        let _ = writeln!(out, "- **URL:** {url}");
    }

    out.push_str("\n## Hierarchy\n\n");
    out.push_str(&render_hierarchy(hierarchy));

    out.push_str("\n## Description\n\n");
    out.push_str(task.description_text().unwrap_or("No description provided."));
    out.push('\n');

    if let Some(ref subtasks) = task.subtasks {
        let _ = writeln!(out, "\n## Subtasks ({})\n", subtasks.len());
        if subtasks.is_empty() {
            out.push_str("No subtasks.\n");
        }
        for subtask in subtasks {
            let _ = writeln!(
                out,
                "- **{}** (`{}`) [{}]",
                subtask.name,
                subtask.id,
                subtask.status_name()
            );
            if let Some(desc) = subtask.description_text() {
                let _ = writeln!(out, "  {}", truncate(desc.trim(), DESCRIPTION_PREVIEW_CHARS));
            }
        }
    }

    let _ = writeln!(out, "\n## Comments ({})\n", comments.len());
    match comment_error {
        Some(err) => {
            let _ = writeln!(out, "Comments could not be loaded: {err}");
        }
        None => {
            out.push_str(&render_comments(comments));
            out.push('\n');
        }
    }

    out.push_str(&render_attachments(attachments));
    out
}

/// Every hierarchy field on its own line, placeholders for absent values.
pub fn render_hierarchy(h: &Hierarchy) -> String {
    let subtasks = if h.subtask_ids.is_empty() {
        "None".to_string()
    } else {
        h.subtask_ids.join(", ")
    };
    format!(
        "- **Workspace:** {}\n- **Folder:** {}\n- **List:** {}\n- **Parent task:** {}\n- **Subtasks:** {}\n",
        h.workspace_id.as_deref().unwrap_or("None"),
        h.folder_id.as_deref().unwrap_or("None"),
        h.list_id.as_deref().unwrap_or("None"),
        h.parent_task_id.as_deref().unwrap_or("None (top-level task)"),
        subtasks,
    )
}

/// Comment thread body: each comment followed by its indented replies,
/// comments separated by a horizontal rule.
pub fn render_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return NO_COMMENTS.to_string();
    }
    comments
        .iter()
        .map(render_comment)
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

fn render_comment(comment: &Comment) -> String {
    let mut out = format!(
        "**{}** ({}):\n{}\n",
        author(comment.user.as_ref()),
        format_timestamp(comment.date.as_deref()),
        comment.text.trim_end()
    );
    let replies = comment.thread.replies();
    if !replies.is_empty() {
        out.push('\n');
        for reply in replies {
            out.push_str(&render_reply(reply));
        }
    }
    out
}

fn render_reply(reply: &Reply) -> String {
    let mut out = format!(
        "    ↳ **{}** ({}):\n",
        author(reply.user.as_ref()),
        format_timestamp(reply.date.as_deref())
    );
    for line in reply.text.trim_end().lines() {
        let _ = writeln!(out, "      {line}");
    }
    out
}

fn render_attachments(section: AttachmentSection<'_>) -> String {
    let mut out = String::new();
    match section {
        AttachmentSection::Downloaded(results) => {
            let _ = writeln!(out, "\n## Attachments ({})\n", results.len());
            if results.is_empty() {
                out.push_str("No attachments.\n");
            }
            for r in results {
                match (r.file_path(), r.error()) {
                    (Some(path), _) => {
                        let _ = writeln!(out, "- {}: {}", r.file_name, path.display());
                    }
                    (None, err) => {
                        let _ = writeln!(
                            out,
                            "- {}: download failed ({})",
                            r.file_name,
                            err.unwrap_or("unknown error")
                        );
                    }
                }
            }
        }
        AttachmentSection::Remote(attachments) => {
            let _ = writeln!(out, "\n## Attachments ({})\n", attachments.len());
            if attachments.is_empty() {
                out.push_str("No attachments.\n");
            }
            for a in attachments {
                let _ = writeln!(out, "- {}: {}", a.title, a.url);
            }
        }
    }
    out
}

fn author(user: Option<&User>) -> &str {
    user.map(User::display_name).unwrap_or("Unknown user")
}

/// Render an epoch-milliseconds string as UTC. Anything that does not parse
/// is shown as-is.
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "Unknown".to_string();
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
