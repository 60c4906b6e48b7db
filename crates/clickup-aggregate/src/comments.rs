use clickup_core::comment::{Comment, Reply, ReplyThread};
use clickup_service::{ClickUpService, ServiceError};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Fetch the top-level comments of a task and, when `resolve_replies` is
/// set, the reply thread of each one.
///
/// Comments and replies keep the order the remote service returned them in.
/// Reply threads are fetched concurrently, at most `concurrency` at a time.
/// A failed thread resolves to `ReplyThread::Empty` and never affects its
/// siblings; only a failure of the top-level fetch is returned as an error.
pub async fn resolve_comments<S>(
    service: &S,
    task_id: &str,
    resolve_replies: bool,
    concurrency: usize,
) -> Result<Vec<Comment>, ServiceError>
where
    S: ClickUpService + ?Sized,
{
    let raw = service.get_task_comments(task_id).await?;
    debug!(task_id, count = raw.len(), "fetched comments");

    if !resolve_replies || raw.is_empty() {
        return Ok(raw
            .into_iter()
            .map(|c| Comment::from_raw(c, ReplyThread::NotAttempted))
            .collect());
    }

    let comments = stream::iter(raw)
        .map(|comment| async move {
            let thread = resolve_thread(service, &comment.id).await;
            Comment::from_raw(comment, thread)
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(comments)
}

async fn resolve_thread<S>(service: &S, comment_id: &str) -> ReplyThread
where
    S: ClickUpService + ?Sized,
{
    match service.get_comment_replies(comment_id).await {
        Ok(envelope) => ReplyThread::resolved(
            envelope
                .into_comments()
                .into_iter()
                .map(|raw| Reply::from_raw(raw, comment_id))
                .collect(),
        ),
        Err(e) => {
            warn!(comment_id, "reply fetch failed, treating thread as empty: {e}");
            ReplyThread::Empty
        }
    }
}
