use clickup_service::ServiceError;
use thiserror::Error;

/// Failures that abort a whole aggregation call. Everything else is
/// recorded inline in the result.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to fetch task {task_id}: {source}")]
    TaskFetch {
        task_id: String,
        #[source]
        source: ServiceError,
    },
}
