//! Task aggregation pipeline: one task id in, a self-contained view of the
//! task, its comment threads, hierarchy and attachments out.

pub mod aggregate;
pub mod attachments;
pub mod comments;
mod error;
pub mod summary;

pub use aggregate::{
    aggregate_task, download_task_attachments, AggregateOptions, AggregateResult, TaskDownloads,
};
pub use attachments::{download_attachments, DownloadOptions, DownloadOutcome, DownloadResult};
pub use comments::resolve_comments;
pub use error::AggregateError;
