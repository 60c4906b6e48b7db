pub mod comment;
pub mod hierarchy;
pub mod task;
pub mod wire;
pub mod workspace;

pub use comment::{Comment, CreatedComment, RawComment, Reply, ReplyEnvelope, ReplyThread, User};
pub use hierarchy::{extract_hierarchy, ExtractedHierarchy, Hierarchy};
pub use task::{CreateTask, Task, TaskAttachment, TaskStatus, UpdateTask};
pub use workspace::{Folder, List, Space, Workspace};
