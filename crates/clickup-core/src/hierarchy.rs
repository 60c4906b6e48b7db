use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Structural position of a task. Every field is always serialized;
/// absent references are `null` and a leaf task has `subtask_ids: []`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub workspace_id: Option<String>,
    pub folder_id: Option<String>,
    pub list_id: Option<String>,
    pub parent_task_id: Option<String>,
    pub subtask_ids: Vec<String>,
}

impl Hierarchy {
    pub fn is_top_level(&self) -> bool {
        self.parent_task_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedHierarchy {
    pub hierarchy: Hierarchy,
    /// Copies of the task's subtasks with `parent` filled in where the
    /// remote record left it empty.
    pub subtasks: Vec<Task>,
}

/// Derive the hierarchy of `task`. Pure and infallible.
pub fn extract_hierarchy(task: &Task) -> ExtractedHierarchy {
    let subtasks: Vec<Task> = task
        .subtasks
        .iter()
        .flatten()
        .map(|subtask| {
            let mut subtask = subtask.clone();
            if subtask.parent.is_none() {
                subtask.parent = Some(task.id.clone());
            }
            subtask
        })
        .collect();

    let hierarchy = Hierarchy {
        workspace_id: task.team_id.clone(),
        folder_id: task.folder.as_ref().map(|f| f.id.clone()),
        list_id: task.list.as_ref().map(|l| l.id.clone()),
        parent_task_id: task.parent.clone(),
        subtask_ids: subtasks.iter().map(|s| s.id.clone()).collect(),
    };

    ExtractedHierarchy {
        hierarchy,
        subtasks,
    }
}
