use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire;

/// Workflow status as configured on the containing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status)
    }
}

/// Reference to a containing list, folder, or space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttachment {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(
        default,
        deserialize_with = "wire::opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<String>,
    #[serde(
        default,
        deserialize_with = "wire::opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
}

/// A task record as returned by `GET task/{id}`.
///
/// Only the fields the aggregation pipeline reads are modelled; the rest
/// of the payload is dropped on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub date_created: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub date_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub list: Option<ContainerRef>,
    #[serde(default)]
    pub folder: Option<ContainerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<ContainerRef>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Task>>,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub attachments: Vec<TaskAttachment>,
}

impl Task {
    pub fn status_name(&self) -> &str {
        self.status.as_ref().map(|s| s.status.as_str()).unwrap_or("unknown")
    }

    /// Description text, preferring the rendered markdown field and
    /// falling back to the plain-text content.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| self.text_content.as_deref().filter(|d| !d.trim().is_empty()))
    }
}

/// Response envelope for `GET list/{id}/task` and `GET team/{id}/task`.
#[derive(Debug, Clone, Deserialize)]
pub struct TasksEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub last_page: Option<bool>,
}

/// Body for `POST list/{id}/task`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Body for `PUT task/{id}`. Absent fields are left unchanged remotely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}
