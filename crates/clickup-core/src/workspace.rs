//! Containers above the task level: workspace (team) > space > folder > list.

use serde::{Deserialize, Serialize};

use crate::wire;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "wire::opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkspacesEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub teams: Vec<Workspace>,
}

#[derive(Debug, Deserialize)]
pub struct SpacesEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub spaces: Vec<Space>,
}

#[derive(Debug, Deserialize)]
pub struct FoldersEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub folders: Vec<Folder>,
}

#[derive(Debug, Deserialize)]
pub struct ListsEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub lists: Vec<List>,
}
