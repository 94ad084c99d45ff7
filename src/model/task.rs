use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskType {
    pub id: String,

    pub name: String,

    /// Display order; lower comes first
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    pub name: String,

    pub entity_id: String,

    pub project_id: String,

    pub task_type_id: String,

    /// Ids of the people assigned to the task
    #[serde(default)]
    pub assignees: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_assigned_to(&self, person_id: &str) -> bool {
        self.assignees.iter().any(|assignee| assignee == person_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewFile {
    pub id: String,

    pub name: String,

    pub task_id: String,

    pub task_type_id: String,

    #[serde(default)]
    pub revision: u32,

    #[serde(default)]
    pub extension: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
