use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{field_set::Payload, users::UserId, Error, Result};

pub type TaskId = i64;

pub const DEFAULT_PRIORITY: &str = "Medium";
pub const DEFAULT_CATEGORY: &str = "Personal";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub creation_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub is_pinned: bool,
    /// `Low`, `Medium` or `High`.
    pub priority: String,
    pub category: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self { success: true, task }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub is_pinned: bool,
    pub priority: String,
    pub category: String,
    pub user_id: UserId,
}

impl TryFrom<&Payload> for CreateTask {
    type Error = Error;

    fn try_from(payload: &Payload) -> Result<Self> {
        let title = payload
            .required_text(&["title"])
            .ok_or_else(|| Error::bad_request("Title is required"))?;
        let user_id = payload
            .id(&["userId", "user_id"])
            .ok_or_else(|| Error::bad_request("User id is required"))?;

        Ok(Self {
            title,
            description: payload.text(&["description"]).unwrap_or_default(),
            creation_date: payload.date(&["creationDate", "creation_date"])?,
            due_date: payload.date(&["dueDate", "due_date"])?,
            completed: payload.flag(&["completed"]).unwrap_or(false),
            is_pinned: payload.flag(&["isPinned", "is_pinned"]).unwrap_or(false),
            priority: payload
                .required_text(&["priority"])
                .unwrap_or_else(|| DEFAULT_PRIORITY.into()),
            category: payload
                .required_text(&["category"])
                .unwrap_or_else(|| DEFAULT_CATEGORY.into()),
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn create_defaults() {
        let payload: Payload = serde_json::from_value(json!({ "title": "Write", "user_id": 3, "priority": "" })).unwrap();
        let task = CreateTask::try_from(&payload).unwrap();

        assert_eq!(task.priority, "Medium");
        assert_eq!(task.category, "Personal");
        assert_eq!(task.description, "");
        assert!(task.due_date.is_none());
        assert!(!task.completed && !task.is_pinned);
    }

    #[test]
    fn title_is_required() {
        let payload: Payload = serde_json::from_value(json!({ "title": "  ", "userId": 3 })).unwrap();

        assert!(matches!(
            CreateTask::try_from(&payload),
            Err(Error::BadRequest(message)) if message == "Title is required"
        ));
    }
}
