use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// What needs to be done.
    pub description: String,
    /// Whether the task is finished.
    pub completed: bool,
    /// Identifier of the user who owns the task. Every read, update, and
    /// delete exposed to a client is scoped by this field.
    pub owner: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. The owner is always taken from the authenticated
/// caller; an `owner` field in the body is ignored along with any other
/// extra fields.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl TaskInput {
    pub fn normalize(&mut self) {
        self.description = self.description.trim().to_string();
    }
}

/// Update payload. Any field outside the {description, completed} whitelist
/// fails deserialization, rejecting the whole request.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskUpdate {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn normalize(&mut self) {
        if let Some(description) = &mut self.description {
            *description = description.trim().to_string();
        }
    }
}

/// Query parameters accepted by `GET /tasks`.
///
/// `completed` is a string flag: the literal `"true"` filters for finished
/// tasks, any other present value filters for unfinished ones, and an absent
/// parameter applies no filter. `limit` and `skip` are independently
/// optional; absent values place no bound.
#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Columns a task listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// The column name interpolated into `ORDER BY`. Restricting the set to
    /// these literals keeps the dynamically built query parameter-safe.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Description => "description",
            SortField::Completed => "completed",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

/// A parsed `sortBy=field:dir` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub descending: bool,
}

impl TaskSort {
    /// Parses `field:dir`. The direction token `desc` selects descending
    /// order; anything else, including an absent token, selects ascending.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, direction)) => (field, direction),
            None => (raw, ""),
        };

        let field = match field {
            "description" => SortField::Description,
            "completed" => SortField::Completed,
            "created_at" | "createdAt" => SortField::CreatedAt,
            "updated_at" | "updatedAt" => SortField::UpdatedAt,
            other => {
                return Err(AppError::BadRequest(format!(
                    "Cannot sort by \"{}\"",
                    other
                )))
            }
        };

        Ok(TaskSort {
            field,
            descending: direction == "desc",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_task_input_validation() {
        let mut valid: TaskInput = serde_json::from_str(r#"{"description": " buy milk "}"#).unwrap();
        valid.normalize();
        assert_eq!(valid.description, "buy milk");
        assert!(!valid.completed);
        assert!(valid.validate().is_ok());

        let mut blank: TaskInput = serde_json::from_str(r#"{"description": "   "}"#).unwrap();
        blank.normalize();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_task_input_ignores_supplied_owner() {
        // The owner in the body is dropped at deserialization; the handler
        // sets the owner from the authenticated caller.
        let input: TaskInput =
            serde_json::from_str(r#"{"description": "buy milk", "owner": 42}"#).unwrap();
        assert_eq!(input.description, "buy milk");
    }

    #[test]
    fn test_task_update_rejects_unknown_fields() {
        assert!(serde_json::from_str::<TaskUpdate>(r#"{"owner": "x"}"#).is_err());
        assert!(serde_json::from_str::<TaskUpdate>(r#"{"completed": true, "id": 1}"#).is_err());
        assert!(serde_json::from_str::<TaskUpdate>(r#"{"completed": true}"#).is_ok());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(
            TaskSort::parse("created_at:desc").unwrap(),
            TaskSort {
                field: SortField::CreatedAt,
                descending: true
            }
        );
        // The original API spelled columns in camelCase; both spellings work.
        assert_eq!(
            TaskSort::parse("createdAt:desc").unwrap(),
            TaskSort {
                field: SortField::CreatedAt,
                descending: true
            }
        );
        // Any direction other than "desc" is ascending.
        assert_eq!(
            TaskSort::parse("completed:upwards").unwrap(),
            TaskSort {
                field: SortField::Completed,
                descending: false
            }
        );
        assert_eq!(
            TaskSort::parse("description").unwrap(),
            TaskSort {
                field: SortField::Description,
                descending: false
            }
        );
        assert!(TaskSort::parse("owner:desc").is_err());
        assert!(TaskSort::parse("").is_err());
    }
}
