use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::{Priority, Status, Task};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due_date: Option<String>,
}

/// Partial update body. An absent key leaves the field alone; an explicit
/// `null` clears `description` / `dueDate` and is rejected for the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub priority: Option<Option<Priority>>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Option<Option<Status>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
}

fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub count: usize,
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_absent_from_null() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.description, None);
        assert_eq!(absent.due_date, None);

        let cleared: UpdateTaskRequest =
            serde_json::from_str(r#"{"description":null,"dueDate":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"description":"d","status":"done"}"#).unwrap();
        assert_eq!(set.description, Some(Some("d".into())));
        assert_eq!(set.status, Some(Some(Status::Done)));
        assert_eq!(set.title, None);

        let nulls: UpdateTaskRequest =
            serde_json::from_str(r#"{"title":null,"priority":null,"status":null}"#).unwrap();
        assert_eq!(nulls.title, Some(None));
        assert_eq!(nulls.priority, Some(None));
        assert_eq!(nulls.status, Some(None));
    }

    #[test]
    fn create_rejects_unknown_priority() {
        let err = serde_json::from_str::<CreateTaskRequest>(r#"{"title":"x","priority":"urgent"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("low, medium, high"));
    }
}
