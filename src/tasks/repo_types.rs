use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err("Priority must be one of: low, medium, high".into()),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status. Any transition is allowed, `done` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inprogress",
            Status::Done => "done",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Status::Todo),
            "inprogress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err("Status must be one of: todo, inprogress, done".into()),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub priority: Priority,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Raw `tasks` row; enum columns are stored as text.
#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<TaskRow> for Task {
    type Error = anyhow::Error;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            user_id: r.user_id,
            priority: r.priority.parse().map_err(anyhow::Error::msg)?,
            status: r.status.parse().map_err(anyhow::Error::msg)?,
            due_date: r.due_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated input for a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: Status,
    pub due_date: Option<OffsetDateTime>,
}

/// Validated partial update. `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due_date: Option<Option<OffsetDateTime>>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Owner-scoped listing filter.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                task.title.to_lowercase().contains(&term)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, description: Option<&str>, status: Status) -> Task {
        let now = OffsetDateTime::now_utc();
        Task {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.map(str::to_string),
            user_id: Uuid::new_v4(),
            priority: Priority::Medium,
            status,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"inprogress\"");
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let s: Status = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(s, Status::Done);
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let err = serde_json::from_str::<Status>("\"archived\"").unwrap_err();
        assert!(err.to_string().contains("todo, inprogress, done"));
        assert!("Todo".parse::<Status>().is_err());
        assert!(serde_json::from_str::<Priority>("\"urgent\"").is_err());
    }

    #[test]
    fn defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Status::default(), Status::Todo);
    }

    #[test]
    fn filter_search_is_case_insensitive_over_title_or_description() {
        let t = task("Buy milk", Some("From the CORNER shop"), Status::Todo);
        let by = |s: &str| TaskFilter {
            status: None,
            search: Some(s.into()),
        };
        assert!(by("MILK").matches(&t));
        assert!(by("corner").matches(&t));
        assert!(!by("bread").matches(&t));
        assert!(by(".*").matches(&task("regex .* literal", None, Status::Todo)));
        assert!(!by(".*").matches(&t));
    }

    #[test]
    fn filter_status_is_exact() {
        let t = task("a", None, Status::InProgress);
        for s in Status::ALL {
            let f = TaskFilter {
                status: Some(s),
                search: None,
            };
            assert_eq!(f.matches(&t), s == Status::InProgress);
        }
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut t = task("a", Some("desc"), Status::Todo);
        t.due_date = Some(OffsetDateTime::now_utc());
        let before = t.clone();
        TaskPatch {
            status: Some(Status::Done),
            description: Some(None),
            ..Default::default()
        }
        .apply(&mut t);
        assert_eq!(t.status, Status::Done);
        assert_eq!(t.description, None);
        assert_eq!(t.title, before.title);
        assert_eq!(t.priority, before.priority);
        assert_eq!(t.due_date, before.due_date);
    }

    #[test]
    fn row_with_unknown_status_is_an_error() {
        let now = OffsetDateTime::now_utc();
        let row = TaskRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "t".into(),
            description: None,
            priority: "medium".into(),
            status: "blocked".into(),
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Task::try_from(row).is_err());
    }
}
