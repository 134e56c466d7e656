use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, ListQuery, UpdateTaskRequest},
    repo::TaskRepo,
    repo_types::{NewTask, Status, Task, TaskFilter, TaskPatch},
};
use crate::{auth::AuthUser, error::ApiError};

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;

fn validate_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".into()));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ApiError::Validation(format!(
            "Title must be at most {TITLE_MAX} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(raw: &str) -> Result<String, ApiError> {
    let description = raw.trim();
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(ApiError::Validation(format!(
            "Description must be at most {DESCRIPTION_MAX} characters"
        )));
    }
    Ok(description.to_string())
}

fn parse_due_date(raw: &str) -> Result<OffsetDateTime, ApiError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| ApiError::Validation("Invalid date format".into()))
}

/// Malformed ids are a client error; well-formed but unknown ids are NotFound later.
pub fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid task ID".into()))
}

pub fn validate_new(req: CreateTaskRequest) -> Result<NewTask, ApiError> {
    Ok(NewTask {
        title: validate_title(&req.title)?,
        description: req.description.as_deref().map(validate_description).transpose()?,
        priority: req.priority.unwrap_or_default(),
        status: req.status.unwrap_or_default(),
        due_date: req.due_date.as_deref().map(parse_due_date).transpose()?,
    })
}

/// `null` is only meaningful for clearable fields.
fn not_null<T>(field: Option<Option<T>>, name: &str) -> Result<Option<T>, ApiError> {
    match field {
        Some(None) => Err(ApiError::Validation(format!("{name} cannot be null"))),
        Some(Some(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}

pub fn validate_patch(req: UpdateTaskRequest) -> Result<TaskPatch, ApiError> {
    Ok(TaskPatch {
        title: not_null(req.title, "Title")?
            .as_deref()
            .map(validate_title)
            .transpose()?,
        description: req
            .description
            .map(|d| d.as_deref().map(validate_description).transpose())
            .transpose()?,
        priority: not_null(req.priority, "Priority")?,
        status: not_null(req.status, "Status")?,
        due_date: req
            .due_date
            .map(|d| d.as_deref().map(parse_due_date).transpose())
            .transpose()?,
    })
}

pub fn filter_from_query(q: ListQuery) -> Result<TaskFilter, ApiError> {
    let status = match q.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<Status>()
                .map_err(|_| ApiError::Validation("Invalid status value".into()))?,
        ),
    };
    let search = q.search.filter(|s| !s.is_empty());
    Ok(TaskFilter { status, search })
}

pub async fn create(repo: &dyn TaskRepo, user: &AuthUser, req: CreateTaskRequest) -> Result<Task, ApiError> {
    let new = validate_new(req)?;
    let task = repo.create(user.id, new).await?;
    info!(user_id = %user.id, task_id = %task.id, "task created");
    Ok(task)
}

pub async fn list(repo: &dyn TaskRepo, user: &AuthUser, q: ListQuery) -> Result<Vec<Task>, ApiError> {
    let filter = filter_from_query(q)?;
    let tasks = repo.list(user.id, &filter).await?;
    debug!(user_id = %user.id, count = tasks.len(), "tasks listed");
    Ok(tasks)
}

pub async fn get(repo: &dyn TaskRepo, user: &AuthUser, id: &str) -> Result<Task, ApiError> {
    let id = parse_task_id(id)?;
    repo.find(id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))
}

pub async fn update(
    repo: &dyn TaskRepo,
    user: &AuthUser,
    id: &str,
    req: UpdateTaskRequest,
) -> Result<Task, ApiError> {
    let id = parse_task_id(id)?;
    let patch = validate_patch(req)?;
    let task = repo
        .update(id, user.id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    info!(user_id = %user.id, task_id = %task.id, "task updated");
    Ok(task)
}

pub async fn delete(repo: &dyn TaskRepo, user: &AuthUser, id: &str) -> Result<Task, ApiError> {
    let id = parse_task_id(id)?;
    let task = repo
        .delete(id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    info!(user_id = %user.id, task_id = %task.id, "task deleted");
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{
        repo::MemoryTaskRepo,
        repo_types::Priority,
    };

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
        }
    }

    fn create_req(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.into(),
            description: None,
            priority: None,
            status: None,
            due_date: None,
        }
    }

    #[test]
    fn title_rules() {
        assert!(matches!(validate_title("   "), Err(ApiError::Validation(_))));
        assert_eq!(validate_title("  Buy milk ").unwrap(), "Buy milk");
        assert!(validate_title(&"a".repeat(200)).is_ok());
        assert!(validate_title(&"a".repeat(201)).is_err());
        // counted in characters, not bytes
        assert!(validate_title(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn description_limit() {
        assert!(validate_description(&"d".repeat(1000)).is_ok());
        assert!(validate_description(&"d".repeat(1001)).is_err());
    }

    #[test]
    fn due_date_must_be_rfc3339() {
        assert!(parse_due_date("2025-03-01T12:00:00Z").is_ok());
        assert!(parse_due_date("2025-03-01T12:00:00+02:00").is_ok());
        assert!(parse_due_date("next tuesday").is_err());
        assert!(parse_due_date("2025-03-01").is_err());
    }

    #[test]
    fn task_id_parsing() {
        assert!(matches!(parse_task_id("not-an-id"), Err(ApiError::Validation(_))));
        assert!(parse_task_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn list_query_rules() {
        let f = filter_from_query(ListQuery {
            status: Some("inprogress".into()),
            search: Some("".into()),
        })
        .unwrap();
        assert_eq!(f.status, Some(Status::InProgress));
        assert_eq!(f.search, None);

        // whitespace is a literal term, not "no filter"
        let f = filter_from_query(ListQuery {
            status: None,
            search: Some(" ".into()),
        })
        .unwrap();
        assert_eq!(f.search.as_deref(), Some(" "));

        assert!(filter_from_query(ListQuery { status: Some("".into()), search: None })
            .unwrap()
            .status
            .is_none());

        let err = filter_from_query(ListQuery {
            status: Some("archived".into()),
            search: None,
        })
        .unwrap_err();
        assert_eq!(err.public_message(), "Invalid status value");
    }

    #[test]
    fn patch_keeps_null_vs_absent() {
        let patch = validate_patch(UpdateTaskRequest {
            description: Some(None),
            due_date: Some(Some("2030-01-01T00:00:00Z".into())),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.description, Some(None));
        assert!(matches!(patch.due_date, Some(Some(_))));
        assert!(patch.title.is_none());

        assert!(validate_patch(UpdateTaskRequest {
            title: Some(Some("".into())),
            ..Default::default()
        })
        .is_err());

        for req in [
            UpdateTaskRequest {
                title: Some(None),
                ..Default::default()
            },
            UpdateTaskRequest {
                priority: Some(None),
                ..Default::default()
            },
            UpdateTaskRequest {
                status: Some(None),
                ..Default::default()
            },
        ] {
            let err = validate_patch(req).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "got {err:?}");
            assert!(err.public_message().ends_with("cannot be null"));
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_owner() {
        let repo = MemoryTaskRepo::new();
        let u = user();
        let task = create(&repo, &u, create_req("Buy milk")).await.unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.user_id, u.id);

        let fetched = get(&repo, &u, &task.id.to_string()).await.unwrap();
        assert_eq!(fetched, task);
    }

    #[tokio::test]
    async fn other_users_see_not_found() {
        let repo = MemoryTaskRepo::new();
        let owner = user();
        let intruder = user();
        let task = create(&repo, &owner, create_req("private")).await.unwrap();
        let id = task.id.to_string();

        assert!(matches!(get(&repo, &intruder, &id).await, Err(ApiError::NotFound(_))));
        assert!(matches!(
            update(&repo, &intruder, &id, UpdateTaskRequest::default()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(delete(&repo, &intruder, &id).await, Err(ApiError::NotFound(_))));
        assert!(get(&repo, &owner, &id).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_malformed_is_validation() {
        let repo = MemoryTaskRepo::new();
        let u = user();
        assert!(matches!(
            get(&repo, &u, &Uuid::new_v4().to_string()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(get(&repo, &u, "not-an-id").await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn status_can_move_freely() {
        let repo = MemoryTaskRepo::new();
        let u = user();
        let id = create(&repo, &u, create_req("t")).await.unwrap().id.to_string();
        for s in [Status::Done, Status::Todo, Status::InProgress, Status::Done, Status::Todo] {
            let t = update(
                &repo,
                &u,
                &id,
                UpdateTaskRequest {
                    status: Some(Some(s)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert_eq!(t.status, s);
        }
    }
}
