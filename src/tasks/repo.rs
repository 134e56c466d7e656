use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{NewTask, Task, TaskFilter, TaskPatch, TaskRow};

/// Task store. Every lookup and write is keyed by `(id, owner)`: a task owned
/// by someone else behaves exactly like a task that does not exist.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task>;

    /// Owner's tasks matching `filter`, newest first.
    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> anyhow::Result<Vec<Task>>;

    async fn find(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>>;

    async fn update(&self, id: Uuid, owner: Uuid, patch: TaskPatch) -> anyhow::Result<Option<Task>>;

    /// Removes the task and returns it as it was.
    async fn delete(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>>;
}

const TASK_COLUMNS: &str =
    "id, user_id, title, description, priority, status, due_date, created_at, updated_at";

#[derive(Clone)]
pub struct PgTaskRepo {
    db: PgPool,
}

impl PgTaskRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, user_id, title, description, priority, status, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.due_date)
        .fetch_one(&self.db)
        .await
        .context("insert task")?;
        row.try_into()
    }

    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> anyhow::Result<Vec<Task>> {
        // strpos keeps the search a literal substring match
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL
                   OR strpos(lower(title), lower($3)) > 0
                   OR strpos(lower(coalesce(description, '')), lower($3)) > 0)
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.search.as_deref())
        .fetch_all(&self.db)
        .await
        .context("list tasks")?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn find(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("find task")?;
        row.map(Task::try_from).transpose()
    }

    async fn update(&self, id: Uuid, owner: Uuid, patch: TaskPatch) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET
                title       = COALESCE($3::text, title),
                description = CASE WHEN $4 THEN $5::text ELSE description END,
                priority    = COALESCE($6::text, priority),
                status      = COALESCE($7::text, status),
                due_date    = CASE WHEN $8 THEN $9::timestamptz ELSE due_date END,
                updated_at  = now()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(patch.title.as_deref())
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.priority.map(|p| p.as_str()))
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.due_date.is_some())
        .bind(patch.due_date.flatten())
        .fetch_optional(&self.db)
        .await
        .context("update task")?;
        row.map(Task::try_from).transpose()
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            DELETE FROM tasks
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("delete task")?;
        row.map(Task::try_from).transpose()
    }
}

/// Process-local task store, kept in insertion order.
#[derive(Default)]
pub struct MemoryTaskRepo {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepo for MemoryTaskRepo {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            user_id: owner,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> anyhow::Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut out: Vec<Task> = tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == owner && filter.matches(t))
            .cloned()
            .collect();
        // stable: equal timestamps keep newest-inserted first
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == id && t.user_id == owner)
            .cloned())
    }

    async fn update(&self, id: Uuid, owner: Uuid, patch: TaskPatch) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id && t.user_id == owner) else {
            return Ok(None);
        };
        patch.apply(task);
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid, owner: Uuid) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let pos = tasks.iter().position(|t| t.id == id && t.user_id == owner);
        Ok(pos.map(|i| tasks.remove(i)))
    }
}
