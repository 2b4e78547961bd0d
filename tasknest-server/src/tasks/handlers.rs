use rusqlite::{named_params, params, Row};
use sea_query::Iden;

use crate::{
    ctx::BaseParams,
    db,
    field_set::{FieldSet, FieldSpec, Payload},
    users::UserId,
    Error, Result,
};

use super::{CreateTask, Task, TaskId};

#[derive(Iden, Clone, Copy)]
pub enum Tasks {
    Table,
    Id,
    Title,
    Description,
    CreationDate,
    DueDate,
    Completed,
    IsPinned,
    Priority,
    Category,
    UserId,
}

const TASK_FIELDS: &[FieldSpec<Tasks>] = &[
    FieldSpec::text(Tasks::Title, &["title"]),
    FieldSpec::text(Tasks::Description, &["description"]),
    FieldSpec::flag(Tasks::Completed, &["completed"]),
    FieldSpec::date(Tasks::DueDate, &["dueDate", "due_date"]),
    FieldSpec::date(Tasks::CreationDate, &["creationDate", "creation_date"]),
    FieldSpec::flag(Tasks::IsPinned, &["isPinned", "is_pinned"]),
    FieldSpec::text(Tasks::Priority, &["priority"]),
    FieldSpec::text(Tasks::Category, &["category"]),
];

impl<'a> TryFrom<&Row<'a>> for Task {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            creation_date: row.get(3)?,
            due_date: row.get(4)?,
            completed: row.get(5)?,
            is_pinned: row.get(6)?,
            priority: row.get(7)?,
            category: row.get(8)?,
            user_id: row.get(9)?,
        })
    }
}

pub async fn find_tasks(user_id: UserId, BaseParams { db }: BaseParams) -> Result<Vec<Task>> {
    db.call(move |conn| {
        let tasks = conn
            .prepare(
                r#"SELECT id, title, description, creation_date, due_date, completed, is_pinned, priority, category, user_id
                FROM tasks WHERE user_id = ? ORDER BY id"#,
            )?
            .query_map(params![user_id], |row| Task::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn create_task(args: CreateTask, BaseParams { db }: BaseParams) -> Result<Task> {
    let creation_date = args.creation_date.unwrap_or_else(chrono::Utc::now);
    db.call(move |conn| {
        conn.query_row(
            r#"INSERT INTO tasks (title, description, creation_date, due_date, completed, is_pinned, priority, category, user_id)
            VALUES (:title, :description, :creation_date, :due_date, :completed, :is_pinned, :priority, :category, :user_id)
            RETURNING id, title, description, creation_date, due_date, completed, is_pinned, priority, category, user_id"#,
            named_params! {
                ":title": args.title,
                ":description": args.description,
                ":creation_date": creation_date,
                ":due_date": args.due_date,
                ":completed": args.completed,
                ":is_pinned": args.is_pinned,
                ":priority": args.priority,
                ":category": args.category,
                ":user_id": args.user_id,
            },
            |row| Task::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

/// Applies the qualifying fields of `payload`, then reads the row back.
pub async fn update_task(task_id: TaskId, payload: Payload, BaseParams { db }: BaseParams) -> Result<Task> {
    let fields = FieldSet::build(task_id, &payload, TASK_FIELDS)?;

    db.call(move |conn| {
        if fields.execute(conn, Tasks::Table, Tasks::Id)? == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows.into());
        }

        conn.query_row(
            r#"SELECT id, title, description, creation_date, due_date, completed, is_pinned, priority, category, user_id
            FROM tasks WHERE id = ?"#,
            params![task_id],
            |row| Task::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Task not found"))
    .map_err(Error::from)
}

pub async fn delete_task(task_id: TaskId, BaseParams { db }: BaseParams) -> Result<()> {
    db.call(move |conn| {
        match conn.execute("DELETE FROM tasks WHERE id = ?", params![task_id])? {
            0 => Err(rusqlite::Error::QueryReturnedNoRows.into()),
            _ => Ok(()),
        }
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Task not found"))
    .map_err(Error::from)
}
