use rusqlite::{params, Row};
use sea_query::Iden;

use crate::{
    ctx::BaseParams,
    db,
    field_set::{FieldSet, FieldSpec, Payload},
    users::UserId,
    Error, Result,
};

use super::{CreateNote, Note, NoteId};

#[derive(Iden, Clone, Copy)]
pub enum Notes {
    Table,
    Id,
    Title,
    Content,
    CreationDate,
    IsPinned,
    UserId,
}

/// Columns a PATCH may touch.
const NOTE_FIELDS: &[FieldSpec<Notes>] = &[
    FieldSpec::text(Notes::Title, &["title"]),
    FieldSpec::text(Notes::Content, &["content"]),
    FieldSpec::flag(Notes::IsPinned, &["isPinned", "is_pinned"]),
];

impl<'a> TryFrom<&Row<'a>> for Note {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            creation_date: row.get(3)?,
            is_pinned: row.get(4)?,
            user_id: row.get(5)?,
        })
    }
}

pub async fn find_notes(user_id: UserId, BaseParams { db }: BaseParams) -> Result<Vec<Note>> {
    db.call(move |conn| {
        let notes = conn
            .prepare(
                "SELECT id, title, content, creation_date, is_pinned, user_id FROM notes WHERE user_id = ? ORDER BY id",
            )?
            .query_map(params![user_id], |row| Note::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn create_note(
    CreateNote {
        title,
        content,
        creation_date,
        is_pinned,
        user_id,
    }: CreateNote,
    BaseParams { db }: BaseParams,
) -> Result<Note> {
    let creation_date = creation_date.unwrap_or_else(chrono::Utc::now);
    db.call(move |conn| {
        conn.query_row(
            r#"INSERT INTO notes (title, content, creation_date, is_pinned, user_id) VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, content, creation_date, is_pinned, user_id"#,
            params![title, content, creation_date, is_pinned, user_id],
            |row| Note::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

/// Applies the qualifying fields of `payload`, then reads the row back.
pub async fn update_note(note_id: NoteId, payload: Payload, BaseParams { db }: BaseParams) -> Result<Note> {
    let fields = FieldSet::build(note_id, &payload, NOTE_FIELDS)?;

    db.call(move |conn| {
        if fields.execute(conn, Notes::Table, Notes::Id)? == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows.into());
        }

        conn.query_row(
            "SELECT id, title, content, creation_date, is_pinned, user_id FROM notes WHERE id = ?",
            params![note_id],
            |row| Note::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Note not found"))
    .map_err(Error::from)
}

pub async fn delete_note(note_id: NoteId, BaseParams { db }: BaseParams) -> Result<()> {
    db.call(move |conn| {
        match conn.execute("DELETE FROM notes WHERE id = ?", params![note_id])? {
            0 => Err(rusqlite::Error::QueryReturnedNoRows.into()),
            _ => Ok(()),
        }
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("Note not found"))
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::init_test_db;

    async fn seed(db: &db::DB) {
        db.call(|conn| {
            conn.execute_batch(
                r#"
                INSERT INTO users (id, full_name, email, password) VALUES (1, 'Owner', 'owner@mail.com', 'x');
                INSERT INTO notes (id, title, content, creation_date, user_id) VALUES (10, 'first', 'one', '2024-01-01 00:00:00+00:00', 1);
                "#,
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }

    fn payload(value: serde_json::Value) -> Payload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn patch_changes_only_sent_fields() -> Result<()> {
        let db = init_test_db().await?;
        seed(&db).await;

        let note = update_note(10, payload(json!({ "is_pinned": true })), BaseParams::new(db.clone())).await?;
        assert!(note.is_pinned);
        assert_eq!(note.title, "first");
        assert_eq!(note.content, "one");

        let note = update_note(10, payload(json!({ "title": "" })), BaseParams::new(db)).await?;
        assert_eq!(note.title, "");
        assert!(note.is_pinned);
        Ok(())
    }

    #[tokio::test]
    async fn patch_is_idempotent() -> Result<()> {
        let db = init_test_db().await?;
        seed(&db).await;

        let body = json!({ "content": "two", "isPinned": true });
        let first = update_note(10, payload(body.clone()), BaseParams::new(db.clone())).await?;
        let second = update_note(10, payload(body), BaseParams::new(db)).await?;

        assert_eq!(
            serde_json::to_value(first).unwrap(),
            serde_json::to_value(second).unwrap()
        );
        Ok(())
    }

    #[tokio::test]
    async fn patch_unknown_note() -> Result<()> {
        let db = init_test_db().await?;
        let result = update_note(99, payload(json!({ "title": "x" })), BaseParams::new(db)).await;

        assert!(matches!(result, Err(Error::NotFound(message)) if message == "Note not found"));
        Ok(())
    }

    #[tokio::test]
    async fn notes_are_scoped_by_owner() -> Result<()> {
        let db = init_test_db().await?;
        seed(&db).await;

        assert_eq!(find_notes(1, BaseParams::new(db.clone())).await?.len(), 1);
        assert!(find_notes(2, BaseParams::new(db)).await?.is_empty());
        Ok(())
    }
}
