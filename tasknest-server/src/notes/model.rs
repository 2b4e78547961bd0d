use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{field_set::Payload, users::UserId, Error, Result};

pub type NoteId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub creation_date: DateTime<Utc>,
    pub is_pinned: bool,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NoteResponse {
    pub success: bool,
    pub note: Note,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self { success: true, note }
    }
}

#[derive(Debug, Clone)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub is_pinned: bool,
    pub user_id: UserId,
}

impl TryFrom<&Payload> for CreateNote {
    type Error = Error;

    fn try_from(payload: &Payload) -> Result<Self> {
        let user_id = payload
            .id(&["userId", "user_id"])
            .ok_or_else(|| Error::bad_request("User id is required"))?;

        Ok(Self {
            title: payload.text(&["title"]).unwrap_or_default(),
            content: payload.text(&["content"]).unwrap_or_default(),
            creation_date: payload.date(&["creationDate", "creation_date"])?,
            is_pinned: payload.flag(&["isPinned", "is_pinned"]).unwrap_or(false),
            user_id,
        })
    }
}
