use rusqlite::Row;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{field_set::Payload, Error, Result};

pub type UserId = i64;

/// Public view of a user; the password hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
}

impl<'a> TryFrom<&Row<'a>> for User {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'a>) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
        })
    }
}

/// Task counts for the dashboard, relative to the moment of the query.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub completed: u32,
    pub pending: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthMessage {
    pub success: bool,
    pub message: String,
}

impl AuthMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Login never fails with an error status for bad credentials; `success` says it all.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn accepted(user_id: UserId) -> Self {
        Self {
            success: true,
            user_id: Some(user_id),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            user_id: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signup {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl TryFrom<&Payload> for Signup {
    type Error = Error;

    fn try_from(payload: &Payload) -> Result<Self> {
        match (
            payload.required_text(&["fullName", "full_name"]),
            payload.required_text(&["email"]),
            payload.required_text(&["password"]),
        ) {
            (Some(full_name), Some(email), Some(password)) => Ok(Self {
                full_name: full_name.trim().to_owned(),
                email: email.trim().to_owned(),
                password,
            }),
            _ => Err(Error::bad_request("All fields are required")),
        }
    }
}

#[derive(Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl TryFrom<&Payload> for Login {
    type Error = Error;

    fn try_from(payload: &Payload) -> Result<Self> {
        match (payload.required_text(&["email"]), payload.required_text(&["password"])) {
            (Some(email), Some(password)) => Ok(Self {
                email: email.trim().to_owned(),
                password,
            }),
            _ => Err(Error::bad_request("Email and password are required")),
        }
    }
}

#[derive(Clone)]
pub struct ResetPassword {
    pub user_id: UserId,
    pub old_password: String,
    pub new_password: String,
}

impl TryFrom<&Payload> for ResetPassword {
    type Error = Error;

    fn try_from(payload: &Payload) -> Result<Self> {
        match (
            payload.id(&["userId", "user_id"]),
            payload.required_text(&["oldPassword", "old_password"]),
            payload.required_text(&["newPassword", "new_password"]),
        ) {
            (Some(user_id), Some(old_password), Some(new_password)) => Ok(Self {
                user_id,
                old_password,
                new_password,
            }),
            _ => Err(Error::bad_request("All fields are required")),
        }
    }
}
