use std::future::Future;

use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    model::{normalize_all, Note, NoteChanges, RowId, Summary, Task, TaskChanges, User, UserId},
    ClientConfig, Error, Result,
};

/// The Tasknest REST surface as seen by [`crate::DataSync`].
///
/// Row-returning calls hand back normalized rows; a rejected login is [`Error::Rejected`].
pub trait Api: Send + Sync {
    fn signup(&self, full_name: &str, email: &str, password: &str) -> impl Future<Output = Result<()>> + Send;
    fn login(&self, email: &str, password: &str) -> impl Future<Output = Result<UserId>> + Send;
    fn reset_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn user(&self, user_id: UserId) -> impl Future<Output = Result<User>> + Send;
    fn summary(&self, user_id: UserId) -> impl Future<Output = Result<Summary>> + Send;

    fn fetch_notes(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Note>>> + Send;
    fn create_note(&self, draft: &Note) -> impl Future<Output = Result<Note>> + Send;
    fn update_note(&self, id: RowId, changes: &NoteChanges) -> impl Future<Output = Result<Note>> + Send;
    fn delete_note(&self, id: RowId) -> impl Future<Output = Result<()>> + Send;

    fn fetch_tasks(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Task>>> + Send;
    fn create_task(&self, draft: &Task) -> impl Future<Output = Result<Task>> + Send;
    fn update_task(&self, id: RowId, changes: &TaskChanges) -> impl Future<Output = Result<Task>> + Send;
    fn delete_task(&self, id: RowId) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("tasknest-client"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.api_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Deserialize)]
struct NoteEnvelope {
    note: Note,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    task: Task,
}

#[derive(Deserialize)]
struct AuthReply {
    success: bool,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginReply {
    success: bool,
    user_id: Option<UserId>,
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupBody<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody<'a> {
    user_id: UserId,
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateNoteBody<'a> {
    title: &'a str,
    content: &'a str,
    creation_date: Option<DateTime<Utc>>,
    is_pinned: bool,
    user_id: Option<UserId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskBody<'a> {
    title: &'a str,
    description: &'a str,
    creation_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    completed: bool,
    is_pinned: bool,
    priority: &'a str,
    category: &'a str,
    user_id: Option<UserId>,
}

/// Sends the request and turns any non-2xx answer into [`Error::Status`].
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_default();

    tracing::debug!(status = status.as_u16(), "request failed: {message}");

    Err(Error::Status {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    Ok(send(request).await?.json::<T>().await?)
}

/// `message` of an error body, if the body is one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

impl Api for HttpApi {
    async fn signup(&self, full_name: &str, email: &str, password: &str) -> Result<()> {
        let request = self.client.post(self.url("/users/signup")).json(&SignupBody {
            full_name,
            email,
            password,
        });

        match json::<AuthReply>(request).await? {
            AuthReply { success: true, .. } => Ok(()),
            AuthReply { message, .. } => Err(Error::Rejected(message.unwrap_or_else(|| "Signup failed".into()))),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<UserId> {
        let request = self
            .client
            .post(self.url("/users/login"))
            .json(&LoginBody { email, password });

        match json::<LoginReply>(request).await? {
            LoginReply {
                success: true,
                user_id: Some(user_id),
                ..
            } => Ok(user_id),
            LoginReply { message, .. } => Err(Error::Rejected(message.unwrap_or_else(|| "Auth failed".into()))),
        }
    }

    async fn reset_password(&self, user_id: UserId, old_password: &str, new_password: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("/user/resetpassword"))
            .json(&ResetPasswordBody {
                user_id,
                old_password,
                new_password,
            });

        match json::<AuthReply>(request).await? {
            AuthReply { success: true, .. } => Ok(()),
            AuthReply { message, .. } => Err(Error::Rejected(message.unwrap_or_default())),
        }
    }

    async fn user(&self, user_id: UserId) -> Result<User> {
        json(self.client.get(self.url(&format!("/users/{user_id}")))).await
    }

    async fn summary(&self, user_id: UserId) -> Result<Summary> {
        json(self.client.get(self.url(&format!("/users/summary/{user_id}")))).await
    }

    async fn fetch_notes(&self, user_id: UserId) -> Result<Vec<Note>> {
        let rows = json::<Vec<Value>>(self.client.get(self.url(&format!("/notes/{user_id}")))).await?;
        Ok(normalize_all(rows, Note::normalize))
    }

    async fn create_note(&self, draft: &Note) -> Result<Note> {
        let request = self.client.post(self.url("/notes")).json(&CreateNoteBody {
            title: &draft.title,
            content: &draft.content,
            creation_date: draft.creation_date,
            is_pinned: draft.is_pinned,
            user_id: draft.user_id,
        });

        Ok(json::<NoteEnvelope>(request).await?.note)
    }

    async fn update_note(&self, id: RowId, changes: &NoteChanges) -> Result<Note> {
        let request = self.client.patch(self.url(&format!("/notes/{id}"))).json(changes);
        Ok(json::<NoteEnvelope>(request).await?.note)
    }

    async fn delete_note(&self, id: RowId) -> Result<()> {
        send(self.client.delete(self.url(&format!("/notes/{id}")))).await?;
        Ok(())
    }

    async fn fetch_tasks(&self, user_id: UserId) -> Result<Vec<Task>> {
        let rows = json::<Vec<Value>>(self.client.get(self.url(&format!("/tasks/{user_id}")))).await?;
        Ok(normalize_all(rows, Task::normalize))
    }

    async fn create_task(&self, draft: &Task) -> Result<Task> {
        let request = self.client.post(self.url("/tasks")).json(&CreateTaskBody {
            title: &draft.title,
            description: &draft.description,
            creation_date: draft.creation_date,
            due_date: draft.due_date,
            completed: draft.completed,
            is_pinned: draft.is_pinned,
            priority: &draft.priority,
            category: &draft.category,
            user_id: draft.user_id,
        });

        Ok(json::<TaskEnvelope>(request).await?.task)
    }

    async fn update_task(&self, id: RowId, changes: &TaskChanges) -> Result<Task> {
        let request = self.client.patch(self.url(&format!("/tasks/{id}"))).json(changes);
        Ok(json::<TaskEnvelope>(request).await?.task)
    }

    async fn delete_task(&self, id: RowId) -> Result<()> {
        send(self.client.delete(self.url(&format!("/tasks/{id}")))).await?;
        Ok(())
    }
}
