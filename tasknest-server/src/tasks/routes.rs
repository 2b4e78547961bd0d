use crate::{
    ctx::BaseParams,
    field_set::Payload,
    openapi::{
        aide::{
            axum::{
                routing::{get_with, post_with},
                ApiRouter, IntoApiResponse,
            },
            NoApi,
        },
        Json, Path,
    },
    state::AppState,
    Result,
};
use axum::http::StatusCode;

use schemars::JsonSchema;

use serde::Deserialize;

use super::{handlers, CreateTask, Task, TaskResponse};

/// Owner id on `GET`, task id on `PATCH` and `DELETE`.
#[derive(Debug, Deserialize, JsonSchema)]
struct IdPath {
    id: i64,
}

pub fn router(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/tasks",
            post_with(create_task, |t| t.response::<201, Json<TaskResponse>>()),
        )
        .api_route(
            "/tasks/{id}",
            get_with(find_tasks, |t| t.description("Tasks owned by the given user"))
                .patch(update_task)
                .delete_with(delete_task, |t| t.response::<204, ()>()),
        )
        .with_state(state)
}

async fn find_tasks(Path(IdPath { id }): Path<IdPath>, NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::find_tasks(id, base).await.map(Json::<Vec<Task>>)
}

async fn create_task(NoApi(base): NoApi<BaseParams>, Json(payload): Json<Payload>) -> impl IntoApiResponse {
    let result: Result<_> = async {
        let args = CreateTask::try_from(&payload)?;
        handlers::create_task(args, base).await
    }
    .await;

    result.map(|task| (StatusCode::CREATED, Json(TaskResponse::from(task))))
}

async fn update_task(
    Path(IdPath { id }): Path<IdPath>,
    NoApi(base): NoApi<BaseParams>,
    Json(payload): Json<Payload>,
) -> impl IntoApiResponse {
    handlers::update_task(id, payload, base)
        .await
        .map(|task| Json(TaskResponse::from(task)))
}

async fn delete_task(Path(IdPath { id }): Path<IdPath>, NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::delete_task(id, base)
        .await
        .map(|_| NoApi(StatusCode::NO_CONTENT))
}
