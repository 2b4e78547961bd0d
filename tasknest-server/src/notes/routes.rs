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

use super::{handlers, CreateNote, Note, NoteResponse};

/// Owner id on `GET`, note id on `PATCH` and `DELETE`.
#[derive(Debug, Deserialize, JsonSchema)]
struct IdPath {
    id: i64,
}

pub fn router(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/notes",
            post_with(create_note, |t| t.response::<201, Json<NoteResponse>>()),
        )
        .api_route(
            "/notes/{id}",
            get_with(find_notes, |t| t.description("Notes owned by the given user"))
                .patch(update_note)
                .delete_with(delete_note, |t| t.response::<204, ()>()),
        )
        .with_state(state)
}

async fn find_notes(Path(IdPath { id }): Path<IdPath>, NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::find_notes(id, base).await.map(Json::<Vec<Note>>)
}

async fn create_note(NoApi(base): NoApi<BaseParams>, Json(payload): Json<Payload>) -> impl IntoApiResponse {
    let result: Result<_> = async {
        let args = CreateNote::try_from(&payload)?;
        handlers::create_note(args, base).await
    }
    .await;

    result.map(|note| (StatusCode::CREATED, Json(NoteResponse::from(note))))
}

async fn update_note(
    Path(IdPath { id }): Path<IdPath>,
    NoApi(base): NoApi<BaseParams>,
    Json(payload): Json<Payload>,
) -> impl IntoApiResponse {
    handlers::update_note(id, payload, base)
        .await
        .map(|note| Json(NoteResponse::from(note)))
}

async fn delete_note(Path(IdPath { id }): Path<IdPath>, NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::delete_note(id, base)
        .await
        .map(|_| NoApi(StatusCode::NO_CONTENT))
}
