use crate::{
    ctx::BaseParams,
    field_set::Payload,
    openapi::{
        aide::{
            axum::{
                routing::{get, post, post_with},
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

use super::{handlers, AuthMessage, Login, ResetPassword, Signup, UserId};

#[derive(Debug, Deserialize, JsonSchema)]
struct UserIdPath {
    id: UserId,
}

pub fn router(state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route("/users", get(find_users))
        .api_route("/users/{id}", get(get_user))
        .api_route("/users/summary/{id}", get(get_summary))
        .api_route(
            "/users/signup",
            post_with(signup, |t| t.response::<201, Json<AuthMessage>>()),
        )
        .api_route("/users/login", post(login))
        .api_route("/user/resetpassword", post(reset_password))
        .with_state(state)
}

async fn find_users(NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::find_users(base).await.map(Json)
}

async fn get_user(Path(UserIdPath { id }): Path<UserIdPath>, NoApi(base): NoApi<BaseParams>) -> impl IntoApiResponse {
    handlers::get_user(id, base).await.map(Json)
}

async fn get_summary(
    Path(UserIdPath { id }): Path<UserIdPath>,
    NoApi(base): NoApi<BaseParams>,
) -> impl IntoApiResponse {
    handlers::summary(id, base).await.map(Json)
}

async fn signup(NoApi(base): NoApi<BaseParams>, Json(payload): Json<Payload>) -> impl IntoApiResponse {
    let result: Result<_> = async {
        let args = Signup::try_from(&payload)?;
        handlers::signup(args, base).await
    }
    .await;

    result.map(|_| {
        (
            StatusCode::CREATED,
            Json(AuthMessage::ok("User registered successfully")),
        )
    })
}

async fn login(NoApi(base): NoApi<BaseParams>, Json(payload): Json<Payload>) -> impl IntoApiResponse {
    let result: Result<_> = async {
        let args = Login::try_from(&payload)?;
        handlers::login(args, base).await
    }
    .await;

    result.map(Json)
}

async fn reset_password(NoApi(base): NoApi<BaseParams>, Json(payload): Json<Payload>) -> impl IntoApiResponse {
    let result: Result<_> = async {
        let args = ResetPassword::try_from(&payload)?;
        handlers::reset_password(args, base).await
    }
    .await;

    result.map(|_| Json(AuthMessage::ok("Password updated")))
}

#[cfg(test)]
mod tests {
    use crate::{
        db::{init_test_db, DB},
        errors::Result,
        users::{LoginResponse, Summary, User},
    };
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn signup(server: &TestServer, email: &str) {
        server
            .post("/users/signup")
            .json(&json!({
                "full_name": "Grace Hopper",
                "email": email,
                "password": "cobol"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    #[tokio::test]
    async fn signup_and_login() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        signup(&server, "grace@mail.com").await;

        let response = server
            .post("/users/login")
            .json(&json!({ "email": "grace@mail.com", "password": "cobol" }))
            .await;

        assert_eq!(response.status_code(), 200);
        let body = response.json::<LoginResponse>();
        assert!(body.success);
        assert!(body.user_id.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn signup_with_taken_email() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db.clone()).await?;

        signup(&server, "grace@mail.com").await;

        let response = server
            .post("/users/signup")
            .json(&json!({
                "full_name": "Someone Else",
                "email": "grace@mail.com",
                "password": "other"
            }))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), 400);
        let body = response.json::<Value>();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Email already in use"));

        let count = db
            .call(|conn| {
                conn.query_row::<u32, _, _>("SELECT count(*) FROM users", [], |r| r.get(0))
                    .map_err(|e| e.into())
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn signup_with_missing_fields() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        let response = server
            .post("/users/signup")
            .json(&json!({ "email": "grace@mail.com", "password": "" }))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["message"], json!("All fields are required"));
        Ok(())
    }

    #[tokio::test]
    async fn login_with_wrong_password() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        signup(&server, "grace@mail.com").await;

        let response = server
            .post("/users/login")
            .json(&json!({ "email": "grace@mail.com", "password": "fortran" }))
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(
            response.json::<Value>(),
            json!({ "success": false, "message": "Wrong password" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn login_with_unknown_email() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        let response = server
            .post("/users/login")
            .json(&json!({ "email": "nobody@mail.com", "password": "x" }))
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.json::<LoginResponse>().message.as_deref(), Some("User not found"));
        Ok(())
    }

    #[tokio::test]
    async fn login_without_credentials() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        let response = server
            .post("/users/login")
            .json(&json!({ "email": "grace@mail.com" }))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), 400);
        assert_eq!(response.json::<Value>()["message"], json!("Email and password are required"));
        Ok(())
    }

    #[tokio::test]
    async fn list_and_get_users() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        signup(&server, "grace@mail.com").await;
        signup(&server, "ada@mail.com").await;

        let users = server.get("/users").await.json::<Vec<User>>();
        assert_eq!(users.len(), 2);

        let response = server.get(&format!("/users/{}", users[1].id)).await;
        let body = response.json::<Value>();
        assert_eq!(body["email"], json!("ada@mail.com"));
        assert_eq!(body["fullName"], json!("Grace Hopper"));
        assert!(body.get("password").is_none());

        server.get("/users/999").expect_failure().await.assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn summary_for_user_without_tasks() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        signup(&server, "grace@mail.com").await;

        let summary = server.get("/users/summary/1").await.json::<Summary>();
        assert_eq!(summary, Summary::default());
        Ok(())
    }

    #[tokio::test]
    async fn reset_password() -> Result<()> {
        let db = init_test_db().await?;
        let server = test_server(db).await?;

        signup(&server, "grace@mail.com").await;

        server
            .post("/user/resetpassword")
            .json(&json!({ "user_id": 1, "old_password": "basic", "new_password": "lisp" }))
            .expect_failure()
            .await
            .assert_status_unauthorized();

        server
            .post("/user/resetpassword")
            .json(&json!({ "user_id": 1, "old_password": "cobol", "new_password": "lisp" }))
            .await
            .assert_status_ok();

        let body = server
            .post("/users/login")
            .json(&json!({ "email": "grace@mail.com", "password": "lisp" }))
            .await
            .json::<LoginResponse>();
        assert!(body.success);
        Ok(())
    }

    async fn test_server(db: DB) -> Result<TestServer> {
        crate::tests::test_server(db, super::router).await
    }
}
