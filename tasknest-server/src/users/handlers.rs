use rusqlite::{named_params, params, OptionalExtension};

use crate::{ctx::BaseParams, db, Error, Result};

use super::{password, Login, LoginResponse, ResetPassword, Signup, Summary, User, UserId};

pub async fn find_users(BaseParams { db }: BaseParams) -> Result<Vec<User>> {
    db.call(|conn| {
        let users = conn
            .prepare("SELECT id, full_name, email FROM users ORDER BY id")?
            .query_map([], |row| User::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn get_user(user_id: UserId, BaseParams { db }: BaseParams) -> Result<User> {
    db.call(move |conn| {
        conn.query_row(
            "SELECT id, full_name, email FROM users WHERE id = ?",
            params![user_id],
            |row| User::try_from(row),
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(|e| e.not_found_message("User not found"))
    .map_err(Error::from)
}

pub async fn summary(user_id: UserId, BaseParams { db }: BaseParams) -> Result<Summary> {
    let now = chrono::Utc::now();
    db.call(move |conn| {
        conn.query_row(
            r#"SELECT
                COALESCE(SUM(completed), 0),
                COALESCE(SUM(NOT completed AND (due_date IS NULL OR due_date >= :now)), 0),
                COALESCE(SUM(NOT completed AND due_date < :now), 0)
            FROM tasks WHERE user_id = :user_id"#,
            named_params! { ":now": now, ":user_id": user_id },
            |row| {
                Ok(Summary {
                    completed: row.get(0)?,
                    pending: row.get(1)?,
                    overdue: row.get(2)?,
                })
            },
        )
        .map_err(|e| e.into())
    })
    .await
    .map_err(db::Error::from)
    .map_err(Error::from)
}

pub async fn signup(Signup { full_name, email, password }: Signup, BaseParams { db }: BaseParams) -> Result<UserId> {
    let lookup = email.clone();
    let taken = db
        .call(move |conn| {
            conn.query_row("SELECT 1 FROM users WHERE email = ?", [lookup], |_| Ok(()))
                .optional()
                .map_err(|e| e.into())
        })
        .await
        .map_err(db::Error::from)?
        .is_some();

    if taken {
        return Err(Error::bad_request("Email already in use"));
    }

    let hash = password::hash(password).await?;

    let user_id = db
        .call(move |conn| {
            conn.query_row(
                "INSERT INTO users (full_name, email, password) VALUES (?, ?, ?) RETURNING id",
                params![full_name, email, hash],
                |row| row.get::<_, UserId>(0),
            )
            .map_err(|e| e.into())
        })
        .await
        .map_err(db::Error::from)
        .map_err(|e| {
            // lost a race against a concurrent signup with the same email
            if e.is_unique_violation() {
                Error::bad_request("Email already in use")
            } else {
                Error::from(e)
            }
        })?;

    tracing::info!(user_id, "user registered");

    Ok(user_id)
}

pub async fn login(Login { email, password }: Login, BaseParams { db }: BaseParams) -> Result<LoginResponse> {
    let credentials = db
        .call(move |conn| {
            conn.query_row("SELECT id, password FROM users WHERE email = ?", [email], |row| {
                Ok((row.get::<_, UserId>(0)?, row.get::<_, String>(1)?))
            })
            .optional()
            .map_err(|e| e.into())
        })
        .await
        .map_err(db::Error::from)?;

    let Some((user_id, hash)) = credentials else {
        return Ok(LoginResponse::rejected("User not found"));
    };

    if !password::verify(password, hash).await? {
        return Ok(LoginResponse::rejected("Wrong password"));
    }

    tracing::info!(user_id, "user logged in");

    Ok(LoginResponse::accepted(user_id))
}

pub async fn reset_password(
    ResetPassword {
        user_id,
        old_password,
        new_password,
    }: ResetPassword,
    BaseParams { db }: BaseParams,
) -> Result<()> {
    let hash = db
        .call(move |conn| {
            conn.query_row("SELECT password FROM users WHERE id = ?", [user_id], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| e.into())
        })
        .await
        .map_err(db::Error::from)
        .map_err(|e| e.not_found_message("User not found"))?;

    if !password::verify(old_password, hash).await? {
        return Err(Error::Unauthorized("Wrong password".into()));
    }

    let hash = password::hash(new_password).await?;

    db.call(move |conn| {
        conn.execute("UPDATE users SET password = ? WHERE id = ?", params![hash, user_id])?;
        Ok(())
    })
    .await
    .map_err(db::Error::from)?;

    tracing::info!(user_id, "password reset");

    Ok(())
}
