use deadpool_postgres::Pool;
use tokio_postgres::{Row, error::SqlState};
use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        username: row.try_get("username").map_err(|_| AppError::MissingData("username".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

/// Inserts a new user.
///
/// Returns `AppError::UsernameTaken` when the unique constraint on `username` fires.
pub async fn create_user(pool: &Pool, username: &str, password_hash: &str) -> Result<User> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password, created_at
            "#,
        )
        .await?;

    let row = client
        .query_one(&stmt, &[&username, &password_hash])
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::UsernameTaken
            } else {
                AppError::Database(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their username.
pub async fn find_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(
            r#"
            SELECT id, username, password, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .await?;
    let row = client.query_opt(&stmt, &[&username]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}
