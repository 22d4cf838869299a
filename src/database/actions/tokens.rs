use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    jwt::{generate_token, verify_token},
    schema::{AuthToken, Id, User},
};

/// Returns the user's token, issuing one on first login. A stored key that
/// no longer verifies under `secret` is replaced.
pub async fn get_or_create_token(user: &User, secret: &str, pool: &Pool<Postgres>) -> Result<String, ApiError> {
    if let Some(token) = get_token(user.id, pool).await? {
        if verify_token(&token.key, secret).is_ok() {
            return Ok(token.key);
        }
        log::info!("Replacing stale token of user {}", user.id);
        sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1 AND key = $2")
            .bind(user.id)
            .bind(&token.key)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
    }

    let key = generate_token(user, secret)?;
    sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(&key)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    // A concurrent login may have won the insert.
    let token = get_token(user.id, pool)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Token of user {} was not stored", user.id)))?;
    Ok(token.key)
}

pub async fn get_token(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<AuthToken>, ApiError> {
    let row: Option<AuthToken> = sqlx::query_as("SELECT * FROM auth_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Owner of a stored token key.
pub async fn get_token_user(key: &str, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as(
        "SELECT u.* FROM auth_tokens t INNER JOIN users u ON u.id = t.user_id WHERE t.key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn delete_token(user_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
