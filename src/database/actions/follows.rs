use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    pagination::{PageContext, PageRequest},
    schema::{Id, SubscriptionRow},
};

const SELF_FOLLOW: &str = "You cannot subscribe to or unsubscribe from yourself.";

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::bad_request(SELF_FOLLOW));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Subscription already exists."));
    }

    Ok(())
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::bad_request(SELF_FOLLOW));
    }

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("You are not subscribed to this user."));
    }

    Ok(())
}

/// Which of `author_ids` the user follows.
pub async fn followed_authors(
    user_id: Id,
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    let rows: Vec<(Id,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = ANY($2)")
            .bind(user_id)
            .bind(author_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Authors the user follows, with their recipe counts.
pub async fn list_subscriptions(
    user_id: Id,
    request: &PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionRow>, ApiError> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT
            u.*,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY f.author_id, f.user_id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    PageContext::from_rows(rows, total_count, request)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}
