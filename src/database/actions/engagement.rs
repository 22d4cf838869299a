use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    schema::{CartPart, Id},
};

/// Per-user marker relations on recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Favorite,
    Cart,
}

impl Marker {
    fn table(self) -> &'static str {
        match self {
            Marker::Favorite => "favorites",
            Marker::Cart => "carts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Marker::Favorite => "Favorite",
            Marker::Cart => "Cart",
        }
    }
}

pub async fn add_marker(marker: Marker, user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        marker.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request(format!(
            "{}: recipe is already added.",
            marker.label()
        )));
    }

    Ok(())
}

pub async fn remove_marker(marker: Marker, user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        marker.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request(format!(
            "{}: recipe is not found.",
            marker.label()
        )));
    }

    Ok(())
}

/// Which of `recipe_ids` the user has marked.
pub async fn marked_recipes(
    marker: Marker,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        marker.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Every ingredient line of every recipe in the user's cart.
pub async fn list_cart_parts(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<CartPart>, ApiError> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ia.amount
        FROM carts c
        INNER JOIN ingredient_amounts ia ON ia.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
