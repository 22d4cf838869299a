use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    schema::{Id, RecipeTag, Tag},
};

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id DESC")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn create_tag(
    name: &str,
    color: Option<&str>,
    slug: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Tag, ApiError> {
    let tag: Tag = sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
        .bind(name)
        .bind(color)
        .bind(slug)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

/// Slugs from `slugs` that no tag carries.
pub async fn unknown_slugs(slugs: &[String], pool: &Pool<Postgres>) -> Result<Vec<String>, ApiError> {
    if slugs.is_empty() {
        return Ok(vec![]);
    }

    let known: Vec<(String,)> = sqlx::query_as("SELECT slug FROM tags WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(slugs
        .iter()
        .filter(|slug| !known.iter().any(|(known,)| known == *slug))
        .cloned()
        .collect())
}

/// Tags of each recipe in `recipe_ids`, keyed by recipe.
pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Tag>>, ApiError> {
    let rows: Vec<RecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id DESC
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut map: HashMap<Id, Vec<Tag>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| map.entry(row.recipe_id).or_default().push(row.tag));

    Ok(map)
}
