use std::collections::HashMap;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::INGREDIENT_IMPORT_BATCH,
    error::{ApiError, QueryError},
    schema::{Id, Ingredient, RecipePart},
};

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_prefix(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}

/// All ingredients, or those whose name starts with `name` (case-insensitive).
pub async fn list_ingredients(name: Option<&str>, pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ApiError> {
    let list: Vec<Ingredient> = match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY id DESC")
            .bind(like_prefix(name))
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY id DESC")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(list)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(ingredient)
}

/// Inserts `(name, unit)` pairs in batches, skipping pairs already stored.
/// Returns the number of new rows.
pub async fn import_ingredients(rows: &[(String, String)], pool: &Pool<Postgres>) -> Result<u64, ApiError> {
    let mut inserted = 0;

    for batch in rows.chunks(INGREDIENT_IMPORT_BATCH) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        query_builder.push_values(batch, |mut b, (name, unit)| {
            b.push_bind(name).push_bind(unit);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Ingredient lines of each recipe in `recipe_ids`, keyed by recipe.
pub async fn list_recipe_parts(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipePart>>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ia.recipe_id, i.id, i.name, i.measurement_unit, ia.amount
        FROM ingredient_amounts ia
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = ANY($1)
        ORDER BY ia.id DESC
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut map: HashMap<Id, Vec<RecipePart>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| map.entry(row.recipe_id).or_default().push(row));

    Ok(map)
}
