use std::{collections::HashMap, path::Path};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    actions::{tags::unknown_slugs, users::user_exists},
    error::{ApiError, QueryError},
    filters::{invalid_choice, RecipeFilter, UNKNOWN_CHOICE},
    form::REQUIRED,
    media::remove_media,
    pagination::{PageContext, PageRequest},
    payload::{IngredientEntry, RecipePayload},
    schema::{Id, Recipe, RecipeRow},
};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(recipe)
}

/// Filtered listing, newest first. `viewer` is the requesting user, if any.
pub async fn list_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    request: &PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Recipe>, ApiError> {
    if let Some(author) = filter.author {
        if !user_exists(author, pool).await? {
            return Err(ApiError::field("author", UNKNOWN_CHOICE));
        }
    }
    if let Some(slug) = unknown_slugs(&filter.tags, pool).await?.first() {
        return Err(ApiError::field("tags", invalid_choice(slug)));
    }

    let markers = [
        ("favorites", filter.is_favorited),
        ("carts", filter.is_in_shopping_cart),
    ];

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    for (table, wanted) in markers {
        match (wanted, viewer) {
            (None, _) | (Some(false), None) => {}
            // Nothing is marked for anonymous users.
            (Some(true), None) => return PageContext::from_rows(vec![], 0, request),
            (Some(wanted), Some(viewer)) => {
                let negation = if wanted { "" } else { "NOT " };
                query_builder
                    .push(format!(
                        " AND {negation}EXISTS (SELECT 1 FROM {table} m WHERE m.recipe_id = r.id AND m.user_id = "
                    ))
                    .push_bind(viewer)
                    .push(")");
            }
        }
    }

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(request.limit())
        .push(" OFFSET ")
        .push_bind(request.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = rows.into_iter().map(|row| row.recipe).collect();

    PageContext::from_rows(recipes, total_count, request)
}

/// Recipes of each author in `author_ids`, newest first, at most `limit` each.
pub async fn list_author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Recipe>>, ApiError> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT * FROM (
            SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY id DESC
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut map: HashMap<Id, Vec<Recipe>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| map.entry(row.author_id).or_default().push(row));

    Ok(map)
}

/// Ids from `ids` with no row in `table`.
async fn missing_ids(table: &str, ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<Id>, ApiError> {
    let found: Vec<(Id,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(ids
        .iter()
        .filter(|id| !found.iter().any(|(found,)| found == *id))
        .copied()
        .collect())
}

/// Every referenced tag and ingredient must exist.
pub async fn check_references(payload: &RecipePayload, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if let Some(tags) = &payload.tags {
        if !missing_ids("tags", tags, pool).await?.is_empty() {
            return Err(ApiError::NotFound);
        }
    }
    if let Some(ingredients) = &payload.ingredients {
        let ids: Vec<Id> = ingredients.iter().map(|entry| entry.id).collect();
        if !missing_ids("ingredients", &ids, pool).await?.is_empty() {
            return Err(ApiError::NotFound);
        }
    }

    Ok(())
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::field(field, REQUIRED))
}

async fn set_recipe_tags(recipe_id: Id, tags: &[Id], conn: &mut PgConnection) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(tags, |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn set_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientEntry],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(ingredients, |mut b, entry| {
        b.push_bind(recipe_id)
            .push_bind(entry.id)
            .push_bind(entry.amount);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_recipe(
    author_id: Id,
    payload: RecipePayload,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, ApiError> {
    let tags = required(payload.tags, "tags")?;
    let ingredients = required(payload.ingredients, "ingredients")?;

    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(required(payload.name, "name")?)
    .bind(required(payload.text, "text")?)
    .bind(image)
    .bind(required(payload.cooking_time, "cooking_time")?)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(id.0, &tags, &mut tr).await?;
    set_recipe_ingredients(id.0, &ingredients, &mut tr).await?;

    tr.commit().await.map_err(QueryError::from)?;
    Ok(id.0)
}

/// Stores the image and writes the recipe with its tags and ingredient
/// amounts in one transaction. The image is removed again if the write fails.
pub async fn create_recipe(
    author_id: Id,
    mut payload: RecipePayload,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<Id, ApiError> {
    check_references(&payload, pool).await?;

    let image = required(payload.image.take(), "image")?.save(media_root).await?;

    match insert_recipe(author_id, payload, &image, pool).await {
        Ok(id) => {
            log::info!("User {author_id} created recipe {id}");
            Ok(id)
        }
        Err(e) => {
            remove_media(media_root, &image).await;
            Err(e)
        }
    }
}

async fn write_recipe_update(
    recipe_id: Id,
    payload: RecipePayload,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            text = COALESCE($2, text),
            cooking_time = COALESCE($3, cooking_time),
            image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(payload.name)
    .bind(payload.text)
    .bind(payload.cooking_time)
    .bind(image)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(tags) = &payload.tags {
        set_recipe_tags(recipe_id, tags, &mut tr).await?;
    }
    if let Some(ingredients) = &payload.ingredients {
        set_recipe_ingredients(recipe_id, ingredients, &mut tr).await?;
    }

    tr.commit().await.map_err(QueryError::from)?;
    Ok(())
}

/// Applies the fields present in `payload`. Lists present replace the
/// stored ones wholesale.
pub async fn update_recipe(
    recipe: &Recipe,
    mut payload: RecipePayload,
    media_root: &Path,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    check_references(&payload, pool).await?;

    let image = match payload.image.take() {
        Some(upload) => Some(upload.save(media_root).await?),
        None => None,
    };

    match write_recipe_update(recipe.id, payload, image.as_deref(), pool).await {
        Ok(()) => {
            if image.is_some() {
                remove_media(media_root, &recipe.image).await;
            }
            Ok(())
        }
        Err(e) => {
            if let Some(image) = &image {
                remove_media(media_root, image).await;
            }
            Err(e)
        }
    }
}

pub async fn delete_recipe(recipe: &Recipe, media_root: &Path, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    remove_media(media_root, &recipe.image).await;
    log::info!("Deleted recipe {}", recipe.id);
    Ok(())
}
