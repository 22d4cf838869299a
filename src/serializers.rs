use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{
        engagement::{marked_recipes, Marker},
        follows::followed_authors,
        ingredients::list_recipe_parts,
        recipes::list_author_recipes,
        tags::list_recipe_tags,
        users::list_users_by_ids,
    },
    config::Config,
    error::ApiError,
    schema::{Id, Recipe, RecipePart, SubscriptionRow, Tag, User},
};

/// Public profile returned by registration.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRepr {
    #[serde(flatten)]
    pub profile: CreatedUser,
    pub is_subscribed: bool,
}

impl UserRepr {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            profile: user.into(),
            is_subscribed,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientAmountRepr {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for IngredientAmountRepr {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeRepr {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRepr,
    pub ingredients: Vec<IngredientAmountRepr>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i16,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeMinified {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i16,
}

impl RecipeMinified {
    pub fn new(recipe: &Recipe, config: &Config) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: config.media_url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FollowRepr {
    #[serde(flatten)]
    pub author: UserRepr,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: i64,
}

/// Viewer-dependent flags of one recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub fn assemble_recipe(
    recipe: Recipe,
    author: UserRepr,
    tags: Vec<Tag>,
    parts: Vec<RecipePart>,
    flags: RecipeFlags,
    config: &Config,
) -> RecipeRepr {
    RecipeRepr {
        id: recipe.id,
        tags,
        author,
        ingredients: parts.into_iter().map(IngredientAmountRepr::from).collect(),
        is_favorited: flags.is_favorited,
        is_in_shopping_cart: flags.is_in_shopping_cart,
        image: config.media_url(&recipe.image),
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    }
}

/// Authors `viewer` follows among `ids`. Empty for anonymous viewers.
async fn subscriptions_among(
    viewer: Option<&User>,
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    match viewer {
        Some(viewer) => followed_authors(viewer.id, ids, pool).await,
        None => Ok(HashSet::new()),
    }
}

pub async fn describe_users(
    users: Vec<User>,
    viewer: Option<&User>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRepr>, ApiError> {
    let ids: Vec<Id> = users.iter().map(|user| user.id).collect();
    let followed = subscriptions_among(viewer, &ids, pool).await?;

    Ok(users
        .iter()
        .map(|user| UserRepr::new(user, followed.contains(&user.id)))
        .collect())
}

pub async fn describe_user(user: &User, viewer: Option<&User>, pool: &Pool<Postgres>) -> Result<UserRepr, ApiError> {
    let followed = subscriptions_among(viewer, &[user.id], pool).await?;
    Ok(UserRepr::new(user, followed.contains(&user.id)))
}

/// Full read representations, in the order given.
pub async fn describe_recipes(
    recipes: Vec<Recipe>,
    viewer: Option<&User>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRepr>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Id, User> = list_users_by_ids(&author_ids, pool)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let followed = subscriptions_among(viewer, &author_ids, pool).await?;
    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let mut parts = list_recipe_parts(&recipe_ids, pool).await?;
    let (favorites, carts) = match viewer {
        Some(viewer) => (
            marked_recipes(Marker::Favorite, viewer.id, &recipe_ids, pool).await?,
            marked_recipes(Marker::Cart, viewer.id, &recipe_ids, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .map(|author| UserRepr::new(author, followed.contains(&author.id)))
                .ok_or_else(|| {
                    ApiError::Internal(format!("Author of recipe {} is missing", recipe.id))
                })?;
            let flags = RecipeFlags {
                is_favorited: favorites.contains(&recipe.id),
                is_in_shopping_cart: carts.contains(&recipe.id),
            };

            let recipe_tags = tags.remove(&recipe.id).unwrap_or_default();
            let recipe_parts = parts.remove(&recipe.id).unwrap_or_default();

            Ok(assemble_recipe(recipe, author, recipe_tags, recipe_parts, flags, config))
        })
        .collect()
}

pub async fn describe_recipe(
    recipe: Recipe,
    viewer: Option<&User>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<RecipeRepr, ApiError> {
    describe_recipes(vec![recipe], viewer, config, pool)
        .await?
        .pop()
        .ok_or(ApiError::NotFound)
}

/// Followed authors with up to `recipes_limit` of their newest recipes.
pub async fn describe_subscriptions(
    rows: Vec<SubscriptionRow>,
    recipes_limit: Option<i64>,
    config: &Config,
    pool: &Pool<Postgres>,
) -> Result<Vec<FollowRepr>, ApiError> {
    let author_ids: Vec<Id> = rows.iter().map(|row| row.author.id).collect();
    let mut recipes = list_author_recipes(&author_ids, recipes_limit, pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| FollowRepr {
            author: UserRepr::new(&row.author, true),
            recipes: recipes
                .remove(&row.author.id)
                .unwrap_or_default()
                .iter()
                .map(|recipe| RecipeMinified::new(recipe, config))
                .collect(),
            recipes_count: row.recipes_count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn user() -> User {
        User {
            id: 3,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: "$argon2id$hash".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    fn recipe() -> Recipe {
        Recipe {
            id: 10,
            author_id: 3,
            name: "Omelette".to_string(),
            text: "Beat the eggs.".to_string(),
            image: "recipes/01/02/2026/omelette.png".to_string(),
            cooking_time: 5,
        }
    }

    #[test]
    fn user_repr_hides_credentials() {
        let value = serde_json::to_value(UserRepr::new(&user(), false)).unwrap();
        assert_eq!(
            value,
            json!({
                "email": "cook@example.com",
                "id": 3,
                "username": "cook",
                "first_name": "Julia",
                "last_name": "Child",
                "is_subscribed": false,
            })
        );
    }

    #[test]
    fn recipe_repr_has_absolute_image() {
        let config = Config::for_tests();
        let tag = Tag {
            id: 1,
            name: "Breakfast".to_string(),
            color: Some("#E26C2D".to_string()),
            slug: Some("breakfast".to_string()),
        };
        let part = RecipePart {
            recipe_id: 10,
            id: 4,
            name: "eggs".to_string(),
            measurement_unit: "pcs".to_string(),
            amount: 2,
        };

        let repr = assemble_recipe(
            recipe(),
            UserRepr::new(&user(), true),
            vec![tag],
            vec![part],
            RecipeFlags::default(),
            &config,
        );
        let value = serde_json::to_value(repr).unwrap();

        assert_eq!(value["image"], "http://testserver/media/recipes/01/02/2026/omelette.png");
        assert_eq!(value["tags"][0]["slug"], "breakfast");
        assert_eq!(
            value["ingredients"],
            json!([{ "id": 4, "name": "eggs", "measurement_unit": "pcs", "amount": 2 }])
        );
        assert_eq!(value["author"]["is_subscribed"], true);
        assert_eq!(value["is_favorited"], false);
        assert_eq!(value["is_in_shopping_cart"], false);
    }

    #[test]
    fn minified_recipe_shape() {
        let value = serde_json::to_value(RecipeMinified::new(&recipe(), &Config::for_tests())).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 10,
                "name": "Omelette",
                "image": "http://testserver/media/recipes/01/02/2026/omelette.png",
                "cooking_time": 5,
            })
        );
    }

    #[test]
    fn follow_repr_flattens_author() {
        let repr = FollowRepr {
            author: UserRepr::new(&user(), true),
            recipes: vec![RecipeMinified::new(&recipe(), &Config::for_tests())],
            recipes_count: 4,
        };
        let value = serde_json::to_value(repr).unwrap();

        assert_eq!(value["username"], "cook");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes_count"], 4);
        assert_eq!(value["recipes"].as_array().unwrap().len(), 1);
    }
}
