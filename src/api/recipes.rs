use warp::{
    http::Method,
    hyper::body::Bytes,
    path::FullPath,
    reject::Rejection,
    reply::Response,
};

use crate::{
    actions::{
        engagement::{add_marker, list_cart_parts, remove_marker, Marker},
        recipes,
    },
    constants::SHOPPING_LIST_FILENAME,
    error::ApiError,
    filters::{QueryParams, RecipeFilter},
    form::Form,
    middleware::Context,
    pagination::PageRequest,
    payload::{RecipePayload, WriteMode},
    permissions::Permission,
    schema::{Id, Recipe, User},
    serializers::{describe_recipe, describe_recipes, RecipeMinified},
    shopping,
};

use super::responses;

const RECIPE_PERMISSION: Permission = Permission::OwnerOrReadOnly;

async fn find_recipe(id: Id, context: &Context) -> Result<Recipe, ApiError> {
    recipes::get_recipe(id, &context.pool)
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn list_recipes(
    path: FullPath,
    query: QueryParams,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::GET, user.as_ref())?;
    let filter = RecipeFilter::from_query(&query)?;
    let base_url = format!("{}{}", context.config.public_url, path.as_str());
    let request = PageRequest::from_query(base_url, &query)?;

    let mut page =
        recipes::list_recipes(&filter, user.as_ref().map(|user| user.id), &request, &context.pool).await?;
    let rows = std::mem::take(&mut page.results);
    let results = describe_recipes(rows, user.as_ref(), &context.config, &context.pool).await?;

    Ok(responses::ok(&page.with_results(results)))
}

pub async fn get_recipe(id: Id, user: Option<User>, context: Context) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::GET, user.as_ref())?;
    let recipe = find_recipe(id, &context).await?;
    let repr = describe_recipe(recipe, user.as_ref(), &context.config, &context.pool).await?;

    Ok(responses::ok(&repr))
}

pub async fn create_recipe(user: Option<User>, body: Bytes, context: Context) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::POST, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    let form = Form::from_body(&body)?;
    let payload = RecipePayload::from_form(&form, WriteMode::Create)?;
    let id = recipes::create_recipe(user.id, payload, &context.config.media_root, &context.pool).await?;

    let recipe = find_recipe(id, &context).await?;
    let repr = describe_recipe(recipe, Some(&user), &context.config, &context.pool).await?;
    Ok(responses::created(&repr))
}

pub async fn update_recipe(
    id: Id,
    user: Option<User>,
    body: Bytes,
    context: Context,
) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::PATCH, user.as_ref())?;
    let recipe = find_recipe(id, &context).await?;
    RECIPE_PERMISSION.check_object(&Method::PATCH, user.as_ref(), recipe.author_id)?;

    let form = Form::from_body(&body)?;
    let payload = RecipePayload::from_form(&form, WriteMode::Update)?;
    recipes::update_recipe(&recipe, payload, &context.config.media_root, &context.pool).await?;

    let recipe = find_recipe(id, &context).await?;
    let repr = describe_recipe(recipe, user.as_ref(), &context.config, &context.pool).await?;
    Ok(responses::ok(&repr))
}

/// Full replacement is not offered; the permission rule refuses it.
pub async fn replace_recipe(user: Option<User>) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::PUT, user.as_ref())?;
    Err(ApiError::MethodNotAllowed.into())
}

pub async fn delete_recipe(id: Id, user: Option<User>, context: Context) -> Result<Response, Rejection> {
    RECIPE_PERMISSION.check(&Method::DELETE, user.as_ref())?;
    let recipe = find_recipe(id, &context).await?;
    RECIPE_PERMISSION.check_object(&Method::DELETE, user.as_ref(), recipe.author_id)?;

    recipes::delete_recipe(&recipe, &context.config.media_root, &context.pool).await?;
    Ok(responses::no_content())
}

/// `POST` marks the recipe, `DELETE` unmarks it.
pub async fn toggle_marker(
    marker: Marker,
    method: Method,
    id: Id,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&method, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;
    let recipe = find_recipe(id, &context).await?;

    if method == Method::DELETE {
        remove_marker(marker, user.id, recipe.id, &context.pool).await?;
        return Ok(responses::no_content());
    }

    add_marker(marker, user.id, recipe.id, &context.pool).await?;
    Ok(responses::created(&RecipeMinified::new(&recipe, &context.config)))
}

pub async fn download_shopping_cart(user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&Method::GET, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    let items = shopping::aggregate(list_cart_parts(user.id, &context.pool).await?);
    if items.is_empty() {
        return Err(ApiError::bad_request("The shopping cart is empty.").into());
    }

    Ok(responses::attachment(
        shopping::render(&items),
        SHOPPING_LIST_FILENAME,
    ))
}
