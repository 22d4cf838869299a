use warp::{http::Method, reject::Rejection, reply::Response};

use crate::{
    actions::{ingredients, tags},
    error::ApiError,
    filters::QueryParams,
    middleware::Context,
    permissions::Permission,
    schema::{Id, User},
};

use super::responses;

pub async fn list_tags(user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::GET, user.as_ref())?;
    Ok(responses::ok(&tags::list_tags(&context.pool).await?))
}

pub async fn get_tag(id: Id, user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::GET, user.as_ref())?;
    let tag = tags::get_tag(id, &context.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(responses::ok(&tag))
}

/// `?name=<prefix>` narrows the list to names starting with the prefix.
pub async fn list_ingredients(
    query: QueryParams,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::GET, user.as_ref())?;
    let list = ingredients::list_ingredients(query.get("name"), &context.pool).await?;
    Ok(responses::ok(&list))
}

pub async fn get_ingredient(id: Id, user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::GET, user.as_ref())?;
    let ingredient = ingredients::get_ingredient(id, &context.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(responses::ok(&ingredient))
}
