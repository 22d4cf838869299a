use warp::{
    http::Method,
    hyper::body::Bytes,
    path::FullPath,
    reject::Rejection,
    reply::Response,
};

use crate::{
    actions::{follows, users},
    error::ApiError,
    filters::{recipes_limit, QueryParams},
    form::Form,
    middleware::Context,
    pagination::PageRequest,
    payload::{PasswordChange, UserRegistration},
    permissions::Permission,
    schema::{Id, SubscriptionRow, User},
    serializers::{describe_subscriptions, describe_user, describe_users, CreatedUser},
};

use super::responses;

pub async fn register(user: Option<User>, body: Bytes, context: Context) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::POST, user.as_ref())?;

    let form = Form::from_body(&body)?;
    let registration = UserRegistration::from_form(&form)?;
    let created = users::register_user(&registration, false, &context.pool).await?;

    Ok(responses::created(&CreatedUser::from(&created)))
}

pub async fn list_users(
    path: FullPath,
    query: QueryParams,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::GET, user.as_ref())?;
    let base_url = format!("{}{}", context.config.public_url, path.as_str());
    let request = PageRequest::from_query(base_url, &query)?;

    let mut page = users::list_users(&request, &context.pool).await?;
    let rows = std::mem::take(&mut page.results);
    let results = describe_users(rows, user.as_ref(), &context.pool).await?;

    Ok(responses::ok(&page.with_results(results)))
}

pub async fn get_user(id: Id, user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::ReadOnly.check(&Method::GET, user.as_ref())?;
    let found = users::get_user(id, &context.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(responses::ok(&describe_user(&found, user.as_ref(), &context.pool).await?))
}

pub async fn me(user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&Method::GET, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    Ok(responses::ok(&describe_user(&user, Some(&user), &context.pool).await?))
}

pub async fn set_password(user: Option<User>, body: Bytes, context: Context) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&Method::POST, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    let form = Form::from_body(&body)?;
    let change = PasswordChange::from_form(&form)?;
    users::set_password(&user, &change, &context.pool).await?;

    Ok(responses::no_content())
}

/// Endpoints that exist for routing only: account edits, deletion and the
/// activation/reset flows.
pub async fn refuse(permission: Permission, method: Method, user: Option<User>) -> Result<Response, Rejection> {
    permission.check(&method, user.as_ref())?;
    Err(ApiError::MethodNotAllowed.into())
}

/// `POST` follows the author, `DELETE` unfollows.
pub async fn subscribe(
    method: Method,
    id: Id,
    query: QueryParams,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&method, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;
    let author = users::get_user(id, &context.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    if method == Method::DELETE {
        follows::unsubscribe(user.id, author.id, &context.pool).await?;
        return Ok(responses::no_content());
    }

    let limit = recipes_limit(&query)?;
    follows::subscribe(user.id, author.id, &context.pool).await?;

    let recipes_count = follows::count_author_recipes(author.id, &context.pool).await?;
    let row = SubscriptionRow {
        author,
        recipes_count,
        count: 1,
    };
    let mut described = describe_subscriptions(vec![row], limit, &context.config, &context.pool).await?;
    let repr = described
        .pop()
        .ok_or_else(|| ApiError::Internal("Subscription could not be described".to_string()))?;

    Ok(responses::created(&repr))
}

pub async fn subscriptions(
    path: FullPath,
    query: QueryParams,
    user: Option<User>,
    context: Context,
) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&Method::GET, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    let limit = recipes_limit(&query)?;
    let base_url = format!("{}{}", context.config.public_url, path.as_str());
    let request = PageRequest::from_query(base_url, &query)?;

    let mut page = follows::list_subscriptions(user.id, &request, &context.pool).await?;
    let rows = std::mem::take(&mut page.results);
    let results = describe_subscriptions(rows, limit, &context.config, &context.pool).await?;

    Ok(responses::ok(&page.with_results(results)))
}
