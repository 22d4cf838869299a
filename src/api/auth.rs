use serde_json::json;
use warp::{
    http::Method,
    hyper::body::Bytes,
    reject::Rejection,
    reply::Response,
};

use crate::{
    actions::{tokens, users},
    error::ApiError,
    form::Form,
    middleware::Context,
    payload::Credentials,
    permissions::Permission,
    schema::User,
};

use super::responses;

/// Exchanges email and password for the user's API token.
pub async fn login(user: Option<User>, body: Bytes, context: Context) -> Result<Response, Rejection> {
    Permission::AllowAny.check(&Method::POST, user.as_ref())?;
    let form = Form::from_body(&body)?;
    let credentials = Credentials::from_form(&form)?;
    let user = users::authenticate(&credentials, &context.pool).await?;
    let key = tokens::get_or_create_token(&user, &context.config.secret_key, &context.pool).await?;

    Ok(responses::created(&json!({ "auth_token": key })))
}

pub async fn logout(user: Option<User>, context: Context) -> Result<Response, Rejection> {
    Permission::IsAuthenticated.check(&Method::POST, user.as_ref())?;
    let user = user.ok_or(ApiError::NotAuthenticated)?;

    tokens::delete_token(user.id, &context.pool).await?;
    log::info!("User {} logged out", user.id);
    Ok(responses::no_content())
}
