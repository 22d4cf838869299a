use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::{reject::Rejection, Filter};

use crate::{
    actions::tokens::get_token_user,
    config::Config,
    error::ApiError,
    schema::User,
};

use super::jwt::verify_token;

const TOKEN_KEYWORD: &str = "token";

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub fn with_context(context: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

/// Extracts the key of an `Authorization: Token <key>` header. Other schemes
/// are left to anonymous access.
pub fn parse_token_header(header: &str) -> Result<Option<&str>, ApiError> {
    let mut parts = header.split_whitespace();

    match parts.next() {
        Some(keyword) if keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) => {}
        _ => return Ok(None),
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        _ => Err(ApiError::InvalidToken),
    }
}

async fn resolve_user(header: Option<String>, context: &Context) -> Result<Option<User>, ApiError> {
    let Some(header) = header else {
        return Ok(None);
    };
    let Some(key) = parse_token_header(&header)? else {
        return Ok(None);
    };

    let claims = verify_token(key, &context.config.secret_key)?;
    let user = get_token_user(key, &context.pool)
        .await?
        .filter(|user| user.id == claims.user_id && user.is_active)
        .ok_or(ApiError::InvalidToken)?;

    Ok(Some(user))
}

/// The requesting user, `None` when no token was sent. A token that does not
/// resolve to an active user rejects the request.
pub fn with_possible_session(
    context: Context,
) -> impl Filter<Extract = (Option<User>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_context(context))
        .and_then(|header: Option<String>, context: Context| async move {
            resolve_user(header, &context)
                .await
                .map_err(Rejection::from)
        })
}
