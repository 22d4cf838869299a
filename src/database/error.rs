use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde_json::{json, Map, Value};
use sqlx::error::ErrorKind;
use thiserror::Error;
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::{self, Response},
    Reply,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    NotFound,
    Duplicate,
    Constraint,
    Other,
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    kind: QueryErrorKind,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            kind: QueryErrorKind::Other,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self {
                info: String::from("RowNotFound"),
                kind: QueryErrorKind::NotFound,
            },
            sqlx::Error::Database(e) => {
                let kind = match e.kind() {
                    ErrorKind::UniqueViolation => QueryErrorKind::Duplicate,
                    ErrorKind::CheckViolation => QueryErrorKind::Constraint,
                    ErrorKind::ForeignKeyViolation => QueryErrorKind::NotFound,
                    _ => QueryErrorKind::Other,
                };
                let info = match e.constraint() {
                    Some(constraint) => constraint_message(constraint).to_string(),
                    None => format!("{e}"),
                };
                Self { info, kind }
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::NotFound => ApiError::NotFound,
            QueryErrorKind::Duplicate | QueryErrorKind::Constraint => {
                ApiError::BadRequest(value.info)
            }
            QueryErrorKind::Other => ApiError::Internal(value.info),
        }
    }
}

/// Maps constraint names from the migrations to client-facing messages.
fn constraint_message(constraint: &str) -> &str {
    match constraint {
        "favorites_user_recipe_unique" => "Favorite: recipe is already added.",
        "carts_user_recipe_unique" => "Cart: recipe is already added.",
        "follows_user_author_unique" => "Subscription already exists.",
        "follows_no_self_follow" => "You cannot subscribe to yourself.",
        "ingredient_amounts_recipe_ingredient_unique" => {
            "This ingredient is already added to the recipe."
        }
        "ingredients_name_unit_unique" => "This ingredient already exists.",
        "tags_name_key" => "A tag with that name already exists.",
        "tags_color_key" => "A tag with that color already exists.",
        "tags_slug_key" => "A tag with that slug already exists.",
        "tags_color_check" => "Enter a valid hex color, such as #49B64E.",
        "tags_slug_check" => "Enter a valid slug of letters, numbers, underscores or hyphens.",
        "users_email_key" => "A user with that email already exists.",
        "users_username_key" => "A user with that username already exists.",
        "recipes_cooking_time_check" => "Cooking time must be at least 1 minute.",
        "ingredient_amounts_amount_check" => "Amount must be at least 1.",
        other => other,
    }
}

/// Field-keyed validation messages, rendered as `{field: [message, ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    inner: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.inner
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.inner.get(field).map(|messages| messages.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.inner.contains_key(field)
    }

    /// Ok when no message was collected.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .inner
            .iter()
            .map(|(field, messages)| (field.to_owned(), json!(messages)))
            .collect();
        Value::Object(map)
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .inner
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        write!(f, "({})", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed {0}")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("Not found.")]
    NotFound,

    #[error("Invalid page.")]
    InvalidPage,

    #[error("Method not allowed.")]
    MethodNotAllowed,

    #[error("Request body is too large.")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthenticated | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::InvalidPage => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => errors.to_json(),
            ApiError::BadRequest(message) => json!({ "errors": message }),
            ApiError::Internal(_) => json!({ "detail": "Internal server error." }),
            other => json!({ "detail": other.to_string() }),
        }
    }

    pub fn render(&self) -> Response {
        if let ApiError::Internal(info) = self {
            log::error!("{info}");
        }

        let mut response = reply::with_status(reply::json(&self.body()), self.status()).into_response();
        if matches!(self, ApiError::NotAuthenticated | ApiError::InvalidToken) {
            response.headers_mut().insert(
                warp::http::header::WWW_AUTHENTICATE,
                warp::http::HeaderValue::from_static("Token"),
            );
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

impl Reject for ApiError {}
