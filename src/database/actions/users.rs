use sqlx::{Pool, Postgres};

use crate::{
    cryptography::{hash_password, password_matches},
    error::{ApiError, FieldErrors, QueryError},
    pagination::{PageContext, PageRequest},
    payload::{password_problems, Credentials, PasswordChange, UserRegistration},
    schema::{Id, User, UserRow},
};

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn get_user(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_users_by_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<User>, ApiError> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn user_exists(id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(exists.0)
}

pub async fn list_users(request: &PageRequest, pool: &Pool<Postgres>) -> Result<PageContext<User>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT *, COUNT(*) OVER() AS count FROM users ORDER BY id DESC LIMIT $1 OFFSET $2",
    )
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let users = rows.into_iter().map(|row| row.user).collect();

    PageContext::from_rows(users, total_count, request)
}

/// Creates a user, storing the argon2 hash of their password.
pub async fn register_user(
    registration: &UserRegistration,
    superuser: bool,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    let taken: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS(SELECT 1 FROM users WHERE email = $1),
            EXISTS(SELECT 1 FROM users WHERE username = $2)
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    let mut errors = FieldErrors::new();
    if taken.0 {
        errors.add("email", "A user with that email already exists.");
    }
    if taken.1 {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result()?;

    let password = hash_password(&registration.password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
    ",
    )
    .bind(&registration.email)
    .bind(&registration.username)
    .bind(&registration.first_name)
    .bind(&registration.last_name)
    .bind(password)
    .bind(superuser)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", user.id, user.email);
    Ok(user)
}

/// Resolves login credentials to an active user.
pub async fn authenticate(credentials: &Credentials, pool: &Pool<Postgres>) -> Result<User, ApiError> {
    let user = get_user_by_email(&credentials.email, pool)
        .await?
        .ok_or_else(|| ApiError::field("non_field_errors", INVALID_CREDENTIALS))?;

    if !password_matches(&credentials.password, &user.password) || !user.is_active {
        return Err(ApiError::field("non_field_errors", INVALID_CREDENTIALS));
    }

    Ok(user)
}

pub async fn set_password(user: &User, change: &PasswordChange, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();

    if !password_matches(&change.current_password, &user.password) {
        errors.add("current_password", "Invalid password.");
    }

    let attributes = [
        ("username", user.username.to_owned()),
        ("first name", user.first_name.to_owned()),
        ("last name", user.last_name.to_owned()),
        ("email address", user.email.to_owned()),
    ];
    for problem in password_problems(&change.new_password, &attributes) {
        errors.add("new_password", problem);
    }
    errors.into_result()?;

    let password = hash_password(&change.new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
