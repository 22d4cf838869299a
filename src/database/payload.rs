use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{
    constants::{
        MAX_CHARFIELD_LENGTH, MAX_COOKING_TIME, MAX_EMAIL_LENGTH, MAX_NAMES_LENGTH,
        MAX_PASSWORD_LENGTH, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, MIN_PASSWORD_LENGTH,
    },
    error::{ApiError, FieldErrors},
    form::{as_integer, Form, REQUIRED},
    media::ImageUpload,
    schema::Id,
};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "12345678", "123456789", "1234567890", "qwerty123", "qwertyuiop",
    "iloveyou", "sunshine", "football", "baseball", "princess", "starwars", "trustno1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientEntry {
    pub id: Id,
    pub amount: i32,
}

/// Validated recipe write. `None` means "not supplied" (only possible on update).
#[derive(Debug, Clone, Default)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i16>,
    pub image: Option<ImageUpload>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientEntry>>,
}

impl RecipePayload {
    /// Shape checks only; referenced ids are resolved against the store later.
    pub fn from_form(form: &Form, mode: WriteMode) -> Result<Self, ApiError> {
        if form.is_empty() {
            return Err(ApiError::bad_request("Empty request."));
        }

        let required = mode == WriteMode::Create;
        let mut errors = FieldErrors::new();

        let name = form.get_str("name", required, Some(MAX_CHARFIELD_LENGTH), &mut errors);
        let text = form.get_str("text", required, None, &mut errors);
        let cooking_time = form
            .get_number(
                "cooking_time",
                required,
                MIN_COOKING_TIME,
                MAX_COOKING_TIME,
                &mut errors,
            )
            .map(|minutes| minutes as i16);
        let image = match form.get("image") {
            None if required => {
                errors.add("image", REQUIRED);
                None
            }
            None => None,
            Some(Value::String(data)) => match ImageUpload::from_data_uri(data) {
                Ok(upload) => Some(upload),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            Some(_) => {
                errors.add("image", "No file was submitted.");
                None
            }
        };
        errors.into_result()?;

        if mode == WriteMode::Create {
            for field in ["tags", "ingredients"] {
                if form.get_present(field).is_none() {
                    return Err(ApiError::field(field, "This field may not be empty."));
                }
            }
        }

        let ingredients = form.get_present("ingredients").map(parse_ingredients).transpose()?;
        let tags = form.get_present("tags").map(parse_tags).transpose()?;

        Ok(Self {
            name,
            text,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }
}

/// `[{"id": <int>, "amount": <int >= 1>}, ...]` without repeated ids.
pub fn parse_ingredients(value: &Value) -> Result<Vec<IngredientEntry>, ApiError> {
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::field("ingredients", "Expected a list."))?;

    if items.is_empty() {
        return Err(ApiError::field(
            "ingredients",
            "A recipe needs at least one ingredient.",
        ));
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let item = item
            .as_object()
            .ok_or_else(|| ApiError::field("ingredients", "Expected a list of objects."))?;

        for key in ["id", "amount"] {
            if !item.contains_key(key) {
                return Err(ApiError::field(
                    "ingredients",
                    format!("Specify the ingredient {key}."),
                ));
            }
        }

        let id = as_integer(&item["id"])
            .ok_or_else(|| ApiError::field("ingredients", "Ingredient id must be an integer."))?;

        if !seen.insert(id) {
            return Err(ApiError::field(
                "ingredients",
                format!("Ingredient {id} must not repeat."),
            ));
        }

        let amount = as_integer(&item["amount"])
            .filter(|amount| *amount >= MIN_INGREDIENT_AMOUNT && *amount <= i32::MAX as i64)
            .ok_or_else(|| {
                ApiError::field("ingredients", format!("Ingredient {id}: invalid amount."))
            })?;

        entries.push(IngredientEntry {
            id,
            amount: amount as i32,
        });
    }

    Ok(entries)
}

/// `[<int>, ...]` without repeated ids.
pub fn parse_tags(value: &Value) -> Result<Vec<Id>, ApiError> {
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::field("tags", "Expected a list of tags."))?;

    if items.is_empty() {
        return Err(ApiError::field("tags", "A recipe needs at least one tag."));
    }

    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(items.len());

    for item in items {
        let id = item
            .as_i64()
            .ok_or_else(|| ApiError::field("tags", "Expected tag ids."))?;

        if !seen.insert(id) {
            return Err(ApiError::field("tags", format!("Tag {id} must not repeat.")));
        }
        tags.push(id);
    }

    Ok(tags)
}

#[derive(Debug, Clone)]
pub struct UserRegistration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserRegistration {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let email = form
            .get_str("email", true, Some(MAX_EMAIL_LENGTH), &mut errors)
            .and_then(|email| match validate_email(&email) {
                true => Some(normalize_email(&email)),
                false => {
                    errors.add("email", "Enter a valid email address.");
                    None
                }
            });
        let username = form
            .get_str("username", true, Some(MAX_NAMES_LENGTH), &mut errors)
            .and_then(|username| match USERNAME_RE.is_match(&username) {
                true => Some(username),
                false => {
                    errors.add(
                        "username",
                        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                    );
                    None
                }
            });
        let first_name = form.get_str("first_name", true, Some(MAX_NAMES_LENGTH), &mut errors);
        let last_name = form.get_str("last_name", true, Some(MAX_NAMES_LENGTH), &mut errors);
        let password = form.get_str("password", true, Some(MAX_PASSWORD_LENGTH), &mut errors);

        match (email, username, first_name, last_name, password) {
            (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
                if errors.is_empty() =>
            {
                let registration = Self {
                    email,
                    username,
                    first_name,
                    last_name,
                    password,
                };
                let problems = password_problems(&registration.password, &registration.similar_attributes());
                if !problems.is_empty() {
                    let mut errors = FieldErrors::new();
                    problems.into_iter().for_each(|problem| errors.add("password", problem));
                    return Err(ApiError::Validation(errors));
                }
                Ok(registration)
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }

    fn similar_attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("username", self.username.to_owned()),
            ("first name", self.first_name.to_owned()),
            ("last name", self.last_name.to_owned()),
            ("email address", self.email.to_owned()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        let current_password = form.get_str("current_password", true, None, &mut errors);
        let new_password =
            form.get_str("new_password", true, Some(MAX_PASSWORD_LENGTH), &mut errors);

        match (current_password, new_password) {
            (Some(current_password), Some(new_password)) => Ok(Self {
                current_password,
                new_password,
            }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();
        let email = form.get_str("email", true, None, &mut errors);
        let password = form.get_str("password", true, None, &mut errors);

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email: normalize_email(&email),
                password,
            }),
            _ => Err(ApiError::Validation(errors)),
        }
    }
}

pub fn validate_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && (domain.contains('.') || domain == "localhost")
        }
        None => false,
    }
}

/// Lowercases the domain part only, local parts are case sensitive.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Messages for every password rule the candidate breaks.
pub fn password_problems(password: &str, attributes: &[(&str, String)]) -> Vec<String> {
    let mut problems = vec![];
    let lowered = password.to_lowercase();

    for (label, value) in attributes {
        let value = value.to_lowercase();
        let local = value.split('@').next().unwrap_or_default();
        if !local.is_empty() && (lowered == value || lowered == local) {
            problems.push(format!("The password is too similar to the {label}."));
            break;
        }
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}
