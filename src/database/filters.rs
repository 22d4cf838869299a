use url::form_urlencoded;

use crate::{
    error::{ApiError, FieldErrors},
    schema::Id,
};

/// Query string pairs in request order. Repeated keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn parse(query: &str) -> Self {
        Self::new(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    /// Last value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

pub fn invalid_choice(value: &str) -> String {
    format!("Select a valid choice. {value} is not one of the available choices.")
}

pub const UNKNOWN_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Recipe list filters. Existence of the author and tag slugs is checked
/// against the store when the listing runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    pub fn from_query(query: &QueryParams) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let author = match query.get("author").filter(|v| !v.is_empty()) {
            None => None,
            Some(author) => match author.trim().parse::<Id>() {
                Ok(author) => Some(author),
                Err(_) => {
                    errors.add("author", UNKNOWN_CHOICE);
                    None
                }
            },
        };

        let mut tags: Vec<String> = vec![];
        for slug in query.get_all("tags").into_iter().filter(|v| !v.is_empty()) {
            if !tags.iter().any(|tag| tag == slug) {
                tags.push(slug.to_string());
            }
        }

        let is_favorited = flag(query, "is_favorited", &mut errors);
        let is_in_shopping_cart = flag(query, "is_in_shopping_cart", &mut errors);

        errors.into_result()?;

        Ok(Self {
            author,
            tags,
            is_favorited,
            is_in_shopping_cart,
        })
    }
}

/// `0`/`1` choice parameters.
fn flag(query: &QueryParams, key: &str, errors: &mut FieldErrors) -> Option<bool> {
    match query.get(key).filter(|v| !v.is_empty()) {
        None => None,
        Some("0") => Some(false),
        Some("1") => Some(true),
        Some(other) => {
            errors.add(key, invalid_choice(other));
            None
        }
    }
}

/// `recipes_limit` of the subscription listing: a natural number when given.
pub fn recipes_limit(query: &QueryParams) -> Result<Option<i64>, ApiError> {
    match query.get("recipes_limit") {
        None => Ok(None),
        Some(limit) => limit
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|limit| *limit > 0)
            .map(Some)
            .ok_or_else(|| {
                ApiError::bad_request("recipes_limit must be a natural number.")
            }),
    }
}
