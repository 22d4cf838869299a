use serde_json::{Map, Value};

use super::error::{ApiError, FieldErrors};

pub type FormData = Map<String, Value>;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_INTEGER: &str = "A valid integer is required.";
pub const NOT_STRING: &str = "Not a valid string.";

/// Raw JSON object of a write request, with typed accessors that collect
/// field-keyed messages instead of failing on the first one.
#[derive(Debug, Clone, Default)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    /// Parses a request body. An empty body or `{}` is rejected up front.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::bad_request("Empty request."));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::field("non_field_errors", format!("JSON parse error - {e}")))?;

        match value {
            Value::Object(data) if data.is_empty() => Err(ApiError::bad_request("Empty request.")),
            Value::Object(data) => Ok(Self::from_data(data)),
            _ => Err(ApiError::field(
                "non_field_errors",
                "Invalid data. Expected a dictionary.",
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Present and not `null`.
    pub fn get_present(&self, key: &str) -> Option<&Value> {
        self.inner.get(key).filter(|value| !value.is_null())
    }

    /// Reads a string field. `required` controls whether absence is an error.
    pub fn get_str(
        &self,
        key: &str,
        required: bool,
        max_length: Option<usize>,
        errors: &mut FieldErrors,
    ) -> Option<String> {
        match self.inner.get(key) {
            None => {
                if required {
                    errors.add(key, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                errors.add(key, NOT_NULL);
                None
            }
            Some(Value::String(value)) => {
                let value = value.trim().to_string();
                if value.is_empty() {
                    errors.add(key, NOT_BLANK);
                    return None;
                }
                if let Some(max_length) = max_length {
                    if value.chars().count() > max_length {
                        errors.add(
                            key,
                            format!("Ensure this field has no more than {max_length} characters."),
                        );
                        return None;
                    }
                }
                Some(value)
            }
            Some(_) => {
                errors.add(key, NOT_STRING);
                None
            }
        }
    }

    /// Reads an integer field within `min..=max`. Numeric strings are accepted.
    pub fn get_number(
        &self,
        key: &str,
        required: bool,
        min: i64,
        max: i64,
        errors: &mut FieldErrors,
    ) -> Option<i64> {
        match self.inner.get(key) {
            None => {
                if required {
                    errors.add(key, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                errors.add(key, NOT_NULL);
                None
            }
            Some(value) => match as_integer(value) {
                Some(number) if number < min => {
                    errors.add(
                        key,
                        format!("Ensure this value is greater than or equal to {min}."),
                    );
                    None
                }
                Some(number) if number > max => {
                    errors.add(
                        key,
                        format!("Ensure this value is less than or equal to {max}."),
                    );
                    None
                }
                Some(number) => Some(number),
                None => {
                    errors.add(key, NOT_INTEGER);
                    None
                }
            },
        }
    }
}

/// Integer view of a JSON value: whole numbers and strings holding one.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}
