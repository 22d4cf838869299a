use std::convert::Infallible;

use warp::{
    filters::body::BodyDeserializeError,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection},
    reply::Response,
};

use crate::error::ApiError;

/// Turns every rejection into a JSON error response.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if let Some(error) = err.find::<ApiError>() {
        return Ok(error.render());
    } else if err.is_not_found() {
        ApiError::NotFound
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        ApiError::field("non_field_errors", format!("JSON parse error - {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        ApiError::bad_request("Invalid query string.")
    } else if err.find::<LengthRequired>().is_some() {
        ApiError::bad_request("Empty request.")
    } else if err.find::<PayloadTooLarge>().is_some() {
        ApiError::PayloadTooLarge
    } else if err.find::<MethodNotAllowed>().is_some() {
        ApiError::MethodNotAllowed
    } else {
        ApiError::Internal(format!("Unhandled rejection: {err:?}"))
    };

    Ok(error.render())
}
