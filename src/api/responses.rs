use serde::Serialize;
use warp::{
    http::{header, HeaderValue, StatusCode},
    reply::{self, Response},
    Reply,
};

pub fn json<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn ok<T: Serialize>(value: &T) -> Response {
    json(value, StatusCode::OK)
}

pub fn created<T: Serialize>(value: &T) -> Response {
    json(value, StatusCode::CREATED)
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `text/plain` download named `filename`.
pub fn attachment(body: String, filename: &str) -> Response {
    let mut response = reply::with_header(body, header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename={filename}")) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
