mod database {
    pub mod actions;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod pagination;
    pub mod payload;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod api {
    pub mod auth;
    pub mod catalog;
    pub mod recipes;
    pub mod rejection;
    pub mod responses;
    pub mod routes;
    pub mod users;
}
pub mod config;
mod constants;
pub mod media;
pub mod serializers;
pub mod shopping;

pub use api::routes::routes;
pub use authentication::*;
pub use constants::*;
pub use database::*;
