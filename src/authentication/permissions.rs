use warp::http::Method;

use crate::{
    error::ApiError,
    schema::{Id, User},
};

/// Access rule attached to an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    AllowAny,
    IsAuthenticated,
    /// Anyone reads; authenticated users write; only the owner changes an object.
    OwnerOrReadOnly,
    /// `GET` only, whoever asks.
    ReadOnly,
    /// Endpoint kept for routing but closed to everyone.
    Blocked,
}

fn is_safe(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

fn is_write(method: &Method) -> bool {
    method == Method::POST || method == Method::PATCH || method == Method::DELETE
}

impl Permission {
    pub fn has_permission(self, method: &Method, user: Option<&User>) -> bool {
        let authenticated = user.is_some();

        match self {
            Permission::AllowAny => true,
            Permission::IsAuthenticated => authenticated,
            Permission::OwnerOrReadOnly => is_safe(method) || (is_write(method) && authenticated),
            Permission::ReadOnly => method == Method::GET,
            Permission::Blocked => false,
        }
    }

    pub fn has_object_permission(self, method: &Method, user: Option<&User>, owner: Id) -> bool {
        match self {
            Permission::OwnerOrReadOnly => {
                is_safe(method) || user.map(|user| user.id) == Some(owner)
            }
            Permission::Blocked => false,
            _ => true,
        }
    }

    pub fn check(self, method: &Method, user: Option<&User>) -> Result<(), ApiError> {
        match self.has_permission(method, user) {
            true => Ok(()),
            false => Err(denied(user)),
        }
    }

    pub fn check_object(self, method: &Method, user: Option<&User>, owner: Id) -> Result<(), ApiError> {
        match self.has_object_permission(method, user, owner) {
            true => Ok(()),
            false => Err(denied(user)),
        }
    }
}

/// Anonymous requesters are asked to authenticate, everyone else is refused.
fn denied(user: Option<&User>) -> ApiError {
    match user {
        None => ApiError::NotAuthenticated,
        Some(_) => ApiError::PermissionDenied,
    }
}
