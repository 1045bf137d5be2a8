//! # Authentication Module
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user as two headers which these extractors turn into an [`Actor`]:
//!
//! - `x-user-id`: the user's UUID (required)
//! - `x-user-role`: `student`, `instructor` or `admin` (default: `student`)

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use officehours_core::{
    errors::QueueError,
    models::actor::{Actor, Role},
};
use uuid::Uuid;

use crate::middleware::error_handling::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Any authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

/// An authenticated user allowed to run office hours (instructor or admin).
#[derive(Debug, Clone, Copy)]
pub struct InstructorUser(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn actor_from_parts(parts: &Parts) -> Result<Actor, QueueError> {
    let user_id = header(parts, USER_ID_HEADER)
        .ok_or_else(|| QueueError::Authentication("Missing user identity".to_string()))?;
    let user_id = Uuid::parse_str(user_id.trim())
        .map_err(|_| QueueError::Authentication("Invalid user identity".to_string()))?;

    let role = match header(parts, USER_ROLE_HEADER) {
        Some(raw) => raw.trim().parse::<Role>().map_err(QueueError::Authentication)?,
        None => Role::Student,
    };

    Ok(Actor::new(user_id, role))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthUser(actor_from_parts(parts)?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for InstructorUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = actor_from_parts(parts)?;
        if !actor.can_teach() {
            return Err(QueueError::Forbidden("Instructor access required".to_string()).into());
        }
        Ok(InstructorUser(actor))
    }
}
