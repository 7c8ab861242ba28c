use actix_web::{http::header::{Header, AUTHORIZATION}, HttpMessage};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};

use crate::{
    errors::{AppError, AppResult},
    models::domain::user::{User, UserRole},
};

pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
pub const STUDENT_ONLY: &[UserRole] = &[UserRole::Student];
pub const ANY_ROLE: &[UserRole] = &[UserRole::Student, UserRole::Admin];

pub fn require_role(user: &User, allowed: &[UserRole]) -> AppResult<()> {
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

/// Pulls the bearer token out of the `Authorization` header.
pub fn bearer_token<M: HttpMessage>(msg: &M) -> AppResult<String> {
    if !msg.headers().contains_key(AUTHORIZATION) {
        return Err(AppError::Unauthorized("No token provided".to_string()));
    }

    Authorization::<Bearer>::parse(msg)
        .map(|auth| auth.into_scheme().token().to_string())
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}
