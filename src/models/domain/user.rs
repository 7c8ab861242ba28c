use std::fmt;
use std::str::FromStr;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            other => Err(AppError::ValidationError(format!("Unknown role '{}'", other))),
        }
    }
}

/// Action names recorded in a user's activity log.
pub mod actions {
    pub const REGISTER: &str = "register";
    pub const LOGIN: &str = "login";
    pub const CHANGE_PASSWORD: &str = "change-password";
    pub const FORGOT_PASSWORD: &str = "forgot-password";
    pub const RESET_PASSWORD: &str = "reset-password";
    pub const UPDATE_PROFILE: &str = "update-profile";
    pub const UPLOAD_PROFILE_PIC: &str = "upload-profile-pic";
    pub const ADMIN_DELETE_USER: &str = "admin-delete-user";
    pub const ADMIN_DEACTIVATE_USER: &str = "admin-deactivate-user";
    pub const ADMIN_ACTIVATE_USER: &str = "admin-activate-user";
    pub const ADMIN_PROMOTE_USER: &str = "admin-promote-user";
    pub const ADMIN_RESET_PASSWORD: &str = "admin-reset-password";
    pub const ADMIN_UPLOAD_PROFILE_PIC: &str = "admin-upload-profile-pic";
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityEntry {
    pub action: String,
    pub timestamp: DateTime,
}

impl ActivityEntry {
    pub fn now(action: &str) -> Self {
        Self {
            action: action.to_string(),
            timestamp: DateTime::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_number: Option<String>,
    /// bcrypt hash, never the plaintext.
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    /// SHA-256 digest of the outstanding reset token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(full_name: &str, email: &str, password_hash: &str, role: UserRole) -> Self {
        User {
            id: ObjectId::new(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            p_number: None,
            password: password_hash.to_string(),
            role,
            is_active: true,
            activity_log: Vec::new(),
            profile_pic: None,
            last_login: None,
            reset_password_token: None,
            reset_password_expires: None,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.to_hex()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
