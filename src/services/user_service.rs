use std::{collections::HashMap, sync::Arc};

use mongodb::bson::{oid::ObjectId, DateTime};
use validator::Validate;

use crate::{
    db::parse_object_id,
    errors::{AppError, AppResult},
    models::{
        domain::{user::actions, ActivityEntry, User, UserRole},
        dto::{
            request::{UpdateProfileRequest, UserSearchQuery},
            response::{UserRef, UserStats, UserSummary},
        },
    },
    repositories::{UserChanges, UserFilter, UserRepository},
};

const RECENT_LOGIN_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Loads the users behind `ids` so that referencing documents can embed
/// `{_id, fullName, email}`.
pub async fn load_user_refs(
    users: &dyn UserRepository,
    ids: impl IntoIterator<Item = ObjectId>,
) -> AppResult<HashMap<ObjectId, UserSummary>> {
    let mut ids: Vec<ObjectId> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();

    let found = users.find_by_ids(&ids).await?;
    Ok(found.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

/// Falls back to the bare id when the user no longer exists.
pub fn user_ref(refs: &HashMap<ObjectId, UserSummary>, id: &ObjectId) -> UserRef {
    match refs.get(id) {
        Some(summary) => UserRef::Populated(summary.clone()),
        None => UserRef::Id(id.to_hex()),
    }
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        let id = parse_object_id(id)?;
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(user_not_found)
    }

    pub async fn list_active(&self) -> AppResult<Vec<User>> {
        self.repository.find_active().await
    }

    pub async fn search(&self, query: UserSearchQuery) -> AppResult<Vec<User>> {
        let role = match non_blank(query.role) {
            Some(role) => Some(role.parse::<UserRole>()?),
            None => None,
        };

        let filter = UserFilter {
            name: non_blank(query.name),
            email: non_blank(query.email),
            role,
        };
        self.repository.search(filter).await
    }

    /// Appends `action` to the actor's own activity log.
    pub async fn record_action(&self, actor: &User, action: &str) -> AppResult<()> {
        if !self
            .repository
            .append_activity(&actor.id, ActivityEntry::now(action))
            .await?
        {
            log::warn!("Could not log '{}' for missing account {}", action, actor.id_hex());
        }
        Ok(())
    }

    pub async fn delete_user(&self, admin: &User, id: &str) -> AppResult<()> {
        let id = parse_object_id(id)?;
        if !self.repository.delete(&id).await? {
            return Err(user_not_found());
        }

        self.record_action(admin, actions::ADMIN_DELETE_USER).await?;
        log::info!("Admin {} deleted user {}", admin.id_hex(), id.to_hex());
        Ok(())
    }

    pub async fn set_active(&self, admin: &User, id: &str, active: bool) -> AppResult<User> {
        let id = parse_object_id(id)?;
        let changes = UserChanges {
            is_active: Some(active),
            ..Default::default()
        };
        let user = self
            .repository
            .update_fields(&id, changes)
            .await?
            .ok_or_else(user_not_found)?;

        let action = if active {
            actions::ADMIN_ACTIVATE_USER
        } else {
            actions::ADMIN_DEACTIVATE_USER
        };
        self.record_action(admin, action).await?;

        log::info!(
            "Admin {} set isActive={} on user {}",
            admin.id_hex(),
            active,
            user.id_hex()
        );
        Ok(user)
    }

    pub async fn promote(&self, admin: &User, id: &str) -> AppResult<User> {
        let id = parse_object_id(id)?;
        let changes = UserChanges {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        let user = self
            .repository
            .update_fields(&id, changes)
            .await?
            .ok_or_else(user_not_found)?;

        self.record_action(admin, actions::ADMIN_PROMOTE_USER).await?;
        log::info!("Admin {} promoted user {}", admin.id_hex(), user.id_hex());
        Ok(user)
    }

    pub async fn update_profile(&self, user: &User, request: UpdateProfileRequest) -> AppResult<User> {
        let request = UpdateProfileRequest {
            full_name: non_blank(request.full_name),
            p_number: non_blank(request.p_number),
        };
        request.validate()?;

        let changes = UserChanges {
            full_name: request.full_name,
            p_number: request.p_number,
            ..Default::default()
        };
        let updated = self
            .repository
            .update_fields(&user.id, changes)
            .await?
            .ok_or_else(user_not_found)?;

        self.record_action(&updated, actions::UPDATE_PROFILE).await?;
        Ok(updated)
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    pub async fn stats(&self) -> AppResult<UserStats> {
        let since = DateTime::from_millis(DateTime::now().timestamp_millis() - RECENT_LOGIN_WINDOW_MS);
        self.repository.stats(since).await
    }
}
