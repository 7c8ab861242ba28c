use std::future::IntoFuture;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::{map_duplicate, Database},
    errors::AppResult,
    models::{
        domain::{user::actions, ActivityEntry, User, UserRole},
        dto::response::UserStats,
    },
};

const DUPLICATE_EMAIL: &str = "User with this email id already exists";

/// Search criteria; `name` and `email` are case-insensitive substrings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

/// Field changes applied by `update_fields`. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub p_number: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Finds the holder of an unexpired reset token digest.
    async fn find_by_reset_token(&self, token_hash: &str, now: DateTime) -> AppResult<Option<User>>;
    async fn find_active(&self) -> AppResult<Vec<User>>;
    async fn search(&self, filter: UserFilter) -> AppResult<Vec<User>>;
    /// Applies `changes`, returning the updated user or `None` when absent.
    async fn update_fields(&self, id: &ObjectId, changes: UserChanges) -> AppResult<Option<User>>;
    async fn record_login(&self, id: &ObjectId, at: DateTime) -> AppResult<()>;
    async fn append_activity(&self, id: &ObjectId, entry: ActivityEntry) -> AppResult<bool>;
    /// Replaces the password hash, clears any reset token and logs `entry`.
    async fn set_password(&self, id: &ObjectId, password_hash: &str, entry: ActivityEntry) -> AppResult<bool>;
    /// Sets the password for the holder of a live reset token in one write,
    /// consuming the token. `None` when no account holds it any more.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime,
        password_hash: &str,
        entry: ActivityEntry,
    ) -> AppResult<Option<User>>;
    async fn set_reset_token(
        &self,
        id: &ObjectId,
        token_hash: &str,
        expires: DateTime,
        entry: ActivityEntry,
    ) -> AppResult<bool>;
    async fn set_profile_pic(&self, id: &ObjectId, path: Option<String>) -> AppResult<bool>;
    async fn delete(&self, id: &ObjectId) -> AppResult<bool>;
    async fn stats(&self, recent_since: DateTime) -> AppResult<UserStats>;
    async fn ensure_indexes(&self) -> AppResult<()>;
    async fn ping(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
    db: Database,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("users");
        Self {
            collection,
            db: db.clone(),
        }
    }
}

fn activity_push(entry: &ActivityEntry) -> AppResult<Document> {
    Ok(doc! { "activityLog": bson::to_bson(entry)? })
}

fn changes_document(changes: &UserChanges) -> Document {
    let mut set = Document::new();
    if let Some(full_name) = &changes.full_name {
        set.insert("fullName", full_name);
    }
    if let Some(p_number) = &changes.p_number {
        set.insert("pNumber", p_number);
    }
    if let Some(role) = changes.role {
        set.insert("role", role.as_str());
    }
    if let Some(is_active) = changes.is_active {
        set.insert("isActive", is_active);
    }
    set
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        self.collection
            .insert_one(&user)
            .await
            .map_err(|e| map_duplicate(e, DUPLICATE_EMAIL))?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(doc! { "_id": { "$in": ids } }).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_by_reset_token(&self, token_hash: &str, now: DateTime) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! {
                "resetPasswordToken": token_hash,
                "resetPasswordExpires": { "$gt": now },
            })
            .await?;
        Ok(user)
    }

    async fn find_active(&self) -> AppResult<Vec<User>> {
        let cursor = self.collection.find(doc! { "isActive": true }).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn search(&self, filter: UserFilter) -> AppResult<Vec<User>> {
        let mut query = Document::new();
        if let Some(name) = &filter.name {
            query.insert("fullName", doc! { "$regex": regex::escape(name), "$options": "i" });
        }
        if let Some(email) = &filter.email {
            query.insert("email", doc! { "$regex": regex::escape(email), "$options": "i" });
        }
        if let Some(role) = filter.role {
            query.insert("role", role.as_str());
        }

        let cursor = self.collection.find(query).await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users)
    }

    async fn update_fields(&self, id: &ObjectId, changes: UserChanges) -> AppResult<Option<User>> {
        let set = changes_document(&changes);
        if set.is_empty() {
            return self.find_by_id(id).await;
        }

        let user = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: &ObjectId, at: DateTime) -> AppResult<()> {
        let entry = ActivityEntry {
            action: actions::LOGIN.to_string(),
            timestamp: at,
        };
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "lastLogin": at },
                    "$push": activity_push(&entry)?,
                },
            )
            .await?;
        Ok(())
    }

    async fn append_activity(&self, id: &ObjectId, entry: ActivityEntry) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$push": activity_push(&entry)? })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn set_password(&self, id: &ObjectId, password_hash: &str, entry: ActivityEntry) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "password": password_hash },
                    "$unset": { "resetPasswordToken": "", "resetPasswordExpires": "" },
                    "$push": activity_push(&entry)?,
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime,
        password_hash: &str,
        entry: ActivityEntry,
    ) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one_and_update(
                doc! {
                    "resetPasswordToken": token_hash,
                    "resetPasswordExpires": { "$gt": now },
                },
                doc! {
                    "$set": { "password": password_hash },
                    "$unset": { "resetPasswordToken": "", "resetPasswordExpires": "" },
                    "$push": activity_push(&entry)?,
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: &ObjectId,
        token_hash: &str,
        expires: DateTime,
        entry: ActivityEntry,
    ) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "resetPasswordToken": token_hash,
                        "resetPasswordExpires": expires,
                    },
                    "$push": activity_push(&entry)?,
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn set_profile_pic(&self, id: &ObjectId, path: Option<String>) -> AppResult<bool> {
        let update = match path {
            Some(path) => doc! { "$set": { "profilePic": path } },
            None => doc! { "$unset": { "profilePic": "" } },
        };
        let result = self.collection.update_one(doc! { "_id": id }, update).await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn stats(&self, recent_since: DateTime) -> AppResult<UserStats> {
        let (total, active, inactive, admins, students, recent_logins) = futures::try_join!(
            self.collection.count_documents(doc! {}).into_future(),
            self.collection.count_documents(doc! { "isActive": true }).into_future(),
            self.collection.count_documents(doc! { "isActive": false }).into_future(),
            self.collection.count_documents(doc! { "role": "admin" }).into_future(),
            self.collection.count_documents(doc! { "role": "student" }).into_future(),
            self.collection
                .count_documents(doc! { "lastLogin": { "$gte": recent_since } })
                .into_future(),
        )?;

        Ok(UserStats {
            total,
            active,
            inactive,
            admins,
            students,
            recent_logins,
        })
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let options = IndexOptions::builder()
            .unique(true)
            .name("email_unique".to_string())
            .build();
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(options)
            .build();
        self.collection.create_index(model).await?;
        log::info!("Created unique index on users.email");

        let reset_model = IndexModel::builder()
            .keys(doc! { "resetPasswordToken": 1 })
            .options(
                IndexOptions::builder()
                    .sparse(true)
                    .name("reset_token".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(reset_model).await?;
        log::info!("Created index on users.resetPasswordToken");

        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        self.db.health_check().await
    }
}
