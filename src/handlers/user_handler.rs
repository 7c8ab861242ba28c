use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, RequireRole},
    db::parse_object_id,
    errors::{AppError, AppResult},
    models::{
        domain::{user::actions, User},
        dto::{
            request::{AdminResetPasswordRequest, UpdateProfileRequest, UserSearchQuery},
            response::{
                ActivityLogBody, ActivityOwner, ApiResponse, MessageResponse, ProfilePicBody,
                UserBody, UserDto, UsersBody, UserStatsBody,
            },
        },
    },
    services::PicUpload,
};

const PROFILE_PIC_FIELD: &str = "profilePic";

fn users_body(users: Vec<User>) -> UsersBody {
    UsersBody {
        users: users.into_iter().map(UserDto::from).collect(),
    }
}

fn user_body(user: User) -> UserBody {
    UserBody { user: user.into() }
}

/// Streams the `profilePic` part of a multipart body into the picture store.
async fn store_profile_pic(state: &AppState, user_id: &ObjectId, mut payload: Multipart) -> AppResult<String> {
    while let Some(field) = payload.try_next().await? {
        if field.name() != Some(PROFILE_PIC_FIELD) {
            continue;
        }

        let upload = PicUpload {
            file_name: field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string),
            content_type: field.content_type().cloned(),
        };
        if upload.file_name.is_none() {
            break;
        }

        return state.profile_pic_store.save(user_id, upload, field).await;
    }

    Err(AppError::ValidationError("No file uploaded".to_string()))
}

#[get("/users", wrap = "RequireRole::admin()")]
async fn list_users(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let users = state.user_service.list_active().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users_body(users))))
}

#[get("/users/search", wrap = "RequireRole::admin()")]
async fn search_users(
    state: web::Data<AppState>,
    query: web::Query<UserSearchQuery>,
) -> Result<HttpResponse, AppError> {
    let users = state.user_service.search(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users_body(users))))
}

#[delete("/users/{id}", wrap = "RequireRole::admin()")]
async fn delete_user(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.user_service.delete_user(auth.user(), &id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted")))
}

#[patch("/users/{id}/deactivate", wrap = "RequireRole::admin()")]
async fn deactivate_user(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.set_active(auth.user(), &id, false).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("User deactivated", user_body(user))))
}

#[patch("/users/{id}/activate", wrap = "RequireRole::admin()")]
async fn activate_user(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.set_active(auth.user(), &id, true).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("User activated", user_body(user))))
}

#[patch("/users/{id}/promote", wrap = "RequireRole::admin()")]
async fn promote_user(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.promote(auth.user(), &id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "User promoted to admin",
        user_body(user),
    )))
}

#[post("/users/{id}/reset-password", wrap = "RequireRole::admin()")]
async fn admin_reset_password(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
    request: web::Json<AdminResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .admin_reset_password(auth.user(), &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User password reset successfully")))
}

#[get("/users/{id}/activity-log", wrap = "RequireRole::admin()")]
async fn user_activity_log(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.get_user(&id).await?;
    let body = ActivityLogBody {
        activity_log: user.activity_log.into_iter().map(Into::into).collect(),
        user: Some(ActivityOwner {
            full_name: user.full_name,
            email: user.email,
        }),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(body)))
}

#[post("/users/{id}/profile-pic", wrap = "RequireRole::admin()")]
async fn admin_upload_profile_pic(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let user_id = parse_object_id(&id)?;
    let profile_pic = store_profile_pic(&state, &user_id, payload).await?;
    state
        .user_service
        .record_action(auth.user(), actions::ADMIN_UPLOAD_PROFILE_PIC)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "Profile picture updated",
        ProfilePicBody { profile_pic },
    )))
}

#[get("/me", wrap = "RequireRole::student()")]
async fn get_profile(auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_body(auth.into_inner()))))
}

#[put("/me", wrap = "RequireRole::student()")]
async fn update_profile(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .update_profile(auth.user(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Profile updated", user_body(user))))
}

#[get("/me/activity-log", wrap = "RequireRole::student()")]
async fn own_activity_log(auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let body = ActivityLogBody {
        activity_log: auth.into_inner().activity_log.into_iter().map(Into::into).collect(),
        user: None,
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(body)))
}

#[post("/me/profile-pic", wrap = "RequireRole::student()")]
async fn upload_profile_pic(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let user = auth.user();
    let profile_pic = store_profile_pic(&state, &user.id, payload).await?;
    state
        .user_service
        .record_action(user, actions::UPLOAD_PROFILE_PIC)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        "Profile picture updated",
        ProfilePicBody { profile_pic },
    )))
}

#[get("/admin/stats", wrap = "RequireRole::admin()")]
async fn admin_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = state.user_service.stats().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(UserStatsBody { stats })))
}

#[get("/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
async fn health_check_ready(state: web::Data<AppState>) -> HttpResponse {
    let db_health = state.user_service.ping().await;
    if let Err(e) = &db_health {
        log::warn!("Readiness check failed: {}", e);
    }

    let response = serde_json::json!({
        "status": if db_health.is_ok() { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "mongodb": if db_health.is_ok() { "ok" } else { "error" }
        }
    });

    if db_health.is_ok() {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[get("/health/live")]
async fn health_check_live() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
