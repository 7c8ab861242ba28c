use actix_web::{post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthenticatedUser, RequireRole},
    errors::AppError,
    models::dto::{
        request::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
            SignupRequest,
        },
        response::{ApiResponse, MessageResponse},
    },
};

#[post("/signup")]
async fn signup(
    state: web::Data<AppState>,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.register(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(MessageResponse::new(
        "Registration successful! You can now log in.",
    )))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.login(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Login Successful!", response)))
}

#[post("/change-password", wrap = "RequireRole::any()")]
async fn change_password(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .change_password(auth.user(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed successfully")))
}

#[post("/forgot-password")]
async fn forgot_password(
    state: web::Data<AppState>,
    request: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.forgot_password(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password reset email sent")))
}

#[post("/reset-password")]
async fn reset_password(
    state: web::Data<AppState>,
    request: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.reset_password(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Password has been reset successfully",
    )))
}
