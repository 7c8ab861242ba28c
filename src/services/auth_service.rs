use std::sync::Arc;

use mongodb::bson::DateTime;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::{
        password::{generate_reset_token, hash_password, hash_token, verify_password},
        require_role, Claims, JwtService,
    },
    config::Config,
    db::parse_object_id,
    errors::{AppError, AppResult},
    models::{
        domain::{user::actions, ActivityEntry, User, UserRole},
        dto::{
            request::{
                AdminResetPasswordRequest, ChangePasswordRequest, ForgotPasswordRequest,
                LoginRequest, ResetPasswordRequest, SignupRequest,
            },
            response::LoginResponse,
        },
    },
    repositories::UserRepository,
    services::mailer::ResetMailer,
};

const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

fn invalid_token() -> AppError {
    AppError::Unauthorized("Invalid token".to_string())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtService,
    mailer: Arc<dyn ResetMailer>,
    admin_code: SecretString,
    frontend_url: String,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, mailer: Arc<dyn ResetMailer>, config: &Config) -> Self {
        Self {
            users,
            jwt: JwtService::new(&config.jwt_secret, config.jwt_expiration_hours),
            mailer,
            admin_code: config.admin_code.clone(),
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub async fn register(&self, request: SignupRequest) -> AppResult<User> {
        request.check_required()?;
        let role: UserRole = request
            .role
            .trim()
            .parse()
            .map_err(|_| AppError::ValidationError("All fields are required".to_string()))?;
        validator::Validate::validate(&request)?;

        if role == UserRole::Admin {
            let supplied = request.admin_code.as_deref().unwrap_or_default();
            if supplied != self.admin_code.expose_secret() {
                log::warn!("Rejected admin signup for {} with a bad admin code", request.email);
                return Err(AppError::Forbidden("Invalid admin code".to_string()));
            }
        }

        let email = request.email.trim().to_string();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists(
                "User with this email id already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let mut user = User::new(request.full_name.trim(), &email, &password_hash, role);
        user.activity_log.push(ActivityEntry::now(actions::REGISTER));

        let user = self.users.create(user).await?;
        log::info!("Registered {} account {}", user.role, user.id_hex());
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.check_required()?;

        let user = self
            .users
            .find_by_email(request.email.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized("User does not exist".to_string()))?;

        if !verify_password(&request.password, &user.password).await? {
            log::warn!("Failed login for account {}", user.id_hex());
            return Err(AppError::Unauthorized("Password is incorrect".to_string()));
        }

        if !user.is_active {
            log::warn!("Login attempt on deactivated account {}", user.id_hex());
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        self.users.record_login(&user.id, DateTime::now()).await?;
        let token = self.jwt.create_token(&user)?;

        log::info!("User {} logged in", user.id_hex());
        Ok(LoginResponse {
            token,
            role: user.role,
        })
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        self.jwt.validate_token(token)
    }

    /// Resolves a bearer token to the current stored account and checks its
    /// role. Token problems and vanished or deactivated accounts are all
    /// reported as "Invalid token".
    pub async fn authorize(&self, token: &str, allowed: &[UserRole]) -> AppResult<User> {
        let claims = self.verify_token(token)?;
        let id = parse_object_id(&claims.sub).map_err(|_| invalid_token())?;

        let user = match self.users.find_by_id(&id).await? {
            Some(user) if user.is_active => user,
            Some(_) => {
                log::warn!("Rejected token for deactivated account {}", claims.sub);
                return Err(invalid_token());
            }
            None => {
                log::warn!("Rejected token for missing account {}", claims.sub);
                return Err(invalid_token());
            }
        };

        require_role(&user, allowed)?;
        Ok(user)
    }

    pub async fn change_password(&self, user: &User, request: ChangePasswordRequest) -> AppResult<()> {
        if request.old_password.is_empty() || request.new_password.is_empty() {
            return Err(AppError::ValidationError(
                "Old and new password required".to_string(),
            ));
        }

        if !verify_password(&request.old_password, &user.password).await? {
            return Err(AppError::Unauthorized("Old password incorrect".to_string()));
        }

        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;
        let updated = self
            .users
            .set_password(&user.id, &password_hash, ActivityEntry::now(actions::CHANGE_PASSWORD))
            .await?;
        if !updated {
            return Err(user_not_found());
        }

        log::info!("User {} changed password", user.id_hex());
        Ok(())
    }

    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> AppResult<()> {
        let email = request.email.trim();
        if email.is_empty() {
            return Err(AppError::ValidationError("Email is required".to_string()));
        }

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(user_not_found)?;

        let token = generate_reset_token();
        let expires = DateTime::from_millis(DateTime::now().timestamp_millis() + RESET_TOKEN_TTL_MS);
        self.users
            .set_reset_token(
                &user.id,
                &hash_token(&token),
                expires,
                ActivityEntry::now(actions::FORGOT_PASSWORD),
            )
            .await?;

        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        self.mailer.send_reset_link(&user.email, &link).await?;

        log::info!("Issued password reset token for {}", user.id_hex());
        Ok(())
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AppResult<()> {
        if request.token.is_empty() || request.new_password.is_empty() {
            return Err(AppError::ValidationError(
                "Token and new password required".to_string(),
            ));
        }

        let invalid = || AppError::ValidationError("Invalid or expired token".to_string());
        let digest = hash_token(&request.token);

        // Cheap rejection before paying for a bcrypt hash.
        self.users
            .find_by_reset_token(&digest, DateTime::now())
            .await?
            .ok_or_else(invalid)?;

        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;
        let user = self
            .users
            .consume_reset_token(
                &digest,
                DateTime::now(),
                &password_hash,
                ActivityEntry::now(actions::RESET_PASSWORD),
            )
            .await?
            .ok_or_else(invalid)?;

        log::info!("User {} reset password with a reset token", user.id_hex());
        Ok(())
    }

    pub async fn admin_reset_password(
        &self,
        admin: &User,
        user_id: &str,
        request: AdminResetPasswordRequest,
    ) -> AppResult<()> {
        if request.new_password.is_empty() {
            return Err(AppError::ValidationError("New password required".to_string()));
        }
        let id = parse_object_id(user_id)?;

        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;
        let updated = self
            .users
            .set_password(&id, &password_hash, ActivityEntry::now(actions::ADMIN_RESET_PASSWORD))
            .await?;
        if !updated {
            return Err(user_not_found());
        }

        log::info!("Admin {} reset the password of {}", admin.id_hex(), user_id);
        Ok(())
    }
}
