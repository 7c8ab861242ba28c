use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;

use crate::{
    app_state::AppState,
    auth::utils::{bearer_token, ADMIN_ONLY, ANY_ROLE, STUDENT_ONLY},
    errors::AppError,
    models::domain::user::{User, UserRole},
};

/// Route guard: verifies the bearer token, reloads the account from storage
/// and admits it only when its current role is in `allowed`.
#[derive(Clone, Copy)]
pub struct RequireRole {
    allowed: &'static [UserRole],
}

impl RequireRole {
    pub fn new(allowed: &'static [UserRole]) -> Self {
        Self { allowed }
    }

    pub fn admin() -> Self {
        Self::new(ADMIN_ONLY)
    }

    pub fn student() -> Self {
        Self::new(STUDENT_ONLY)
    }

    pub fn any() -> Self {
        Self::new(ANY_ROLE)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleService {
            service: Rc::new(service),
            allowed: self.allowed,
        }))
    }
}

pub struct RequireRoleService<S> {
    service: Rc<S>,
    allowed: &'static [UserRole],
}

impl<S, B> Service<ServiceRequest> for RequireRoleService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = self.allowed;

        Box::pin(async move {
            let user = match admit(&req, allowed).await {
                Ok(user) => user,
                Err(err) => return Ok(req.error_response(err).map_into_right_body()),
            };

            req.extensions_mut().insert(AuthenticatedUser(user));

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

async fn admit(req: &ServiceRequest, allowed: &[UserRole]) -> Result<User, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    let token = bearer_token(req)?;
    state.auth_service.authorize(&token, allowed).await
}

/// Extractor for the account admitted by `RequireRole`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn into_inner(self) -> User {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()));

        ready(user)
    }
}
