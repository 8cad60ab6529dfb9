//! Request filter chain.
//!
//! [`gate`] wraps the whole application and runs once per request, before
//! routing. What it enforces comes from the [`FilterChain`] registered as app
//! data. The default chain has CSRF protection disabled and permits every
//! request without looking at credentials.

use std::str::FromStr;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpRequest, ResponseError};
use log::{debug, warn};

use crate::errors::AppError;
use crate::utils::jwt;

pub mod password;

pub use password::PasswordEncoder;

pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Paths reachable without a token under [`AccessPolicy::Authenticated`].
const PUBLIC_PATHS: &[&str] = &["/register", "/authenticate", "/reset-password", "/verify-username/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessPolicy {
    #[default]
    PermitAll,
    Authenticated,
}

impl FromStr for AccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permit_all" | "permitall" => Ok(AccessPolicy::PermitAll),
            "authenticated" => Ok(AccessPolicy::Authenticated),
            other => Err(format!("unknown access policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrfProtection {
    #[default]
    Disabled,
    /// Unsafe methods must echo the `XSRF-TOKEN` cookie in `X-XSRF-TOKEN`.
    DoubleSubmitCookie,
}

impl FromStr for CsrfProtection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(CsrfProtection::Disabled),
            "double_submit" | "double_submit_cookie" => Ok(CsrfProtection::DoubleSubmitCookie),
            other => Err(format!("unknown csrf mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    pub csrf: CsrfProtection,
    pub policy: AccessPolicy,
    jwt_secret: Option<String>,
}

impl FilterChain {
    pub fn new(csrf: CsrfProtection, policy: AccessPolicy, jwt_secret: Option<String>) -> Self {
        FilterChain {
            csrf,
            policy,
            jwt_secret,
        }
    }

    /// CSRF off, every request authorized.
    pub fn permit_all() -> Self {
        Self::default()
    }

    /// Runs the CSRF filter, then the authorization filter.
    pub fn check(&self, req: &HttpRequest) -> Result<(), AppError> {
        self.check_csrf(req)?;
        self.check_authorization(req)
    }

    fn check_csrf(&self, req: &HttpRequest) -> Result<(), AppError> {
        if self.csrf == CsrfProtection::Disabled || req.method().is_safe() {
            return Ok(());
        }

        let cookie = req.cookie(XSRF_COOKIE);
        let header = req.headers().get(XSRF_HEADER).and_then(|v| v.to_str().ok());

        match (cookie, header) {
            (Some(cookie), Some(header)) if !header.is_empty() && cookie.value() == header => Ok(()),
            _ => Err(AppError::Forbidden("Missing or invalid CSRF token".to_string())),
        }
    }

    fn check_authorization(&self, req: &HttpRequest) -> Result<(), AppError> {
        if self.policy == AccessPolicy::PermitAll || is_public_path(req.path()) {
            return Ok(());
        }

        let token = bearer_token(req).ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

        let secret = self
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Token verification is not configured".to_string()))?;

        let claims = jwt::validate_token(token, secret)?;
        debug!("Authenticated request from '{}'", claims.sub);
        Ok(())
    }
}

/// The token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|public| if public.ends_with('/') { path.starts_with(public) } else { path == *public })
}

/// Middleware entry point, registered with `middleware::from_fn`.
pub async fn gate<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let verdict = match req.app_data::<web::Data<FilterChain>>() {
        Some(chain) => chain.check(req.request()),
        None => {
            warn!("No filter chain registered, permitting {} {}", req.method(), req.path());
            FilterChain::permit_all().check(req.request())
        }
    };

    match verdict {
        Ok(()) => {
            debug!("{} {} passed the filter chain", req.method(), req.path());
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(err) => {
            warn!("{} {} rejected: {}", req.method(), req.path(), err);
            let response = err.error_response();
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}
