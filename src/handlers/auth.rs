use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::errors::AppError;
use crate::security::bearer_token;
use crate::startup::AppState;
use crate::utils::jwt;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(length(min = 3, max = 50))]
    username: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    username: String,
    #[validate(length(min = 8, max = 128))]
    new_password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    username: String,
    token: String,
}

fn hash_password(state: &AppState, raw: &str) -> Result<String, AppError> {
    state
        .passwords
        .encode(raw)
        .map_err(|_| AppError::InternalServerError("Hashing error".to_string()))
}

pub async fn register(
    state: web::Data<AppState>,
    req: web::Json<AuthRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*req)?;

    if state.store.find_user(&req.username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&state, &req.password)?;
    let user = state.store.insert_user(&req.username, &password_hash).await?;
    info!("Registered user '{}'", user.username);

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "username": user.username,
    })))
}

pub async fn authenticate(
    state: web::Data<AppState>,
    req: web::Json<AuthRequest>,
) -> Result<HttpResponse, AppError> {
    let secret = state
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::InternalServerError("Token signing is not configured".to_string()))?;

    let user = state.store.find_user(&req.username).await?;
    let user = match user {
        Some(user) if state.passwords.matches(&req.password, &user.password) => user,
        _ => {
            warn!("Failed login for '{}'", req.username);
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let token = jwt::generate_token(&user.username, secret)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        username: user.username,
        token,
    }))
}

pub async fn verify_username(
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let username = username.into_inner();

    match state.store.find_user(&username).await? {
        Some(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Username verified",
        }))),
        None => Err(AppError::NotFound("Username not found".to_string())),
    }
}

pub async fn reset_password(
    state: web::Data<AppState>,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*req)?;

    if state.store.find_user(&req.username).await?.is_none() {
        return Err(AppError::NotFound("Username not found".to_string()));
    }

    let password_hash = hash_password(&state, &req.new_password)?;
    state.store.update_password(&req.username, &password_hash).await?;
    info!("Password reset for '{}'", req.username);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password reset successfully",
    })))
}

/// Resolves the caller from their bearer token, whatever the gate's policy.
pub async fn current_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req).ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let secret = state
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Token verification is not configured".to_string()))?;

    let claims = jwt::validate_token(token, secret)?;

    let user = state
        .store
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "username": user.username,
    })))
}
