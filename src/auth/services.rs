use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{AuthResponse, LoginRequest, SignupRequest},
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
    repo::UserRepo,
};
use crate::error::ApiError;

pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn checked_email(raw: &str) -> Result<String, ApiError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    Ok(email)
}

pub async fn signup(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: SignupRequest,
) -> Result<AuthResponse, ApiError> {
    let email = checked_email(&req.email)?;

    let len = req.password.chars().count();
    if len < PASSWORD_MIN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {PASSWORD_MIN} characters"
        )));
    }
    if len > PASSWORD_MAX {
        return Err(ApiError::Validation(format!(
            "Password must be at most {PASSWORD_MAX} characters"
        )));
    }

    let hash = hash_password_blocking(req.password).await?;

    let Some(user) = users.create(&email, &hash).await? else {
        warn!("signup for an already registered email");
        return Err(ApiError::Conflict("User already exists".into()));
    };

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user registered");
    Ok(AuthResponse {
        message: "User created successfully".into(),
        token,
        user: user.into(),
    })
}

pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    let email = checked_email(&req.email)?;
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    let Some(user) = users.find_by_email(&email).await? else {
        verify_dummy_blocking(req.password).await?;
        warn!("login for unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        message: "Login successful".into(),
        token,
        user: user.into(),
    })
}
