//! Registration, login and current-user lookup.

use crate::{
    domain::UserRepository,
    errors::AppError,
    models::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, User},
    token::TokenService,
    validation::{
        DISPLAY_NAME_MAX_LEN, FieldErrors, PASSWORD_MIN_LEN, USERNAME_MAX_LEN, USERNAME_MIN_LEN,
        is_valid_email, is_valid_username,
    },
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenService, bcrypt_cost: u32) -> Self {
        Self { users, tokens, bcrypt_cost }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        validate_registration(&request)?;

        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;
        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            username: request.username,
            password_hash,
            display_name: request.display_name,
            avatar_url: None,
            created_at: Utc::now(),
        };
        // Uniqueness is decided by the store in the same write.
        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        self.respond_with_token(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        validate_login(&request)?;

        let Some(user) = self.users.find_by_email_or_username(&request.email_or_username).await? else {
            tracing::debug!("Login failed: unknown identifier");
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password(request.password, user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "Login failed: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.respond_with_token(&user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| PublicUser::from(&user))
            .ok_or(AppError::NotFound("User"))
    }

    fn respond_with_token(&self, user: &User) -> Result<AuthResponse, AppError> {
        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(AuthResponse { token, user: PublicUser::from(user) })
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !is_valid_email(&request.email) {
        errors.add("email", "Invalid email");
    }
    let username_len = request.username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
        errors.add(
            "username",
            format!("Username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters"),
        );
    } else if !is_valid_username(&request.username) {
        errors.add("username", "Username may only contain letters, numbers and underscores");
    }
    if request.password.chars().count() < PASSWORD_MIN_LEN {
        errors.add("password", format!("Password must be at least {PASSWORD_MIN_LEN} characters"));
    }
    if let Some(display_name) = &request.display_name {
        let len = display_name.chars().count();
        if len == 0 || len > DISPLAY_NAME_MAX_LEN {
            errors.add(
                "displayName",
                format!("Display name must be 1-{DISPLAY_NAME_MAX_LEN} characters"),
            );
        }
    }
    errors.into_result()
}

fn validate_login(request: &LoginRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if request.email_or_username.is_empty() {
        errors.add("emailOrUsername", "Email or username is required");
    }
    if request.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

// bcrypt is CPU-bound; keep it off the async workers.
async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password check task failed: {}", e)))?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            // An unreadable stored hash is treated like a wrong password.
            tracing::error!(error = %e, "Stored password hash could not be verified");
            Ok(false)
        }
    }
}
