pub mod auth;
pub mod aws_clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod saved_memes;
pub mod session;
pub mod startup;
pub mod token;
pub mod validation;

use crate::{
    auth::AuthService,
    domain::{SavedMemeRepository, UserRepository},
    saved_memes::SavedMemeService,
    token::TokenService,
};
use std::sync::Arc;

/// AppState holds shared resources for the web server.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub saved_memes: SavedMemeService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        saved_memes: Arc<dyn SavedMemeRepository>,
        tokens: TokenService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            auth: AuthService::new(users, tokens.clone(), bcrypt_cost),
            saved_memes: SavedMemeService::new(saved_memes),
            tokens,
        }
    }
}
