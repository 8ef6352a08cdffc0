//! Request-scoped identity.
//!
//! Handlers name the identity they need as an argument: [`SessionUser`] for
//! the dashboard, [`WizardSession`] for the super-admin console. Each decodes
//! its own cookie, so a wizard token never authenticates a dashboard request
//! and a session token never opens the wizard console.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use pushpop_core::user::User;

use crate::{error::AppError, state::AppState};

use super::cookies::{read_cookie, SESSION_COOKIE, WIZARD_COOKIE};
use super::jwt::decode_jwt;

/// The signed-in dashboard user, re-read from the database on each request.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

impl SessionUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, SESSION_COOKIE).ok_or(AppError::Unauthorized)?;
        let claims =
            decode_jwt(&token, state.session_secret()).map_err(|_| AppError::Unauthorized)?;
        if claims.role.is_some() {
            return Err(AppError::Unauthorized);
        }

        let user = state
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if user.is_blocked {
            return Err(AppError::Forbidden("Account is blocked".to_string()));
        }
        Ok(SessionUser(user))
    }
}

/// Proof of a valid wizard token. Carries the configured admin email.
#[derive(Debug, Clone)]
pub struct WizardSession {
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for WizardSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, WIZARD_COOKIE).ok_or(AppError::Unauthorized)?;
        let claims =
            decode_jwt(&token, state.session_secret()).map_err(|_| AppError::Unauthorized)?;
        if !claims.is_wizard() {
            return Err(AppError::Unauthorized);
        }
        Ok(WizardSession { email: claims.sub })
    }
}
