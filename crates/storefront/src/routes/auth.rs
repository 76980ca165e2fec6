//! Authentication route handlers.
//!
//! Registration and login return an [`AuthSession`]; the client sends its
//! token back as `Authorization: Bearer <token>`.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::AuthSession;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub name: String,
}

/// Create an account and sign it in.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    let session = state
        .auth()
        .sign_up(&form.email, form.password.expose_secret(), &form.name)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sign in with email and password.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<Json<AuthSession>> {
    let session = state
        .auth()
        .sign_in(&form.email, form.password.expose_secret())
        .await?;
    Ok(Json(session))
}

/// Exchange the current token for a fresh one.
#[instrument(skip_all, fields(user_id = %auth.user.uid))]
pub async fn refresh(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<AuthSession>> {
    let session = state.auth().refresh_token(&auth.token).await?;
    Ok(Json(session))
}

/// Revoke the current token.
#[instrument(skip_all, fields(user_id = %auth.user.uid))]
pub async fn logout(State(state): State<AppState>, auth: RequireAuth) -> Result<StatusCode> {
    state.auth().sign_out(&auth.token).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
