//! HTTP Basic authentication for the admin routes.

use super::AppState;
use crate::errors::{Error, Result};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Credentials decoded from an `Authorization: Basic ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl BasicCredentials {
    /// Decodes the `Authorization` header, if it carries Basic credentials.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        Self::parse(value)
    }

    fn parse(value: &str) -> Option<Self> {
        let encoded = value.strip_prefix("Basic ")?.trim();
        let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Middleware rejecting requests whose credentials do not match the configured admin.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let authorized = BasicCredentials::from_headers(request.headers()).is_some_and(|c| {
        c.username == state.config.admin_user && c.password == state.config.admin_password
    });

    if !authorized {
        return Err(Error::Unauthorized);
    }
    Ok(next.run(request).await)
}
