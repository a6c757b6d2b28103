use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Profile, Role};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// An authenticated user whose role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Splits an `Authorization: Basic ...` header value into email and password.
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    if email.is_empty() {
        return None;
    }
    Some((email.to_string(), password.to_string()))
}

// Basic Auth extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let (email, password) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic_credentials)
            .ok_or(AppError::Unauthorized)?;

        let profile = Profile::find_by_email(&state.db.pool, &email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let matched = profile
            .check_password(&password)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !matched {
            warn!("Failed login for {}", email);
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn parses_email_and_password() {
        let parsed = parse_basic_credentials(&basic("rider@example.com:s3cret:with:colons"));
        assert_eq!(
            parsed,
            Some(("rider@example.com".to_string(), "s3cret:with:colons".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_basic_credentials("Bearer abc"), None);
        assert_eq!(parse_basic_credentials("Basic !!!not-base64"), None);
        assert_eq!(parse_basic_credentials(&basic("no-colon")), None);
        assert_eq!(parse_basic_credentials(&basic(":password")), None);
    }
}
