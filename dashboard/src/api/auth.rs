//! Dashboard authentication
//!
//! The login token is the base64 encoding of `username:password`. It is an
//! obfuscated echo of the credentials, not a signed claim: anyone holding it
//! holds the credentials. Validity is re-derived from the configuration on
//! every request; there is no session store.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::AppState;

use super::error::{ApiError, AuthFailure};

/// Authenticated dashboard user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match verify_bearer(header, &state.config.web_username, &state.config.web_password) {
            Ok(username) => Ok(AuthenticatedUser { username }),
            Err(failure) => {
                tracing::debug!(reason = failure.message(), "Rejected API request");
                Err(ApiError::Unauthorized(failure))
            }
        }
    }
}

/// Issue the token for a credential pair
pub fn issue_token(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, password))
}

/// Decode a token into `(username, password)`, splitting on the first `:`
pub fn decode_token(token: &str) -> Result<(String, String), AuthFailure> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|_| AuthFailure::MalformedToken)?;
    let decoded = String::from_utf8(bytes).map_err(|_| AuthFailure::MalformedToken)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthFailure::MalformedToken)?;
    Ok((username.to_string(), password.to_string()))
}

/// Check an `Authorization` header value against the configured credentials
pub fn verify_bearer(
    header: Option<&str>,
    valid_username: &str,
    valid_password: &str,
) -> Result<String, AuthFailure> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthFailure::MissingToken)?;

    let (username, password) = decode_token(token)?;
    if username == valid_username && password == valid_password {
        Ok(username)
    } else {
        Err(AuthFailure::InvalidToken)
    }
}
