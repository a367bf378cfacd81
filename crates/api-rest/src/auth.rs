//! Request authentication.
//!
//! Every route except `/health` needs the shared API key in `x-api-key`. The actor's role is
//! taken from `x-ward-role`, as resolved upstream by the identity provider.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ward_core::Role;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ROLE_HEADER: &str = "x-ward-role";

/// An authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
}

/// Validates the provided API key against the configured one.
///
/// An empty configured key rejects every request.
pub fn validate_api_key(provided: &str, expected: &str) -> Result<(), ApiError> {
    if !expected.is_empty() && provided == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        validate_api_key(key, &state.api_key)?;

        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest(format!("missing {ROLE_HEADER} header")))?;
        let role = role
            .parse::<Role>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(Actor { role })
    }
}
