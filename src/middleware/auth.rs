use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::{dto::auth::Claims, error::AppError, state::AppState};

/// The caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let user_id = verify_token(token, &state.auth.jwt_secret)?;
        Ok(AuthUser { user_id })
    }
}

/// Validates signature and expiry, returning the user id in `sub`.
pub fn verify_token(token: &str, secret: &str) -> Result<i32, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    decoded
        .claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::issue_token;

    #[test]
    fn round_trips_issued_token() {
        let token = issue_token(7, "s3cret", 1).unwrap();
        assert_eq!(verify_token(&token, "s3cret").unwrap(), 7);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue_token(7, "s3cret", 1).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
