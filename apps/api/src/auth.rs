//! Bearer-token verification. Tokens are issued elsewhere; this service only
//! checks the HS256 signature and expiry and turns the claims into a `Principal`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{Principal, Role};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Principal, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {e}");
        AppError::Unauthorized
    })?;
    Ok(Principal::new(data.claims.sub, data.claims.role))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        verify_token(token, &state.config.jwt_secret)
    }
}

#[cfg(test)]
pub fn issue_token(principal: &Principal, secret: &str, ttl: chrono::Duration) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: principal.id,
        role: principal.role,
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 encoding cannot fail")
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use chrono::Duration;

    use super::*;
    use crate::marketplace::fixtures::{business, freelancer};

    const SECRET: &str = "test-secret";

    #[test]
    fn test_round_trip_token() {
        let who = freelancer();
        let token = issue_token(&who, SECRET, Duration::hours(1));
        assert_eq!(verify_token(&token, SECRET).unwrap(), who);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = issue_token(&business(), SECRET, Duration::hours(1));
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let token = issue_token(&business(), SECRET, Duration::hours(-2));
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_bearer_header_parsing() {
        let parts = |value: &str| {
            let (parts, _) = Request::builder()
                .header(AUTHORIZATION, value)
                .body(())
                .unwrap()
                .into_parts();
            parts
        };
        assert_eq!(bearer_token(&parts("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&parts("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&parts("Basic abc")), None);
        assert_eq!(bearer_token(&parts("Bearer ")), None);
    }
}
