use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::ApiError;

/// Claims of a provider-issued bearer token. Only `sub` matters to us; the
/// provider's other claims are ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Verifies an HS256 bearer token against the auth provider's shared secret
/// and returns the stable user id it carries.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // hosted-auth tokens carry an audience claim we don't care about
    validation.validate_aud = false;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::Unauthorized)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn make_token(sub: &str, exp: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_owned(),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_user_id() {
        let user_id = Uuid::new_v4();
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = make_token(&user_id.to_string(), exp, SECRET);
        assert_eq!(verify_token(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = make_token(&Uuid::new_v4().to_string(), exp, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = make_token(&Uuid::new_v4().to_string(), exp, "other-secret");
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = make_token("not-a-uuid", exp, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn bearer_token_requires_scheme_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
