//! Request extractors: user identity from a JWT Bearer token or X-User-Id
//! header (dev mode), and JSON bodies that fail with the API error envelope.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;
use serde_json::Value;

use planner_core::{User, UserId, ValidationError};
use planner_store::StoreError;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Header accepted as identity when `ALLOW_DEV_IDENTITY` is set.
pub const DEV_IDENTITY_HEADER: &str = "X-User-Id";

/// JWT claims structure.
///
/// Tokens are issued elsewhere; either `sub` or `user_id` carries the
/// user's primary key, as a string or a number.
#[derive(Debug, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub iss: Option<String>,
}

impl Claims {
    fn user(&self) -> Option<UserId> {
        self.user_id
            .as_ref()
            .or(self.sub.as_ref())
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .map(UserId)
    }
}

/// The authenticated user making the request.
///
/// Priority:
/// 1. `Authorization: Bearer <jwt>`, HS256 with expiry (and issuer, when
///    configured) checked.
/// 2. `X-User-Id` header, only if `allow_dev_identity` is true in config.
/// 3. Otherwise `NotAuthenticated`.
///
/// The resolved user must exist in the relational store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();

        let user_id = if let Some(auth_header) = parts.headers.get("Authorization") {
            let auth_str = auth_header.to_str().map_err(|_| {
                ApiError::AuthenticationFailed(
                    "Authorization header contains invalid characters".into(),
                )
            })?;
            let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
                ApiError::AuthenticationFailed("Unsupported authorization scheme".into())
            })?;
            user_from_jwt(token.trim(), config)?
        } else if config.allow_dev_identity
            && let Some(header) = parts.headers.get(DEV_IDENTITY_HEADER)
        {
            let raw = header.to_str().map_err(|_| {
                ApiError::AuthenticationFailed("X-User-Id header contains invalid characters".into())
            })?;
            let id: UserId = raw.trim().parse().map_err(|_| {
                ApiError::AuthenticationFailed(format!("Invalid user id '{}'", raw))
            })?;
            tracing::debug!(user_id = %id, "Using dev identity from X-User-Id header");
            id
        } else {
            return Err(ApiError::NotAuthenticated);
        };

        match state.repository().get_user(user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(StoreError::UserNotFound(_)) => {
                tracing::debug!(user_id = %user_id, "Token refers to an unknown user");
                Err(ApiError::AuthenticationFailed("User not found".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A JSON request body.
///
/// An empty body reads as `null`. Malformed JSON is a 400 `parse_error`
/// rendered like every other API error.
#[derive(Debug, Clone)]
pub struct JsonPayload(pub Value);

impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            ApiError::Validation(ValidationError::non_field(
                "parse_error",
                format!("Could not read request body: {}", e),
            ))
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(Value::Null));
        }
        serde_json::from_slice(&bytes).map(Self).map_err(|e| {
            ApiError::Validation(ValidationError::non_field(
                "parse_error",
                format!("JSON parse error - {}", e),
            ))
        })
    }
}

/// Validate the JWT and extract the user id from its claims.
fn user_from_jwt(token: &str, config: &ServerConfig) -> Result<UserId, ApiError> {
    if config.jwt_secret.is_empty() {
        return Err(ApiError::AuthenticationFailed(
            "Token authentication is not enabled".into(),
        ));
    }

    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());
    if let Some(issuer) = &config.jwt_issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data: TokenData<Claims> =
        jsonwebtoken::decode(token, &key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::AuthenticationFailed("Given token not valid for any token type".into())
        })?;

    token_data.claims.user().ok_or_else(|| {
        ApiError::AuthenticationFailed("Token contained no recognizable user identification".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn test_config(issuer: Option<&str>) -> ServerConfig {
        ServerConfig {
            jwt_secret: SECRET.to_string(),
            jwt_issuer: issuer.map(String::from),
            ..ServerConfig::default()
        }
    }

    fn token(claims: Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn exp(offset: i64) -> i64 {
        chrono::Utc::now().timestamp() + offset
    }

    #[test]
    fn test_user_id_claim_number() {
        let t = token(serde_json::json!({"user_id": 7, "exp": exp(3600)}), SECRET);
        assert_eq!(user_from_jwt(&t, &test_config(None)).unwrap(), UserId(7));
    }

    #[test]
    fn test_sub_claim_string() {
        let t = token(serde_json::json!({"sub": "12", "exp": exp(3600)}), SECRET);
        assert_eq!(user_from_jwt(&t, &test_config(None)).unwrap(), UserId(12));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let t = token(serde_json::json!({"sub": "12", "exp": exp(3600)}), "other");
        assert!(matches!(
            user_from_jwt(&t, &test_config(None)),
            Err(ApiError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let t = token(serde_json::json!({"sub": "12", "exp": exp(-7200)}), SECRET);
        assert!(user_from_jwt(&t, &test_config(None)).is_err());
    }

    #[test]
    fn test_issuer_enforced_when_configured() {
        let t = token(
            serde_json::json!({"sub": "1", "iss": "elsewhere", "exp": exp(3600)}),
            SECRET,
        );
        assert!(user_from_jwt(&t, &test_config(Some("planner-auth"))).is_err());

        let t = token(
            serde_json::json!({"sub": "1", "iss": "planner-auth", "exp": exp(3600)}),
            SECRET,
        );
        assert!(user_from_jwt(&t, &test_config(Some("planner-auth"))).is_ok());
    }

    #[test]
    fn test_missing_user_claim_rejected() {
        let t = token(serde_json::json!({"exp": exp(3600)}), SECRET);
        assert!(user_from_jwt(&t, &test_config(None)).is_err());
    }

    #[test]
    fn test_no_secret_configured() {
        let config = ServerConfig::default();
        assert!(user_from_jwt("a.b.c", &config).is_err());
    }
}
