//! Shared-secret JWT validator.
//!
//! Verifies HS256 tokens issued by the identity service in front of the
//! relay. The `sub` claim becomes the session owner id.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Claims the relay reads from a token.
#[derive(Debug, Deserialize)]
struct RelayClaims {
    sub: String,

    #[allow(dead_code)]
    exp: i64,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    preferred_username: Option<String>,
}

/// Validates HS256-signed bearer tokens.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    /// Creates a validator for tokens signed with `secret`.
    ///
    /// When `issuer` is set, the `iss` claim must match it.
    pub fn new(secret: &Secret<String>, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<RelayClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::warn!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            },
        )?;

        let claims = data.claims;
        let id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::new(
            id,
            claims.name.or(claims.preferred_username),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "test-signing-secret-with-enough-length";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<&'a str>,
    }

    fn token(claims: &Claims<'_>, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    fn validator(issuer: Option<&str>) -> JwtSessionValidator {
        JwtSessionValidator::new(&Secret::new(SECRET.to_string()), issuer)
    }

    #[tokio::test]
    async fn valid_token_yields_subject_as_user_id() {
        let jwt = token(
            &Claims {
                sub: "user-42",
                exp: in_one_hour(),
                iss: None,
                name: Some("Ada"),
            },
            SECRET,
        );

        let user = validator(None).validate(&jwt).await.unwrap();
        assert_eq!(user.id.as_str(), "user-42");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let jwt = token(
            &Claims {
                sub: "user-42",
                exp: in_one_hour(),
                iss: None,
                name: None,
            },
            "some-other-secret",
        );

        assert_eq!(
            validator(None).validate(&jwt).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let jwt = token(
            &Claims {
                sub: "user-42",
                exp: chrono::Utc::now().timestamp() - 3600,
                iss: None,
                name: None,
            },
            SECRET,
        );

        assert_eq!(
            validator(None).validate(&jwt).await,
            Err(AuthError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn issuer_is_enforced_when_configured() {
        let claims = Claims {
            sub: "user-42",
            exp: in_one_hour(),
            iss: Some("https://other.example.com"),
            name: None,
        };

        let result = validator(Some("https://id.example.com"))
            .validate(&token(&claims, SECRET))
            .await;
        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert_eq!(
            validator(None).validate("not.a.jwt").await,
            Err(AuthError::InvalidToken)
        );
    }
}
