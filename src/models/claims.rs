use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The public claims we care about in an access token.
///
/// These are read WITHOUT verifying the signature. They are only good for
/// showing the user who they are logged in as and when the token lapses;
/// the backend remains the only authority on whether a token is valid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessClaims {
    pub sub: Option<String>,
    pub username: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

impl AccessClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    /// The best human-readable identity in the token.
    pub fn subject(&self) -> Option<&str> {
        self.username.as_deref().or(self.sub.as_deref())
    }
}

/// Decode the payload of a JWT-style access token. Returns `None` for
/// anything that is not a well-formed JWT.
pub fn peek_claims(token: &str) -> Option<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Access token is not a decodable JWT: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn mint(claims: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_peek_reads_claims_without_the_secret() {
        let token = mint(&serde_json::json!({
            "sub": "u-17",
            "username": "alice",
            "exp": 1_700_000_000,
            "iat": 1_699_990_000,
        }));

        let claims = peek_claims(&token).expect("token should decode");
        assert_eq!(claims.subject(), Some("alice"));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(
            claims.expires_at(),
            Utc.timestamp_opt(1_700_000_000, 0).single()
        );
    }

    #[test]
    fn test_expired_token_still_decodes() {
        let token = mint(&serde_json::json!({"sub": "u-1", "exp": 10}));
        let claims = peek_claims(&token).expect("expired tokens are still readable");

        assert_eq!(claims.subject(), Some("u-1"));
        assert!(claims.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_opaque_token_is_none() {
        assert_eq!(peek_claims("A1"), None);
        assert_eq!(peek_claims("not.a.jwt"), None);
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = mint(&serde_json::json!({"username": "bob"}));
        let claims = peek_claims(&token).unwrap();
        assert_eq!(claims.expires_at(), None);
        assert!(!claims.is_expired_at(Utc::now()));
    }
}
