use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::VerificationConfig, state::AppState};

/// What a signed token may be used for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub email: String,  // address the link was sent to
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub purpose: TokenPurpose,
}

/// Signing and verification keys for email verification tokens.
#[derive(Clone)]
pub struct VerificationKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&VerificationConfig> for VerificationKeys {
    fn from(cfg: &VerificationConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
        }
    }
}

impl FromRef<AppState> for VerificationKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.verification)
    }
}

impl VerificationKeys {
    pub fn issue(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("verification token expiry out of range"))?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            purpose: TokenPurpose::EmailVerification,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "verification token issued");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.purpose != TokenPurpose::EmailVerification {
            anyhow::bail!("not an email verification token");
        }
        debug!(user_id = %data.claims.sub, "verification token accepted");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> VerificationKeys {
        VerificationKeys::from(&VerificationConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 30,
        })
    }

    #[test]
    fn issue_and_verify() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "user@example.com").expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.purpose, TokenPurpose::EmailVerification);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(Uuid::new_v4(), "a@example.com").unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let a = make_keys("secret-a", "iss", "aud");
        let b = make_keys("secret-b", "iss", "aud");
        let token = a.issue(Uuid::new_v4(), "a@example.com").unwrap();
        assert!(b.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let past = OffsetDateTime::now_utc() - Duration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@example.com".into(),
            iat: past.unix_timestamp() as usize,
            exp: (past + Duration::minutes(30)).unix_timestamp() as usize,
            iss: "iss".into(),
            aud: "aud".into(),
            purpose: TokenPurpose::EmailVerification,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn issue_fails_instead_of_overflowing_on_huge_ttl() {
        let keys = VerificationKeys::from(&VerificationConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 10_000_000_000,
        });
        let err = keys.issue(Uuid::new_v4(), "a@example.com").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(keys.verify("not.a.token").is_err());
    }
}
