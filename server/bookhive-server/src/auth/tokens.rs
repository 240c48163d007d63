//! Access token codec
//!
//! Stateless HS256 signing and verification of short-lived access tokens.
//! No I/O and no shared state: the codec is a pure function of the shared
//! secret, the claims, and the clock. Verification reports failures as a
//! tagged result instead of raised errors, and refuses to spend cryptographic
//! work on input that does not even look like a token.

use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Wire claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the local user id as a string
    pub sub: String,
    pub username: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiration, seconds since epoch
    pub exp: i64,
}

/// Verification outcome for a token that checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAccess {
    pub user_id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Tagged verification failure. Signature problems are distinguished from
/// structural ones, and expiry from both, so the gate can answer each with
/// its own rejection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not structurally a JWT")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token subject is not a valid user id")]
    InvalidSubject,
}

/// HS256 codec over a shared symmetric secret and a fixed TTL.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl AccessTokenCodec {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    /// Sign an access token for (user, username) with `iat = now`.
    pub fn issue(&self, user_id: Uuid, username: &str) -> anyhow::Result<String> {
        self.issue_at(user_id, username, Utc::now())
    }

    /// Sign with an explicit clock instant. Expiry behavior is testable
    /// through this without sleeping.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        username: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode access token")
    }

    /// Verify a presented token.
    ///
    /// Check order is deliberate: structure first (cheap, no crypto on
    /// garbage), then signature, then expiry (a forged expired-looking token
    /// must not learn whether its signature would have verified), then the
    /// subject parse.
    pub fn verify(&self, token: &str) -> Result<VerifiedAccess, TokenError> {
        let token = unwrap_quotes(token.trim());

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(TokenError::Malformed);
        }
        if URL_SAFE_NO_PAD.decode(segments[0]).is_err()
            || URL_SAFE_NO_PAD.decode(segments[1]).is_err()
        {
            return Err(TokenError::Malformed);
        }
        // A corrupted signature segment is a signature failure, not a
        // malformed token.
        if URL_SAFE_NO_PAD.decode(segments[2]).is_err() {
            return Err(TokenError::BadSignature);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let user_id =
            Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::InvalidSubject)?;
        let issued_at =
            DateTime::from_timestamp(data.claims.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at =
            DateTime::from_timestamp(data.claims.exp, 0).ok_or(TokenError::Malformed)?;

        Ok(VerifiedAccess {
            user_id,
            username: data.claims.username,
            issued_at,
            expires_at,
        })
    }
}

/// Strip one layer of surrounding double quotes. Some clients forward the
/// token as a JSON string literal.
fn unwrap_quotes(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new("unit-test-signing-secret", 900)
    }

    #[test]
    fn issue_verify_round_trip() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let token = codec.issue(user_id, "reader").unwrap();
        let access = codec.verify(&token).unwrap();

        assert_eq!(access.user_id, user_id);
        assert_eq!(access.username, "reader");
        assert!(access.expires_at > access.issued_at);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let codec = AccessTokenCodec::new("unit-test-signing-secret", 5);
        let token = codec
            .issue_at(Uuid::new_v4(), "reader", Utc::now() - Duration::seconds(6))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn flipped_signature_byte_is_bad_signature_not_malformed() {
        let codec = codec();
        let token = codec.issue(Uuid::new_v4(), "reader").unwrap();

        let dot = token.rfind('.').unwrap();
        let (head, sig) = token.split_at(dot + 1);
        let mut sig_bytes = sig.as_bytes().to_vec();
        sig_bytes[0] = if sig_bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}{}", head, String::from_utf8(sig_bytes).unwrap());
        assert_ne!(tampered, token);

        assert_eq!(codec.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn signature_segment_with_invalid_encoding_is_still_bad_signature() {
        let codec = codec();
        let token = codec.issue(Uuid::new_v4(), "reader").unwrap();

        let dot = token.rfind('.').unwrap();
        let tampered = format!("{}!!!!", &token[..dot + 1]);

        assert_eq!(codec.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn too_few_segments_is_malformed() {
        let codec = codec();

        assert_eq!(codec.verify("no-dots-at-all"), Err(TokenError::Malformed));
        assert_eq!(codec.verify("one.dot"), Err(TokenError::Malformed));
        assert_eq!(codec.verify("a..b"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn garbage_with_two_dots_is_malformed() {
        let codec = codec();
        assert_eq!(codec.verify("not.a.jwt"), Err(TokenError::Malformed));
    }

    #[test]
    fn quoted_token_still_verifies() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec.issue(user_id, "reader").unwrap();

        let access = codec.verify(&format!("\"{}\"", token)).unwrap();
        assert_eq!(access.user_id, user_id);
    }

    #[test]
    fn non_uuid_subject_is_invalid_subject() {
        let codec = codec();
        let now = Utc::now();
        let claims = AccessClaims {
            sub: "definitely-not-a-uuid".to_string(),
            username: "reader".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + 900,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-test-signing-secret"),
        )
        .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::InvalidSubject));
    }

    #[test]
    fn wrong_key_is_bad_signature_even_when_expired() {
        let other = AccessTokenCodec::new("a-different-secret", 5);
        let token = other
            .issue_at(Uuid::new_v4(), "reader", Utc::now() - Duration::seconds(60))
            .unwrap();

        // Signature is checked before expiry.
        assert_eq!(codec().verify(&token), Err(TokenError::BadSignature));
    }
}
