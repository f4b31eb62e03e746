//! Signed preview links.
//!
//! A preview link embeds a short-lived HS256 JWT naming one mail. The bot's
//! in-app browser opens the link and the API resolves the token back to the
//! mail id; any verification failure is treated as "access denied".

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use mailwatch_common::error::AppError;

/// Where the preview button points when no custom domain is configured.
pub const PREVIEW_FALLBACK_URL: &str = "https://www.cloudflare.com/404";

/// Claims stored in a preview token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkClaims {
    pub email_id: i64,
    /// Expiration time (UNIX timestamp)
    pub exp: i64,
    /// Issued at (UNIX timestamp)
    pub iat: i64,
}

/// Issues and verifies preview tokens with a shared secret.
#[derive(Clone)]
pub struct LinkSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: u64,
}

impl LinkSigner {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a token for one mail.
    pub fn issue(&self, email_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = i64::try_from(self.expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Preview link lifetime of {} hours is out of range",
                    self.expiry_hours
                ))
            })?;

        let claims = LinkClaims {
            email_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Auth(format!("Failed to encode preview token: {}", e)))
    }

    /// Resolve a token to its mail id. `None` means the token is forged,
    /// expired or malformed.
    pub fn verify(&self, token: &str) -> Option<i64> {
        match decode::<LinkClaims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.email_id),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected preview token");
                None
            }
        }
    }
}

/// Normalise a configured domain into an origin: add `https://` when no
/// scheme is given and drop trailing slashes.
pub fn to_origin(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// URL the preview button opens for `token`.
pub fn preview_url(custom_domain: &str, token: &str) -> String {
    format!("{}/api/telegram/getEmail/{}", to_origin(custom_domain), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_issue_verify_token() {
        let signer = LinkSigner::new(TEST_SECRET, 24);
        let token = signer.issue(1234).unwrap();
        assert_eq!(signer.verify(&token), Some(1234));
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = LinkSigner::new(TEST_SECRET, 24).issue(1).unwrap();
        let other = LinkSigner::new("wrong-secret", 24);
        assert_eq!(other.verify(&token), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        // Create a token that expired 1 hour ago
        let now = Utc::now();
        let claims = LinkClaims {
            email_id: 9,
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(LinkSigner::new(TEST_SECRET, 24).verify(&token), None);
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        for hours in [10_000_000_000_000_000, u64::MAX] {
            let result = LinkSigner::new(TEST_SECRET, hours).issue(1);
            assert!(matches!(result, Err(AppError::Config(_))));
        }
    }

    #[test]
    fn test_garbage_token_rejected() {
        let signer = LinkSigner::new(TEST_SECRET, 24);
        assert_eq!(signer.verify("not.a.valid.jwt"), None);
        assert_eq!(signer.verify(""), None);
    }

    #[test]
    fn test_preview_url() {
        assert_eq!(
            preview_url("mail.example.com", "tok"),
            "https://mail.example.com/api/telegram/getEmail/tok"
        );
        assert_eq!(
            preview_url("http://localhost:8787/", "tok"),
            "http://localhost:8787/api/telegram/getEmail/tok"
        );
    }
}
