//! Service-key authentication for internal endpoints.
//!
//! The webmail backend authenticates against the notification trigger with
//! a shared key in the `X-API-Key` header. Without a configured key the
//! protected routes reject every request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use mailwatch_common::error::AppError;

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Marker extractor proving the request carried the configured service key.
///
/// ```ignore
/// async fn handler(_key: ServiceKey) -> impl IntoResponse {
///     // only reached with a valid X-API-Key
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey;

fn keys_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

impl FromRequestParts<AppState> for ServiceKey {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let expected = state.config.notify_api_key.clone();

        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            let Some(expected) = expected else {
                return Err(AppError::Auth(
                    "Notification trigger is disabled: NOTIFY_API_KEY is not set".to_string(),
                ));
            };

            match provided {
                Some(key) if keys_match(&expected, &key) => Ok(ServiceKey),
                _ => Err(AppError::Auth(
                    "Missing or invalid X-API-Key header".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("secret-key", "secret-key"));
        assert!(!keys_match("secret-key", "secret-kez"));
        assert!(!keys_match("secret-key", "secret"));
        assert!(!keys_match("secret-key", ""));
    }
}
