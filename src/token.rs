//! Access tokens

use serde::Deserialize;
use serde::Serialize;

use crate::entry::Cacheable;

/// An OAuth2 access token, the SDK's canonical cached value.
///
/// The fields mirror a standard token endpoint response. Expiry bookkeeping
/// is handled by the cache entry wrapping the token, not by `expires_in`,
/// which is only the lifetime the server reported at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The bearer token used for API authentication.
    pub access_token: String,
    /// The token type, normally `Bearer`.
    pub token_type: String,
    /// Lifetime in seconds reported by the token endpoint.
    #[serde(default)]
    pub expires_in: u64,
    /// Refresh token for obtaining new access tokens without
    /// re-authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AccessToken {
    /// Creates a new access token without a refresh token.
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            refresh_token: None,
        }
    }

    /// Creates a new access token with a refresh token.
    pub fn with_refresh(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: u64,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Creates the empty placeholder token.
    ///
    /// Returned by auth flows that have nothing cached yet; the cache hands
    /// it to the caller without persisting it.
    pub fn empty() -> Self {
        Self {
            access_token: String::new(),
            token_type: String::new(),
            expires_in: 0,
            refresh_token: None,
        }
    }

    /// Returns `true` if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Returns the token as a bearer authorization header value.
    pub fn as_bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl Cacheable for AccessToken {
    fn is_placeholder(&self) -> bool {
        self.access_token.is_empty()
    }
}
