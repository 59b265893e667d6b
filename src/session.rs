//! Authenticated session seam.
//!
//! Credential bootstrap and token refresh live outside this crate. The catalog
//! client only needs a bearer token per request and the account tier, which
//! selects the audio quality handed to the content feeder and transcoder.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Account tier reported by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    /// Free account, limited to the standard quality tier.
    #[default]
    Free,
    /// Premium account, allowed the highest quality tier.
    Premium,
}

/// Audio quality tier requested from the content feeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioQuality {
    /// Standard tier (160 kbit/s output).
    High,
    /// Highest tier (320 kbit/s output).
    VeryHigh,
}

impl AudioQuality {
    /// Selects the quality tier for an account, honoring the force-premium override.
    #[must_use]
    pub fn for_tier(tier: AccountTier, force_premium: bool) -> Self {
        if force_premium || tier == AccountTier::Premium {
            Self::VeryHigh
        } else {
            Self::High
        }
    }

    /// Output bitrate argument for the transcoder.
    #[must_use]
    pub fn bitrate(self) -> &'static str {
        match self {
            Self::High => "160k",
            Self::VeryHigh => "320k",
        }
    }

    /// Stable lowercase name passed to external collaborators.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Errors raised by a session when no usable token is available.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No access token was configured.
    #[error("no access token configured (set TUNEFETCH_ACCESS_TOKEN)")]
    MissingToken,

    /// The session could not produce a token.
    #[error("session unavailable: {reason}")]
    Unavailable {
        /// Why the token could not be produced.
        reason: String,
    },
}

/// Source of bearer tokens and account tier for catalog requests.
#[async_trait]
pub trait AuthenticatedSession: Send + Sync {
    /// Returns a bearer token valid for the next catalog request.
    async fn access_token(&self) -> Result<String, SessionError>;

    /// Returns the tier of the authenticated account.
    fn account_tier(&self) -> AccountTier;
}

/// Session backed by a pre-obtained token.
#[derive(Clone)]
pub struct StaticTokenSession {
    token: String,
    tier: AccountTier,
}

impl StaticTokenSession {
    /// Creates a session from a token and declared tier.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingToken`] when the token is blank.
    pub fn new(token: impl Into<String>, tier: AccountTier) -> Result<Self, SessionError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }
        Ok(Self {
            token: token.trim().to_string(),
            tier,
        })
    }
}

impl std::fmt::Debug for StaticTokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenSession")
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthenticatedSession for StaticTokenSession {
    async fn access_token(&self) -> Result<String, SessionError> {
        Ok(self.token.clone())
    }

    fn account_tier(&self) -> AccountTier {
        self.tier
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_premium_gets_very_high() {
        assert_eq!(
            AudioQuality::for_tier(AccountTier::Premium, false),
            AudioQuality::VeryHigh
        );
        assert_eq!(AudioQuality::VeryHigh.bitrate(), "320k");
    }

    #[test]
    fn test_quality_free_gets_high_unless_forced() {
        assert_eq!(
            AudioQuality::for_tier(AccountTier::Free, false),
            AudioQuality::High
        );
        assert_eq!(
            AudioQuality::for_tier(AccountTier::Free, true),
            AudioQuality::VeryHigh
        );
        assert_eq!(AudioQuality::High.bitrate(), "160k");
    }

    #[test]
    fn test_static_session_rejects_blank_token() {
        assert!(matches!(
            StaticTokenSession::new("   ", AccountTier::Free),
            Err(SessionError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_static_session_returns_trimmed_token() {
        let session = StaticTokenSession::new(" abc \n", AccountTier::Premium).unwrap();
        assert_eq!(session.access_token().await.unwrap(), "abc");
        assert_eq!(session.account_tier(), AccountTier::Premium);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let session = StaticTokenSession::new("secret-token", AccountTier::Free).unwrap();
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
