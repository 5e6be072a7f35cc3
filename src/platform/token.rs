use std::error::Error;
use std::fmt;

use async_trait::async_trait;

/// Error type returned by async token providers when token acquisition fails.
#[derive(Debug, Clone)]
pub struct TokenError {
    message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: impl Error) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TokenError {}

/// Source of bearer style tokens (Auth ID tokens, messaging registration tokens).
///
/// `Ok(None)` means "no token available", e.g. no signed-in user.
#[async_trait]
pub trait AsyncTokenProvider: Send + Sync {
    async fn get_token(&self, force_refresh: bool) -> Result<Option<String>, TokenError>;
}

/// App Check token source. Limited-use tokens are single-use attestations for endpoints
/// with replay protection enabled.
#[async_trait]
pub trait AppCheckTokenProvider: Send + Sync {
    async fn get_token(&self, force_refresh: bool) -> Result<Option<String>, TokenError>;

    async fn get_limited_use_token(&self) -> Result<Option<String>, TokenError>;
}

/// Provider that always hands out the same token. Handy for tests and service accounts that
/// mint tokens out of band.
#[derive(Clone, Debug)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn empty() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl AsyncTokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<Option<String>, TokenError> {
        Ok(self.token.clone())
    }
}

#[async_trait]
impl AppCheckTokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<Option<String>, TokenError> {
        Ok(self.token.clone())
    }

    async fn get_limited_use_token(&self) -> Result<Option<String>, TokenError> {
        Ok(self.token.clone())
    }
}
