use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::functions::LOGGER;
use crate::platform::token::{AppCheckTokenProvider, AsyncTokenProvider};

/// Metadata that may be attached to callable Function requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
    pub auth_token: Option<String>,
    pub messaging_token: Option<String>,
    pub app_check_token: Option<String>,
}

/// Gathers the identity tokens sent alongside each callable request.
///
/// Every provider is optional. A provider that fails is treated as having no token: the call
/// still goes out and the backend decides whether the missing credential matters.
#[derive(Clone, Default)]
pub struct ContextProvider {
    auth: Option<Arc<dyn AsyncTokenProvider>>,
    messaging: Option<Arc<dyn AsyncTokenProvider>>,
    app_check: Option<Arc<dyn AppCheckTokenProvider>>,
}

impl Debug for ContextProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextProvider")
            .field("auth", &self.auth.is_some())
            .field("messaging", &self.messaging.is_some())
            .field("app_check", &self.app_check.is_some())
            .finish()
    }
}

impl ContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auth(&mut self, provider: Arc<dyn AsyncTokenProvider>) {
        self.auth = Some(provider);
    }

    pub fn set_messaging(&mut self, provider: Arc<dyn AsyncTokenProvider>) {
        self.messaging = Some(provider);
    }

    pub fn set_app_check(&mut self, provider: Arc<dyn AppCheckTokenProvider>) {
        self.app_check = Some(provider);
    }

    pub async fn get_context_async(&self, limited_use_app_check_tokens: bool) -> CallContext {
        CallContext {
            auth_token: self.fetch_auth_token().await,
            messaging_token: self.fetch_messaging_token().await,
            app_check_token: self
                .fetch_app_check_token(limited_use_app_check_tokens)
                .await,
        }
    }

    async fn fetch_auth_token(&self) -> Option<String> {
        let auth = self.auth.as_ref()?;
        match auth.get_token(false).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                // Usually means nobody is signed in.
                LOGGER.debug(format!("auth token unavailable: {err}"));
                None
            }
        }
    }

    async fn fetch_messaging_token(&self) -> Option<String> {
        let messaging = self.messaging.as_ref()?;
        match messaging.get_token(false).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                LOGGER.debug(format!("messaging token unavailable: {err}"));
                None
            }
        }
    }

    async fn fetch_app_check_token(&self, limited_use: bool) -> Option<String> {
        let app_check = self.app_check.as_ref()?;
        let result = if limited_use {
            app_check.get_limited_use_token().await
        } else {
            app_check.get_token(false).await
        };

        match result {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                LOGGER.debug(format!("App Check token unavailable: {err}"));
                None
            }
        }
    }
}
