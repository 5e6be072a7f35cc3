use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::functions::constants::DEFAULT_TIMEOUT;
use crate::functions::error::FunctionsResult;

/// Where a callable request is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallableEndpoint {
    /// A deployed function name, resolved against the client's region, custom domain or
    /// emulator.
    Name(String),
    /// A fully qualified callable URL, used verbatim.
    Url(String),
}

impl CallableEndpoint {
    /// The function name, or the URL for URL endpoints.
    pub fn as_str(&self) -> &str {
        match self {
            CallableEndpoint::Name(name) => name,
            CallableEndpoint::Url(url) => url,
        }
    }
}

/// Per-callable invocation settings forwarded to the networking client on every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpsCallableOptions {
    /// Upper bound for the whole HTTP exchange, enforced by the transport.
    pub timeout: Duration,
    /// Send a single-use App Check token instead of the cached one.
    pub limited_use_app_check_tokens: bool,
}

impl Default for HttpsCallableOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            limited_use_app_check_tokens: false,
        }
    }
}

/// Networking collaborator used by [`HttpsCallable`](crate::functions::HttpsCallable).
///
/// Implementations attach identity tokens, perform the HTTP request within
/// `options.timeout`, decode the response body and map failures to a
/// [`FunctionsError`](crate::functions::error::FunctionsError). They must be safe to share
/// between any number of callables issuing concurrent requests.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait FunctionsClient: Send + Sync {
    async fn invoke(
        &self,
        endpoint: &CallableEndpoint,
        data: Option<JsonValue>,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<JsonValue>;
}
