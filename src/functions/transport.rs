use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::functions::error::{
    deadline_exceeded, error_for_http_response, internal_error, invalid_argument, unavailable,
    FunctionsError, FunctionsErrorCode, FunctionsResult,
};

#[derive(Clone, Debug, PartialEq)]
pub struct CallableRequest {
    pub url: String,
    pub payload: JsonValue,
    pub timeout: Duration,
    pub headers: HashMap<String, String>,
}

impl CallableRequest {
    pub fn new(url: impl Into<String>, payload: JsonValue, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            payload,
            timeout,
            headers: HashMap::new(),
        }
    }
}

/// Performs the HTTP exchange for a callable request and returns the parsed JSON body.
///
/// Implementations own timeout enforcement: `request.timeout` must bound the whole exchange
/// and expiry is reported as `deadline-exceeded`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait CallableTransport: Send + Sync {
    async fn invoke(&self, request: CallableRequest) -> FunctionsResult<JsonValue>;
}

/// Default transport backed by a shared `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct HttpCallableTransport {
    client: reqwest::Client,
}

impl HttpCallableTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl CallableTransport for HttpCallableTransport {
    async fn invoke(&self, request: CallableRequest) -> FunctionsResult<JsonValue> {
        let CallableRequest {
            url,
            payload,
            timeout,
            headers,
        } = request;

        log::debug!("POST {url} (timeout {timeout:?})");
        let header_map = build_headers(&headers)?;
        let builder = self.client.post(&url).headers(header_map).json(&payload);
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(timeout);

        let exchange = async move {
            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let bytes = response.bytes().await.map_err(|err| {
                internal_error(format!("failed to read callable response body: {err}"))
            })?;
            Ok::<_, FunctionsError>((status, bytes))
        };
        // The browser fetch backend has no per-request timeout.
        #[cfg(target_arch = "wasm32")]
        let exchange = async {
            crate::platform::runtime::with_deadline(exchange, timeout)
                .await
                .unwrap_or_else(|| {
                    Err(deadline_exceeded(format!(
                        "callable {url} did not answer within {timeout:?}"
                    )))
                })
        };
        let (status, bytes) = exchange.await?;
        log::debug!("callable {url} answered HTTP {status} ({} bytes)", bytes.len());

        parse_response(status, &bytes)
    }
}

fn build_headers(headers: &HashMap<String, String>) -> FunctionsResult<reqwest::header::HeaderMap> {
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| invalid_argument(format!("invalid header name `{key}`: {err}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| invalid_argument(format!("invalid header value for `{key}`: {err}")))?;
        map.insert(name, header_value);
    }
    Ok(map)
}

fn map_reqwest_error(err: reqwest::Error) -> FunctionsError {
    if err.is_timeout() {
        return deadline_exceeded(format!("callable request timed out: {err}"));
    }
    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return unavailable(format!("failed to connect to callable endpoint: {err}"));
    }
    if err.is_decode() {
        return internal_error(format!("unable to decode callable response: {err}"));
    }
    if err.is_request() || err.is_builder() {
        return invalid_argument(format!("malformed callable request: {err}"));
    }
    FunctionsError::new(
        FunctionsErrorCode::Unknown,
        format!("callable request failed: {err}"),
    )
}

/// Turns a raw HTTP status and body into the callable response JSON or its error.
pub(crate) fn parse_response(status: u16, bytes: &[u8]) -> FunctionsResult<JsonValue> {
    let (body, parse_error) = if bytes.is_empty() {
        (None, None)
    } else {
        match serde_json::from_slice::<JsonValue>(bytes) {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        }
    };

    if let Some(error) = error_for_http_response(status, body.as_ref()) {
        return Err(error);
    }

    if let Some(err) = parse_error {
        return Err(internal_error(format!(
            "Response is not valid JSON object: {err}"
        )));
    }

    match body {
        Some(body) => Ok(body),
        None if status == 204 => Err(internal_error(
            "Callable response is missing data payload (HTTP 204)",
        )),
        None => Err(internal_error("Callable response body is empty")),
    }
}
