use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::functions::callable::{HttpsCallable, TypedHttpsCallable};
use crate::functions::client::{CallableEndpoint, FunctionsClient, HttpsCallableOptions};
use crate::functions::constants::{
    APP_CHECK_HEADER, AUTHORIZATION_HEADER, CONTENT_TYPE_HEADER, DEFAULT_REGION,
    INSTANCE_ID_HEADER,
};
use crate::functions::context::ContextProvider;
use crate::functions::error::{internal_error, invalid_argument, FunctionsResult};
use crate::functions::serializer;
use crate::functions::transport::{CallableRequest, CallableTransport, HttpCallableTransport};
use crate::functions::LOGGER;
use crate::platform::token::{AppCheckTokenProvider, AsyncTokenProvider};

/// Configuration for a [`Functions`] client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionsSettings {
    /// Firebase project hosting the functions. Required unless every callable targets a
    /// custom domain or an explicit URL.
    pub project_id: Option<String>,
    /// Either a region such as `europe-west1` or an absolute URL used as custom domain.
    /// Defaults to `us-central1`.
    pub region_or_custom_domain: Option<String>,
}

/// Client entry point for invoking HTTPS callable Cloud Functions.
///
/// A `Functions` value is the networking client shared by all the callables it creates: it
/// resolves endpoint URLs, attaches identity tokens and drives the transport. Cloning is
/// cheap and clones share configuration, including the emulator override.
#[derive(Clone)]
pub struct Functions {
    inner: Arc<FunctionsInner>,
}

struct FunctionsInner {
    project_id: Option<String>,
    endpoint: Endpoint,
    context: ContextProvider,
    transport: Arc<dyn CallableTransport>,
}

impl Debug for Functions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Functions")
            .field("project_id", &self.inner.project_id)
            .field("endpoint", &self.inner.endpoint)
            .field("context", &self.inner.context)
            .finish()
    }
}

/// Builder for [`Functions`] with pluggable token providers and transport.
pub struct FunctionsBuilder {
    settings: FunctionsSettings,
    context: ContextProvider,
    transport: Option<Arc<dyn CallableTransport>>,
}

impl FunctionsBuilder {
    pub fn with_transport(mut self, transport: Arc<dyn CallableTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_auth_token_provider(mut self, provider: Arc<dyn AsyncTokenProvider>) -> Self {
        self.context.set_auth(provider);
        self
    }

    pub fn with_messaging_token_provider(
        mut self,
        provider: Arc<dyn AsyncTokenProvider>,
    ) -> Self {
        self.context.set_messaging(provider);
        self
    }

    pub fn with_app_check_token_provider(
        mut self,
        provider: Arc<dyn AppCheckTokenProvider>,
    ) -> Self {
        self.context.set_app_check(provider);
        self
    }

    pub fn build(self) -> FunctionsResult<Functions> {
        let project_id = match self.settings.project_id {
            Some(id) if id.trim().is_empty() => {
                return Err(invalid_argument("project_id must not be blank"));
            }
            other => other.map(|id| id.trim().to_string()),
        };
        let endpoint = Endpoint::new(self.settings.region_or_custom_domain);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpCallableTransport::new()));

        Ok(Functions {
            inner: Arc::new(FunctionsInner {
                project_id,
                endpoint,
                context: self.context,
                transport,
            }),
        })
    }
}

impl Functions {
    pub fn new(settings: FunctionsSettings) -> FunctionsResult<Self> {
        Self::builder(settings).build()
    }

    pub fn builder(settings: FunctionsSettings) -> FunctionsBuilder {
        FunctionsBuilder {
            settings,
            context: ContextProvider::new(),
            transport: None,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        self.inner.project_id.as_deref()
    }

    pub fn region(&self) -> &str {
        self.inner.endpoint.region()
    }

    pub fn custom_domain(&self) -> Option<&str> {
        self.inner.endpoint.custom_domain.as_deref()
    }

    /// Routes every named callable of this client (and its clones) to a local emulator.
    pub fn use_functions_emulator(&self, host: &str, port: u16) {
        let origin = format!("http://{host}:{port}");
        LOGGER.debug(format!("routing callable requests to emulator at {origin}"));
        *self.inner.endpoint.emulator_origin.lock().unwrap() = Some(origin);
    }

    /// Returns a callable reference for the given Cloud Function name.
    ///
    /// # Examples
    /// ```ignore
    /// # use firebase_rs_functions::functions::{Functions, FunctionsSettings};
    /// # async fn demo() -> firebase_rs_functions::functions::error::FunctionsResult<()> {
    /// let functions = Functions::new(FunctionsSettings {
    ///     project_id: Some("demo-project".into()),
    ///     ..Default::default()
    /// })?;
    /// let callable = functions.https_callable("helloWorld")?;
    /// let response = callable.call(Some(serde_json::json!({ "text": "hi" }))).await?;
    /// println!("{:?}", response.data());
    /// # Ok(())
    /// # }
    /// ```
    pub fn https_callable(&self, name: &str) -> FunctionsResult<HttpsCallable> {
        self.https_callable_with_options(name, HttpsCallableOptions::default())
    }

    pub fn https_callable_with_options(
        &self,
        name: &str,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<HttpsCallable> {
        let name = name.trim().trim_matches('/');
        if name.is_empty() {
            return Err(invalid_argument("Function name must not be empty"));
        }
        Ok(HttpsCallable::new(
            self.as_client(),
            CallableEndpoint::Name(name.to_string()),
            options,
        ))
    }

    /// Returns a callable reference for a fully qualified callable URL.
    pub fn https_callable_from_url(&self, url: &str) -> FunctionsResult<HttpsCallable> {
        self.https_callable_from_url_with_options(url, HttpsCallableOptions::default())
    }

    pub fn https_callable_from_url_with_options(
        &self,
        url: &str,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<HttpsCallable> {
        let parsed = Url::parse(url.trim())
            .map_err(|err| invalid_argument(format!("Invalid callable URL `{url}`: {err}")))?;
        Ok(HttpsCallable::new(
            self.as_client(),
            CallableEndpoint::Url(parsed.to_string()),
            options,
        ))
    }

    /// Returns a callable whose request and response are mapped through serde.
    pub fn https_callable_typed<Request, Response>(
        &self,
        name: &str,
    ) -> FunctionsResult<TypedHttpsCallable<Request, Response>>
    where
        Request: Serialize,
        Response: DeserializeOwned,
    {
        self.https_callable(name).map(TypedHttpsCallable::new)
    }

    fn as_client(&self) -> Arc<dyn FunctionsClient> {
        Arc::new(self.clone())
    }

    fn callable_url(&self, endpoint: &CallableEndpoint) -> FunctionsResult<String> {
        match endpoint {
            CallableEndpoint::Url(url) => Ok(url.clone()),
            CallableEndpoint::Name(name) => self
                .inner
                .endpoint
                .callable_url(self.inner.project_id.as_deref(), name),
        }
    }

    async fn build_request(
        &self,
        endpoint: &CallableEndpoint,
        data: Option<JsonValue>,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<CallableRequest> {
        let url = self.callable_url(endpoint)?;
        let body = json!({ "data": serializer::encode(data.unwrap_or(JsonValue::Null)) });
        let mut request = CallableRequest::new(url, body, options.timeout);
        request
            .headers
            .insert(CONTENT_TYPE_HEADER.to_string(), "application/json".to_string());

        let context = self
            .inner
            .context
            .get_context_async(options.limited_use_app_check_tokens)
            .await;
        if let Some(token) = context.auth_token {
            request
                .headers
                .insert(AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}"));
        }
        if let Some(token) = context.messaging_token {
            request
                .headers
                .insert(INSTANCE_ID_HEADER.to_string(), token);
        }
        if let Some(token) = context.app_check_token {
            request.headers.insert(APP_CHECK_HEADER.to_string(), token);
        }
        Ok(request)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl FunctionsClient for Functions {
    async fn invoke(
        &self,
        endpoint: &CallableEndpoint,
        data: Option<JsonValue>,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<JsonValue> {
        let request = self.build_request(endpoint, data, options).await?;
        let response_body = self.inner.transport.invoke(request).await?;
        extract_data(response_body)
    }
}

fn extract_data(body: JsonValue) -> FunctionsResult<JsonValue> {
    match body {
        JsonValue::Object(mut map) => {
            if let Some(data_value) = map.remove("data").or_else(|| map.remove("result")) {
                serializer::decode(data_value)
            } else {
                Err(internal_error("Response is missing data field."))
            }
        }
        JsonValue::Null => Err(internal_error(
            "Callable response did not contain a JSON payload",
        )),
        other => Err(internal_error(format!(
            "Unexpected callable response shape: expected object, got {other}"
        ))),
    }
}

#[derive(Debug)]
struct Endpoint {
    region: String,
    custom_domain: Option<String>,
    emulator_origin: Mutex<Option<String>>,
}

impl Endpoint {
    fn new(identifier: Option<String>) -> Self {
        let identifier = identifier
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        match identifier {
            // Region names never parse as absolute URLs, so anything that does is a domain.
            Some(raw) => match Url::parse(&raw) {
                Ok(url) => {
                    let mut normalized = url.origin().ascii_serialization();
                    let path = url.path();
                    if path != "/" {
                        normalized.push_str(path.trim_end_matches('/'));
                    }
                    Self {
                        region: DEFAULT_REGION.to_string(),
                        custom_domain: Some(normalized),
                        emulator_origin: Mutex::new(None),
                    }
                }
                Err(_) => Self {
                    region: raw,
                    custom_domain: None,
                    emulator_origin: Mutex::new(None),
                },
            },
            None => Self {
                region: DEFAULT_REGION.to_string(),
                custom_domain: None,
                emulator_origin: Mutex::new(None),
            },
        }
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn callable_url(&self, project_id: Option<&str>, name: &str) -> FunctionsResult<String> {
        if let Some(origin) = self.emulator_origin.lock().unwrap().clone() {
            let project_id = require_project_id(project_id)?;
            return Ok(format!("{origin}/{project_id}/{}/{}", self.region, name));
        }

        if let Some(domain) = &self.custom_domain {
            return Ok(format!("{}/{}", domain.trim_end_matches('/'), name));
        }

        let project_id = require_project_id(project_id)?;
        Ok(format!(
            "https://{}-{}.cloudfunctions.net/{}",
            self.region, project_id, name
        ))
    }
}

fn require_project_id(project_id: Option<&str>) -> FunctionsResult<&str> {
    project_id
        .ok_or_else(|| invalid_argument("FunctionsSettings.project_id is required to call Functions"))
}
