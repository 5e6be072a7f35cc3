use std::marker::PhantomData;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::channel::oneshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::functions::client::{CallableEndpoint, FunctionsClient, HttpsCallableOptions};
use crate::functions::error::{cancelled, internal_error, FunctionsResult};
use crate::functions::LOGGER;
use crate::platform::runtime::spawn_detached;

/// Successful outcome of a callable invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpsCallableResult {
    data: JsonValue,
}

impl HttpsCallableResult {
    pub(crate) fn new(data: JsonValue) -> Self {
        Self { data }
    }

    /// The decoded payload returned by the function.
    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn into_data(self) -> JsonValue {
        self.data
    }
}

/// Reference to a callable Cloud Function.
///
/// The reference holds no per-call state: it may be shared and invoked any number of times,
/// sequentially or concurrently. The timeout is read when a call starts, so changing it
/// affects subsequent calls only.
///
/// # Examples
/// ```ignore
/// # use firebase_rs_functions::functions::{Functions, FunctionsSettings};
/// # use std::time::Duration;
/// # async fn demo() -> firebase_rs_functions::functions::error::FunctionsResult<()> {
/// let functions = Functions::new(FunctionsSettings {
///     project_id: Some("demo-project".into()),
///     ..Default::default()
/// })?;
/// let callable = functions.https_callable("helloWorld")?;
/// callable.set_timeout(Duration::from_secs(10));
/// let result = callable.call(Some(serde_json::json!({ "text": "hi" }))).await?;
/// println!("{}", result.data());
/// # Ok(())
/// # }
/// ```
pub struct HttpsCallable {
    client: Arc<dyn FunctionsClient>,
    endpoint: CallableEndpoint,
    limited_use_app_check_tokens: bool,
    timeout: RwLock<Duration>,
}

impl std::fmt::Debug for HttpsCallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpsCallable")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout())
            .field(
                "limited_use_app_check_tokens",
                &self.limited_use_app_check_tokens,
            )
            .finish()
    }
}

impl HttpsCallable {
    /// Binds `endpoint` to a networking client. Most callers obtain callables from
    /// [`Functions::https_callable`](crate::functions::Functions::https_callable) instead.
    pub fn new(
        client: Arc<dyn FunctionsClient>,
        endpoint: CallableEndpoint,
        options: HttpsCallableOptions,
    ) -> Self {
        Self {
            client,
            endpoint,
            limited_use_app_check_tokens: options.limited_use_app_check_tokens,
            timeout: RwLock::new(options.timeout),
        }
    }

    pub fn endpoint(&self) -> &CallableEndpoint {
        &self.endpoint
    }

    pub fn name(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read().unwrap()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().unwrap() = timeout;
    }

    fn current_options(&self) -> HttpsCallableOptions {
        HttpsCallableOptions {
            timeout: self.timeout(),
            limited_use_app_check_tokens: self.limited_use_app_check_tokens,
        }
    }

    /// Invokes the function in the background and reports the outcome to `on_complete`.
    ///
    /// `on_complete` runs exactly once, with either the decoded result or the error produced
    /// by the networking client, unchanged. The request runs on the ambient Tokio runtime
    /// when called from one.
    pub fn call_with_completion<F>(&self, data: Option<JsonValue>, on_complete: F)
    where
        F: FnOnce(FunctionsResult<HttpsCallableResult>) + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let endpoint = self.endpoint.clone();
        let options = self.current_options();

        spawn_detached(async move {
            let result = client
                .invoke(&endpoint, data, options)
                .await
                .map(HttpsCallableResult::new);
            if let Err(err) = &result {
                LOGGER.debug(format!("callable `{}` failed: {err}", endpoint.as_str()));
            }
            on_complete(result);
        });
    }

    /// Invokes the function and waits for its result.
    ///
    /// Dropping the returned future stops the wait but not the request already in flight.
    pub async fn call(&self, data: Option<JsonValue>) -> FunctionsResult<HttpsCallableResult> {
        let (sender, receiver) = oneshot::channel();
        self.call_with_completion(data, move |result| {
            let _ = sender.send(result);
        });
        receiver
            .await
            .map_err(|_| cancelled("callable completion was dropped before reporting a result"))?
    }
}

/// Callable with serde-mapped request and response types.
pub struct TypedHttpsCallable<Request, Response> {
    callable: HttpsCallable,
    _types: PhantomData<fn(Request) -> Response>,
}

impl<Request, Response> std::fmt::Debug for TypedHttpsCallable<Request, Response> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedHttpsCallable")
            .field(&self.callable)
            .finish()
    }
}

impl<Request, Response> TypedHttpsCallable<Request, Response>
where
    Request: Serialize,
    Response: DeserializeOwned,
{
    pub fn new(callable: HttpsCallable) -> Self {
        Self {
            callable,
            _types: PhantomData,
        }
    }

    pub fn callable(&self) -> &HttpsCallable {
        &self.callable
    }

    pub fn name(&self) -> &str {
        self.callable.name()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.callable.set_timeout(timeout);
    }

    pub async fn call(&self, data: &Request) -> FunctionsResult<Response> {
        let payload = serde_json::to_value(data).map_err(|err| {
            internal_error(format!("Failed to serialize callable payload: {err}"))
        })?;
        let result = self.callable.call(Some(payload)).await?;
        serde_json::from_value(result.into_data()).map_err(|err| {
            internal_error(format!(
                "Failed to deserialize callable response payload: {err}"
            ))
        })
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::functions::constants::DEFAULT_TIMEOUT;
    use crate::functions::error::{unauthenticated, FunctionsErrorCode};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    type Invocation = (CallableEndpoint, Option<JsonValue>, HttpsCallableOptions);

    struct ScriptedClient {
        response: FunctionsResult<JsonValue>,
        invocations: Mutex<Vec<Invocation>>,
    }

    impl ScriptedClient {
        fn new(response: FunctionsResult<JsonValue>) -> Arc<Self> {
            Arc::new(Self {
                response,
                invocations: Mutex::new(Vec::new()),
            })
        }

        fn invocations(&self) -> Vec<Invocation> {
            self.invocations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FunctionsClient for ScriptedClient {
        async fn invoke(
            &self,
            endpoint: &CallableEndpoint,
            data: Option<JsonValue>,
            options: HttpsCallableOptions,
        ) -> FunctionsResult<JsonValue> {
            self.invocations
                .lock()
                .unwrap()
                .push((endpoint.clone(), data, options));
            self.response.clone()
        }
    }

    fn callable_for(client: Arc<ScriptedClient>) -> HttpsCallable {
        HttpsCallable::new(
            client,
            CallableEndpoint::Name("shout".into()),
            HttpsCallableOptions::default(),
        )
    }

    async fn completion(
        callable: &HttpsCallable,
        data: Option<JsonValue>,
    ) -> (FunctionsResult<HttpsCallableResult>, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let (sender, receiver) = oneshot::channel();
        callable.call_with_completion(data, move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = sender.send(result);
        });
        (receiver.await.unwrap(), fired)
    }

    #[test]
    fn default_timeout_is_seventy_seconds() {
        let callable = callable_for(ScriptedClient::new(Ok(JsonValue::Null)));
        assert_eq!(callable.timeout(), Duration::from_secs(70));
        assert_eq!(callable.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(callable.name(), "shout");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn completion_receives_result_exactly_once() {
        let client = ScriptedClient::new(Ok(json!({ "message": "HELLO" })));
        let callable = callable_for(client.clone());

        let (result, fired) = completion(&callable, Some(json!({ "text": "hi" }))).await;

        let result = result.expect("callable should succeed");
        assert_eq!(result.data(), &json!({ "message": "HELLO" }));
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let invocations = client.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, CallableEndpoint::Name("shout".into()));
        assert_eq!(invocations[0].1, Some(json!({ "text": "hi" })));
        assert_eq!(invocations[0].2.timeout, Duration::from_secs(70));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn completion_receives_error_exactly_once() {
        let client = ScriptedClient::new(Err(unauthenticated("unauthenticated")));
        let callable = callable_for(client.clone());

        let (result, fired) = completion(&callable, None).await;

        let err = result.expect_err("callable should fail");
        assert_eq!(err.code, FunctionsErrorCode::Unauthenticated);
        assert_eq!(err.message(), "unauthenticated");
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(client.invocations()[0].1, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn awaitable_matches_completion_form() {
        let ok_client = ScriptedClient::new(Ok(json!({ "n": [1, 2, 3] })));
        let callable = callable_for(ok_client);
        let (from_callback, _) = completion(&callable, Some(json!(1))).await;
        let awaited = callable.call(Some(json!(1))).await;
        assert_eq!(awaited, from_callback);

        let err_client = ScriptedClient::new(Err(unauthenticated("token expired")));
        let callable = callable_for(err_client);
        let (from_callback, _) = completion(&callable, None).await;
        let awaited = callable.call(None).await;
        assert_eq!(awaited, from_callback);
        assert!(awaited.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn each_call_forwards_the_timeout_set_before_it() {
        let client = ScriptedClient::new(Ok(JsonValue::Null));
        let callable = callable_for(client.clone());

        callable.set_timeout(Duration::from_secs(5));
        callable.call(None).await.unwrap();
        callable.set_timeout(Duration::from_millis(1_500));
        callable.call(None).await.unwrap();

        let timeouts: Vec<_> = client
            .invocations()
            .into_iter()
            .map(|(_, _, options)| options.timeout)
            .collect();
        assert_eq!(
            timeouts,
            [Duration::from_secs(5), Duration::from_millis(1_500)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_are_independent() {
        let client = ScriptedClient::new(Ok(json!("pong")));
        let callable = Arc::new(callable_for(client.clone()));

        let calls = (0..8).map(|i| {
            let callable = Arc::clone(&callable);
            async move { callable.call(Some(json!(i))).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results
            .iter()
            .all(|result| result.as_ref().map(HttpsCallableResult::data) == Ok(&json!("pong"))));
        let mut payloads: Vec<_> = client
            .invocations()
            .into_iter()
            .filter_map(|(_, data, _)| data.and_then(|value| value.as_i64()))
            .collect();
        payloads.sort_unstable();
        assert_eq!(payloads, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn completion_fires_without_an_async_runtime() {
        let client = ScriptedClient::new(Ok(json!({ "ok": true })));
        let callable = callable_for(client);
        let (sender, receiver) = std::sync::mpsc::channel();
        callable.call_with_completion(None, move |result| {
            let _ = sender.send(result);
        });
        let result = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("completion should fire");
        assert_eq!(result.unwrap().into_data(), json!({ "ok": true }));
    }

    struct GatedClient {
        gate: Notify,
        finished: AtomicUsize,
    }

    #[async_trait]
    impl FunctionsClient for GatedClient {
        async fn invoke(
            &self,
            _endpoint: &CallableEndpoint,
            _data: Option<JsonValue>,
            _options: HttpsCallableOptions,
        ) -> FunctionsResult<JsonValue> {
            self.gate.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(JsonValue::Null)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropping_the_awaitable_does_not_cancel_the_request() {
        let client = Arc::new(GatedClient {
            gate: Notify::new(),
            finished: AtomicUsize::new(0),
        });
        let callable = HttpsCallable::new(
            client.clone(),
            CallableEndpoint::Name("slow".into()),
            HttpsCallableOptions::default(),
        );

        let outcome = tokio::time::timeout(Duration::from_millis(20), callable.call(None)).await;
        assert!(outcome.is_err(), "call should still be pending");

        client.gate.notify_one();
        for _ in 0..100 {
            if client.finished.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(client.finished.load(Ordering::SeqCst), 1);
    }

    #[derive(Serialize)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AddResponse {
        sum: i64,
    }

    #[tokio::test(flavor = "current_thread")]
    async fn typed_callable_maps_payloads_with_serde() {
        let client = ScriptedClient::new(Ok(json!({ "sum": 12 })));
        let typed: TypedHttpsCallable<AddRequest, AddResponse> =
            TypedHttpsCallable::new(callable_for(client.clone()));

        let response = typed.call(&AddRequest { a: 5, b: 7 }).await.unwrap();
        assert_eq!(response, AddResponse { sum: 12 });
        assert_eq!(client.invocations()[0].1, Some(json!({ "a": 5, "b": 7 })));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn typed_callable_reports_shape_mismatch_as_internal() {
        let client = ScriptedClient::new(Ok(json!({ "total": 12 })));
        let typed: TypedHttpsCallable<AddRequest, AddResponse> =
            TypedHttpsCallable::new(callable_for(client));

        let err = typed.call(&AddRequest { a: 5, b: 7 }).await.unwrap_err();
        assert_eq!(err.code, FunctionsErrorCode::Internal);
    }
}
