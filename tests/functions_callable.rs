#![cfg(not(target_arch = "wasm32"))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use firebase_rs_functions::functions::error::{FunctionsError, FunctionsErrorCode, FunctionsResult};
use firebase_rs_functions::functions::{
    CallableEndpoint, Functions, FunctionsClient, FunctionsSettings, HttpsCallable,
    HttpsCallableOptions,
};
use firebase_rs_functions::platform::token::{AsyncTokenProvider, TokenError};
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};

struct EchoUpperClient {
    timeouts: Mutex<Vec<Duration>>,
}

#[async_trait]
impl FunctionsClient for EchoUpperClient {
    async fn invoke(
        &self,
        _endpoint: &CallableEndpoint,
        data: Option<Value>,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<Value> {
        self.timeouts.lock().unwrap().push(options.timeout);
        match data.as_ref().and_then(|value| value.get("text")).and_then(Value::as_str) {
            Some(text) => Ok(json!({ "message": text.to_uppercase() })),
            None => Err(FunctionsError::new(
                FunctionsErrorCode::Unauthenticated,
                "unauthenticated",
            )),
        }
    }
}

fn shout_callable() -> (HttpsCallable, Arc<EchoUpperClient>) {
    let client = Arc::new(EchoUpperClient {
        timeouts: Mutex::new(Vec::new()),
    });
    let callable = HttpsCallable::new(
        client.clone(),
        CallableEndpoint::Name("shout".into()),
        HttpsCallableOptions::default(),
    );
    (callable, client)
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_and_awaitable_agree_on_success() {
    let (callable, _) = shout_callable();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let (sender, receiver) = futures::channel::oneshot::channel();

    callable.call_with_completion(Some(json!({ "text": "hi" })), move |result| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = sender.send(result);
    });
    let from_callback = receiver.await.unwrap().unwrap();
    let awaited = callable.call(Some(json!({ "text": "hi" }))).await.unwrap();

    assert_eq!(from_callback.data(), &json!({ "message": "HELLO" }));
    assert_eq!(awaited, from_callback);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_input_surfaces_the_client_error_verbatim() {
    let (callable, _) = shout_callable();

    let err = callable.call(None).await.unwrap_err();

    assert_eq!(err.code, FunctionsErrorCode::Unauthenticated);
    assert_eq!(err.code_str(), "functions/unauthenticated");
    assert_eq!(err.message(), "unauthenticated");
}

#[tokio::test(flavor = "multi_thread")]
async fn sequential_calls_forward_their_own_timeouts() {
    let (callable, client) = shout_callable();

    callable.call(Some(json!({ "text": "a" }))).await.unwrap();
    callable.set_timeout(Duration::from_secs(2));
    callable.call(Some(json!({ "text": "b" }))).await.unwrap();
    callable.set_timeout(Duration::from_secs(9));
    callable.call(Some(json!({ "text": "c" }))).await.unwrap();

    assert_eq!(
        *client.timeouts.lock().unwrap(),
        [
            Duration::from_secs(70),
            Duration::from_secs(2),
            Duration::from_secs(9)
        ]
    );
}

struct SignedOut;

#[async_trait]
impl AsyncTokenProvider for SignedOut {
    async fn get_token(&self, _force_refresh: bool) -> Result<Option<String>, TokenError> {
        Err(TokenError::new("no current user"))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_against_mock_backend() {
    let server = MockServer::start_async().await;
    let success = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/demo-project/us-central1/shout")
                .json_body(json!({ "data": { "text": "hi" } }));
            then.status(200)
                .json_body(json!({ "result": { "message": "HELLO" } }));
        })
        .await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/demo-project/us-central1/shout")
                .json_body(json!({ "data": null }));
            then.status(401)
                .json_body(json!({ "error": { "status": "UNAUTHENTICATED", "message": "unauthenticated" } }));
        })
        .await;

    let functions = Functions::builder(FunctionsSettings {
        project_id: Some("demo-project".into()),
        ..Default::default()
    })
    .with_auth_token_provider(Arc::new(SignedOut))
    .build()
    .unwrap();
    functions.use_functions_emulator(&server.host(), server.port());
    let shout = functions.https_callable("shout").unwrap();

    let result = shout.call(Some(json!({ "text": "hi" }))).await.unwrap();
    assert_eq!(result.into_data(), json!({ "message": "HELLO" }));

    let err = shout.call(None).await.unwrap_err();
    assert_eq!(err.code, FunctionsErrorCode::Unauthenticated);

    success.assert_async().await;
    rejected.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_is_reported_as_unavailable() {
    let functions = Functions::new(FunctionsSettings {
        project_id: Some("demo-project".into()),
        region_or_custom_domain: Some("http://127.0.0.1:9".into()),
    })
    .unwrap();
    let callable = functions.https_callable("nowhere").unwrap();
    callable.set_timeout(Duration::from_secs(5));

    let err = callable.call(None).await.unwrap_err();
    assert!(matches!(
        err.code,
        FunctionsErrorCode::Unavailable | FunctionsErrorCode::DeadlineExceeded
    ));
}
