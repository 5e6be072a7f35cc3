//! Cloud Functions for Firebase: callable HTTPS triggers.
//!
//! [`Functions`] is the networking client: it resolves endpoint URLs for a project and
//! region (or a custom domain, or a local emulator), attaches Auth, messaging and App Check
//! tokens, and posts the request through a [`CallableTransport`](transport::CallableTransport).
//! [`HttpsCallable`] binds one function to a client and exposes a completion-callback call
//! and an awaitable call, both delivering an [`HttpsCallableResult`] or a
//! [`FunctionsError`](error::FunctionsError).
//!
//! ```ignore
//! use firebase_rs_functions::functions::{Functions, FunctionsSettings};
//! use serde_json::json;
//!
//! # async fn demo() -> firebase_rs_functions::functions::error::FunctionsResult<()> {
//! let functions = Functions::new(FunctionsSettings {
//!     project_id: Some("demo-project".into()),
//!     region_or_custom_domain: Some("europe-west1".into()),
//! })?;
//! let shout = functions.https_callable("shout")?;
//! shout.call_with_completion(Some(json!({ "text": "hi" })), |result| match result {
//!     Ok(result) => println!("{}", result.data()),
//!     Err(err) => eprintln!("shout failed: {err}"),
//! });
//! # Ok(())
//! # }
//! ```

use std::sync::LazyLock;

use crate::logger::Logger;

mod api;
mod callable;
mod client;
mod constants;
mod context;
pub mod error;
pub mod serializer;
pub mod transport;

pub use api::{Functions, FunctionsBuilder, FunctionsSettings};
pub use callable::{HttpsCallable, HttpsCallableResult, TypedHttpsCallable};
pub use client::{CallableEndpoint, FunctionsClient, HttpsCallableOptions};
pub use constants::{DEFAULT_REGION, DEFAULT_TIMEOUT};
pub use context::CallContext;

pub(crate) static LOGGER: LazyLock<Logger> =
    LazyLock::new(|| Logger::new("@firebase/functions"));
