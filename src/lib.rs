//! Rust client for Cloud Functions for Firebase callable HTTPS triggers.
//!
//! See [`functions`] for the client and callable references, [`platform::token`] for the
//! token provider seams and [`logger`] for log configuration.

pub mod functions;
pub mod logger;
pub mod platform;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
