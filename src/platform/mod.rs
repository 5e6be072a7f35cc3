//! Platform seams shared by the service modules: background task spawning and token sources.

pub mod runtime;
pub mod token;
