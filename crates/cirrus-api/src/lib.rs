//! # Cirrus API
//!
//! HTTP client layer for the Cirrus Cloud Servers API.
//! This crate provides the authenticated session (token caching, one-shot
//! re-authentication on 401) and the generic resource mapper that turns
//! `cirrus-core` records into REST calls.

pub mod errors;
pub mod mapper;
pub mod sdk;
pub mod session;

// Re-export common types for convenience
pub use errors::*;
pub use mapper::*;
pub use sdk::*;
pub use session::*;

// Re-export core types that API consumers will need
pub use cirrus_core::{Flavor, Image, Resource, ResourceKind, Server};
