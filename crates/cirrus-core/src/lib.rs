//! # Cirrus Core
//!
//! Core domain model for the Cirrus Cloud Servers client.
//!
//! This crate contains pure domain logic with no I/O dependencies:
//! - Resource records (servers, images, flavors)
//! - Resource kind descriptors and capability tables
//! - English pluralization for URL/envelope names
//! - Error definitions
//!
//! The HTTP session and the generic CRUD engine live in `cirrus-api`.

pub mod errors;
pub mod inflect;
pub mod models;
pub mod resource;

// Re-export commonly used types
pub use errors::{CirrusError, Result};
pub use models::{Flavor, Image, Server};
pub use resource::{Capabilities, Resource, ResourceKind, UpdatableFields};
