//! # vm6-core
//!
//! Core types and HTTP plumbing shared by the VMmanager 6 API clients.
//!
//! ## Modules
//!
//! - [`error`] - Error type carrying HTTP status and body text
//! - [`types`] - API services, versioned paths, and typed identifiers
//! - [`config`] - Connection configuration with validation and env loading
//! - [`client`] - Retry policy, HTTP configuration, and the shared request routine
//! - [`session`] - Session token storage shared between clients

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::JsonObject;
