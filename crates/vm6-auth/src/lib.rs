//! Authentication client for the VMmanager 6 API.
//!
//! Covers the `auth/v4` endpoints: obtaining a session token and fetching
//! per-user auth keys.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{AuthClient, AuthClientBuilder};
pub use models::{AuthKey, LoginRequest, LoginResponse};

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = vm6_core::Result<T>;
