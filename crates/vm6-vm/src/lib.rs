//! Virtual machine client for the VMmanager 6 API.
//!
//! Covers the `vm/v3/host` endpoints: creating, inspecting, removing, and
//! power-cycling hosts, plus reading their VNC console settings.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{VmClient, VmClientBuilder};
pub use models::{ForceRequest, HostAction};

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = vm6_core::Result<T>;
