//! # vm6
//!
//! Client for the VMmanager 6 virtual machine hosting API.
//!
//! [`Vm6Client`] logs in with an email and password, keeps the returned
//! session token, and exposes one method per remote endpoint:
//!
//! ```no_run
//! # async fn run() -> vm6::Result<()> {
//! let client = vm6::Vm6Client::new("https://vm.example.com", "ops@example.com", "secret")?;
//! client.login().await?;
//! let host = client.vm(42u64).await?;
//! println!("{}", host["name"]);
//! client.restart(42u64).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;

pub use client::{Vm6Client, Vm6ClientBuilder};
pub use vm6_auth::LoginResponse;
pub use vm6_core::client::{ClientConfig, RetryPolicy};
pub use vm6_core::config::Vm6Config;
pub use vm6_core::types::{HostId, UserId};
pub use vm6_core::{Error, JsonObject};
pub use vm6_vm::HostAction;

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = vm6_core::Result<T>;
