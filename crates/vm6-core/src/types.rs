//! Core VMmanager API types.
//!
//! This module provides the API service enumeration, versioned request paths,
//! and strongly-typed identifiers used to fill path templates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Open key-value mapping used for loosely-typed request and response bodies.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// API services exposed by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Authentication service (tokens, user keys)
    Auth,
    /// Virtual machine service (hosts)
    Vm,
}

impl Service {
    /// Returns the service name as used in request paths.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Vm => "vm",
        }
    }

    /// Returns the API version this library speaks for the service.
    #[must_use]
    pub const fn default_version(&self) -> &'static str {
        match self {
            Self::Auth => "v4",
            Self::Vm => "v3",
        }
    }

    /// Returns all available services.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Auth, Self::Vm]
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auth" => Ok(Self::Auth),
            "vm" => Ok(Self::Vm),
            _ => Err(Error::ConfigError(format!("Unknown service: {s}"))),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A versioned request path: `{service}/{version}/{function}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiPath {
    service: String,
    version: String,
    function: String,
}

impl ApiPath {
    /// Create a path from raw segments.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            function: function.into(),
        }
    }

    /// Create a path for a known service at its default version.
    #[must_use]
    pub fn for_service(service: Service, function: impl Into<String>) -> Self {
        Self::new(service.name(), service.default_version(), function)
    }

    /// Service segment.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Version segment.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Function segment (may itself contain slashes).
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.service.trim_matches('/'),
            self.version.trim_matches('/'),
            self.function.trim_start_matches('/')
        )
    }
}

/// Whether `value` can stand as a single path segment without escaping it.
fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '?', '#', '%'])
        && !value.chars().any(char::is_whitespace)
}

/// Macro to generate strongly-typed identifiers for path templates.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses an identifier, rejecting values that would break the path.
            ///
            /// # Errors
            ///
            /// Returns an error if the value is empty, is a dot segment, or
            /// contains a character that would change the request URL.
            pub fn parse(input: &str) -> Result<Self> {
                let trimmed = input.trim();
                if !is_path_segment(trimmed) {
                    return Err(Error::ConfigError(format!(
                        concat!("Invalid ", stringify!($name), ": `{}`"),
                        input
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(id: &str) -> Result<Self> {
                Self::parse(id)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(id: String) -> Result<Self> {
                Self::parse(&id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(HostId, "Virtual machine (host) identifier");
id_type!(UserId, "User account identifier");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names_and_versions() {
        assert_eq!(Service::Auth.name(), "auth");
        assert_eq!(Service::Auth.default_version(), "v4");
        assert_eq!(Service::Vm.name(), "vm");
        assert_eq!(Service::Vm.default_version(), "v3");
        assert_eq!(Service::all().len(), 2);
    }

    #[test]
    fn test_service_from_str() {
        assert_eq!("auth".parse::<Service>().unwrap(), Service::Auth);
        assert_eq!("VM".parse::<Service>().unwrap(), Service::Vm);
        assert!("dns".parse::<Service>().is_err());
    }

    #[test]
    fn test_api_path_display() {
        let path = ApiPath::for_service(Service::Auth, "public/token");
        assert_eq!(path.to_string(), "auth/v4/public/token");

        let path = ApiPath::new("vm", "v3", "/host/12/start");
        assert_eq!(path.to_string(), "vm/v3/host/12/start");
        assert_eq!(path.function(), "/host/12/start");
    }

    #[test]
    fn test_id_conversions() {
        assert_eq!(HostId::from(42u64).as_str(), "42");
        assert_eq!(HostId::try_from("17").unwrap().to_string(), "17");
        assert_eq!(UserId::try_from("5".to_string()).unwrap().as_ref(), "5");
        assert_eq!(String::from(HostId::from(8u64)), "8");
    }

    #[test]
    fn test_id_parse_rejects_bad_values() {
        assert_eq!(" 9 ".parse::<HostId>().unwrap().as_str(), "9");
        assert_eq!(HostId::parse("vm-a.b_1").unwrap().as_str(), "vm-a.b_1");
        for bad in ["", "  ", ".", "..", "1/start", "..\\x", "5?force=1", "5#x", "%2e%2e", "a b"] {
            assert!(
                matches!(HostId::parse(bad), Err(Error::ConfigError(_))),
                "accepted {bad:?}"
            );
        }
        assert!(UserId::try_from("..").is_err());
        assert!(HostId::try_from("5/stop".to_string()).is_err());
    }

    #[test]
    fn test_id_serde() {
        let id: HostId = serde_json::from_str(r#""77""#).unwrap();
        assert_eq!(id.as_str(), "77");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""77""#);
        assert!(serde_json::from_str::<HostId>(r#""../auth""#).is_err());
    }
}
