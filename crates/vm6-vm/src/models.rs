//! Request bodies and power actions for the `vm/v3/host` endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use vm6_core::types::HostId;

/// Body sent with stop and restart: `{"force": true}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForceRequest {
    /// Force the action even if the guest does not respond.
    pub force: bool,
}

impl ForceRequest {
    /// A forced action.
    pub const FORCED: Self = Self { force: true };
}

/// Power actions available on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAction {
    /// Boot the host.
    Start,
    /// Power the host off (forced).
    Stop,
    /// Reboot the host (forced).
    Restart,
}

impl HostAction {
    /// Path suffix of the action endpoint.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    /// Body sent with the action, if any.
    #[must_use]
    pub const fn body(&self) -> Option<ForceRequest> {
        match self {
            Self::Start => None,
            Self::Stop | Self::Restart => Some(ForceRequest::FORCED),
        }
    }

    /// Function path for the action on a host.
    #[must_use]
    pub fn function(&self, id: &HostId) -> String {
        format!("host/{id}/{}", self.name())
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn force_request_shape() {
        assert_eq!(
            serde_json::to_value(ForceRequest::FORCED).unwrap(),
            json!({"force": true})
        );
    }

    #[test]
    fn action_functions_and_bodies() {
        let id = HostId::from(9u64);
        assert_eq!(HostAction::Start.function(&id), "host/9/start");
        assert_eq!(HostAction::Stop.function(&id), "host/9/stop");
        assert_eq!(HostAction::Restart.function(&id), "host/9/restart");

        assert_eq!(HostAction::Start.body(), None);
        assert_eq!(HostAction::Stop.body(), Some(ForceRequest::FORCED));
        assert_eq!(HostAction::Restart.body(), Some(ForceRequest::FORCED));
    }
}
