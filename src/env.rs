//! Host environment hints for the verifier's environment gate.
//!
//! Every hint is optional; a missing hint means "unconstrained".

use serde::{Deserialize, Serialize};

/// Effective connection classes, slowest first.
pub const SLOWEST_CONNECTION_TYPES: &[&str] = &["slow-2g", "2g"];

/// Device memory floor in GiB below which trials are skipped.
pub const MIN_DEVICE_MEMORY_GB: f64 = 2.0;

/// Network quality snapshot attached to verification results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_data: Option<bool>,
    /// Estimated downlink in Mbit/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downlink_mbps: Option<f64>,
}

/// Host hints consulted before a trial load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostEnvironment {
    #[serde(default)]
    pub network: NetworkInfo,
    /// `Some(false)` when the consumer is hidden / backgrounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory_gb: Option<f64>,
}

impl HostEnvironment {
    /// Reason the host should not run trial loads, if any.
    #[must_use]
    pub fn constraint(&self) -> Option<&'static str> {
        if self.network.save_data == Some(true) {
            return Some("data saver enabled");
        }
        if let Some(effective) = &self.network.effective_type {
            if SLOWEST_CONNECTION_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(effective))
            {
                return Some("slow connection");
            }
        }
        if self.visible == Some(false) {
            return Some("not visible");
        }
        if matches!(self.device_memory_gb, Some(mem) if mem < MIN_DEVICE_MEMORY_GB) {
            return Some("low device memory");
        }
        None
    }

    #[must_use]
    pub fn is_constrained(&self) -> bool {
        self.constraint().is_some()
    }
}

/// Supplies the current [`HostEnvironment`]. Queried once per `verify`.
pub trait EnvironmentSource: Send + Sync {
    fn current(&self) -> HostEnvironment;
}

/// Fixed environment, unconstrained by default.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment(pub HostEnvironment);

impl EnvironmentSource for StaticEnvironment {
    fn current(&self) -> HostEnvironment {
        self.0.clone()
    }
}
