//! Media bridge settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Media bridge settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Bridge {
    /// Bridge to fall back to when no live bridge is known from the
    /// statistics feed. Always admissible.
    #[default(String::from("bridge.localhost"))]
    pub default_bridge: String,

    /// Staleness window for bridge statistics. A bridge whose last
    /// statistics are older than this is not considered for selection.
    /// Defaults to `60s`.
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub liveness: Duration,
}
