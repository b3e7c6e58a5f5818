//! Focus state machine settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Focus state machine settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Focus {
    /// Bare address of this focus service, used as the subscriber identity
    /// for the statistics feed. May be left empty when the host stamps
    /// origin addresses itself.
    pub address: String,

    /// Number of bridge-capable participants required before the room is
    /// switched from peer-to-peer to relayed media. Defaults to `2`.
    #[default = 2]
    pub min_participants: usize,

    /// Grace period between the capable participant count dropping below
    /// [`Focus::min_participants`] and the conference teardown. Zero means
    /// immediate teardown. Defaults to `0s`.
    #[default(Duration::from_secs(0))]
    #[serde(with = "humantime_serde")]
    pub linger_time: Duration,

    /// How long a COLIBRI channel allocation may stay unanswered before the
    /// room's pending state is reset and allocation is reissued on another
    /// bridge. Defaults to `30s`.
    #[default(Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub pending_timeout: Duration,
}
