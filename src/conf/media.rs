//! Media feature toggles for built offers.

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Media feature toggles applied to COLIBRI allocations and Jingle offers.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Media {
    /// Transport all media of an endpoint over a single ICE/DTLS 5-tuple.
    /// Attaches `channel-bundle-id` to allocated channels and a `BUNDLE`
    /// grouping element to offers. Defaults to `true`.
    #[default = true]
    pub bundle: bool,

    /// Allocate SCTP connections and offer a `data` content for WebRTC
    /// datachannels. Defaults to `true`.
    #[default = true]
    pub datachannels: bool,

    /// Offer an `rtx` payload type bound to VP8 retransmissions.
    /// Defaults to `false`.
    #[default = false]
    pub rtx: bool,
}
