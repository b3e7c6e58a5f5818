//! Static codec description shipped in every offer.
//!
//! The focus never renegotiates: clients receive this fixed table and are
//! expected to honor it. Treated as configuration data, parameterized only
//! by the [`Media`] feature toggles.
//!
//! [`Media`]: crate::conf::Media

use crate::conf::Media;

/// Payload type id the `rtx` payload binds to via its `apt` parameter.
pub const VP8_PT: u8 = 100;
/// Payload type id of the `rtx` payload when enabled.
pub const RTX_PT: u8 = 96;

/// One row of the static payload-type table.
#[derive(Clone, Copy, Debug)]
pub struct PayloadType {
    pub id: u8,
    pub name: &'static str,
    pub clockrate: u32,
    /// `0` means the attribute is omitted.
    pub channels: u8,
    /// `fmtp`-style parameters.
    pub parameters: &'static [(&'static str, &'static str)],
    /// RTCP feedback messages: `(type, subtype)`.
    pub rtcp_fbs: &'static [(&'static str, Option<&'static str>)],
}

/// One row of the static RTP header extension table.
#[derive(Clone, Copy, Debug)]
pub struct HdrExt {
    pub id: u8,
    pub uri: &'static str,
}

static AUDIO_PAYLOAD_TYPES: [PayloadType; 6] = [
    PayloadType {
        id: 111,
        name: "opus",
        clockrate: 48000,
        channels: 2,
        parameters: &[("minptime", "10")],
        rtcp_fbs: &[],
    },
    PayloadType {
        id: 103,
        name: "ISAC",
        clockrate: 16000,
        channels: 1,
        parameters: &[],
        rtcp_fbs: &[],
    },
    PayloadType {
        id: 104,
        name: "ISAC",
        clockrate: 32000,
        channels: 1,
        parameters: &[],
        rtcp_fbs: &[],
    },
    PayloadType {
        id: 9,
        name: "G722",
        clockrate: 8000,
        channels: 1,
        parameters: &[],
        rtcp_fbs: &[],
    },
    PayloadType {
        id: 0,
        name: "PCMU",
        clockrate: 8000,
        channels: 1,
        parameters: &[],
        rtcp_fbs: &[],
    },
    PayloadType {
        id: 8,
        name: "PCMA",
        clockrate: 8000,
        channels: 1,
        parameters: &[],
        rtcp_fbs: &[],
    },
];

static VP8: PayloadType = PayloadType {
    id: VP8_PT,
    name: "VP8",
    clockrate: 90000,
    channels: 0,
    parameters: &[],
    rtcp_fbs: &[
        ("ccm", Some("fir")),
        ("nack", None),
        ("nack", Some("pli")),
        ("goog-remb", None),
    ],
};

static RTX: PayloadType = PayloadType {
    id: RTX_PT,
    name: "rtx",
    clockrate: 90000,
    channels: 0,
    parameters: &[("apt", "100")],
    rtcp_fbs: &[],
};

static AUDIO_HDREXTS: [HdrExt; 1] = [HdrExt {
    id: 1,
    uri: "urn:ietf:params:rtp-hdrext:ssrc-audio-level",
}];

static VIDEO_HDREXTS: [HdrExt; 1] = [HdrExt {
    id: 3,
    uri: "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
}];

/// Payload types offered for the `audio` content.
pub fn audio_payload_types(_media: Media) -> Vec<PayloadType> {
    AUDIO_PAYLOAD_TYPES.to_vec()
}

/// Payload types offered for the `video` content. The `rtx` payload is
/// appended only when retransmissions are enabled.
pub fn video_payload_types(media: Media) -> Vec<PayloadType> {
    let mut pts = vec![VP8];
    if media.rtx {
        pts.push(RTX);
    }
    pts
}

/// RTP header extensions offered for the given content name.
pub fn hdrexts(content: &str) -> &'static [HdrExt] {
    match content {
        "audio" => &AUDIO_HDREXTS,
        "video" => &VIDEO_HDREXTS,
        _ => &[],
    }
}
