//! Feature and presence surface of the focus.
//!
//! The focus advertises its capability tokens in service discovery and
//! stamps occupant presence with `mediastream` annotations reflecting the
//! authoritative msid map, so peers always see consistent media metadata.

use std::collections::BTreeMap;

use minidom::Element;

use crate::{media::MsidState, stanza::ns};

/// Capability tokens published in the room's service-discovery info.
///
/// COLIBRI is deliberately absent: it is a focus-to-bridge concern.
pub static FOCUS_FEATURES: [&str; 5] = [
    ns::JINGLE,
    ns::JINGLE_ICE_UDP,
    ns::JINGLE_RTP,
    ns::JINGLE_DTLS,
    ns::MMUC,
];

/// Builds the disco#info result payload listing [`FOCUS_FEATURES`].
pub fn disco_info() -> Element {
    let mut query = Element::builder("query", ns::DISCO_INFO);
    for feature in FOCUS_FEATURES.iter() {
        query = query.append(
            Element::builder("feature", ns::DISCO_INFO)
                .attr("var", *feature)
                .build(),
        );
    }
    query.build()
}

/// Capability probe: a participant is bridge-capable iff its joining
/// presence carries a `conf` element with `bridged` set truthy.
pub fn is_bridged(presence: &Element) -> bool {
    presence
        .get_child("conf", ns::MMUC)
        .and_then(|conf| conf.attr("bridged"))
        .map_or(false, |v| v == "1" || v == "true")
}

/// Builds a room mode status message. `to` is the room address for the
/// groupchat broadcast or the joiner's full address for the unicast copy.
pub fn mode_message(to: &str, groupchat: bool, mode: &str) -> Element {
    let mut message = Element::builder("message", ns::CLIENT).attr("to", to);
    if groupchat {
        message = message.attr("type", "groupchat");
    }
    message
        .append(
            Element::builder("status", ns::MMUC).attr("mode", mode).build(),
        )
        .build()
}

/// Strips every mmuc `mediastream` annotation off a presence.
pub fn strip_mediastreams(presence: &Element) -> Element {
    let mut out = presence.clone();
    while out.remove_child("mediastream", ns::MMUC).is_some() {}
    out
}

/// Strips stale `mediastream` annotations and re-stamps the presence from
/// the authoritative msid map.
pub fn stamp_mediastreams(
    presence: &Element,
    msids: &BTreeMap<String, MsidState>,
) -> Element {
    let mut out = strip_mediastreams(presence);
    for (msid, state) in msids {
        out.append_child(mediastream(msid, state));
    }
    out
}

/// Builds a presence of the room occupant `nick` carrying the current
/// media annotations, for the host to publish.
pub fn occupant_presence(
    room: &jid::BareJid,
    nick: &str,
    msids: &BTreeMap<String, MsidState>,
) -> Element {
    let mut presence = Element::builder("presence", ns::CLIENT)
        .attr("from", format!("{}/{}", room, nick));
    for (msid, state) in msids {
        presence = presence.append(mediastream(msid, state));
    }
    presence.build()
}

fn mediastream(msid: &str, state: &MsidState) -> Element {
    Element::builder("mediastream", ns::MMUC)
        .attr("msid", msid)
        .attr("audio", state.audio.clone())
        .attr("video", state.video.clone())
        .build()
}
