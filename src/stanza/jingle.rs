//! Jingle payload builders and parsing.
//!
//! The focus initiates one Jingle session per participant: the offer is
//! composed from the bridge's channel transports, the static codec
//! description and the cumulative sources of every other participant.
//! Later source changes travel as `source-add` / `source-remove` deltas.

use minidom::Element;

use crate::{
    conf::Media,
    media::{codecs, SourceMap},
    stanza::{colibri::EndpointChannels, ns, StanzaError},
};

/// SCTP port offered for the `data` content.
const SCTP_PORT: &str = "5000";
/// Stream count offered for the `data` content.
const SCTP_STREAMS: &str = "1024";

/// Jingle actions the focus knows about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    SessionInitiate,
    SessionAccept,
    SessionInfo,
    SessionTerminate,
    SourceAdd,
    SourceRemove,
    TransportInfo,
}

impl Action {
    /// Parses the `action` attribute value.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "session-initiate" => Some(Self::SessionInitiate),
            "session-accept" => Some(Self::SessionAccept),
            "session-info" => Some(Self::SessionInfo),
            "session-terminate" => Some(Self::SessionTerminate),
            "source-add" => Some(Self::SourceAdd),
            "source-remove" => Some(Self::SourceRemove),
            "transport-info" => Some(Self::TransportInfo),
            _ => None,
        }
    }

    /// Wire value of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionInitiate => "session-initiate",
            Self::SessionAccept => "session-accept",
            Self::SessionInfo => "session-info",
            Self::SessionTerminate => "session-terminate",
            Self::SourceAdd => "source-add",
            Self::SourceRemove => "source-remove",
            Self::TransportInfo => "transport-info",
        }
    }
}

/// One `<content>` of an inbound Jingle payload.
#[derive(Clone, Debug)]
pub struct ParsedContent {
    pub name: String,
    pub description: Option<Element>,
    pub transport: Option<Element>,
}

/// A parsed inbound Jingle payload.
#[derive(Clone, Debug)]
pub struct JinglePayload {
    pub action: Action,
    pub sid: String,
    pub contents: Vec<ParsedContent>,
    /// The raw `<jingle>` element, for payloads carrying children outside
    /// the content list (`session-info`).
    pub jingle: Element,
}

/// Extracts the Jingle payload of an `<iq>`, if any.
pub fn parse(iq: &Element) -> Result<Option<JinglePayload>, StanzaError> {
    let jingle = match iq.get_child("jingle", ns::JINGLE) {
        Some(jingle) => jingle,
        None => return Ok(None),
    };
    let action_attr = jingle
        .attr("action")
        .ok_or(StanzaError::MissingAttr("jingle", "action"))?;
    let action = Action::from_attr(action_attr).ok_or_else(|| {
        StanzaError::Malformed(format!("unknown jingle action: {}", action_attr))
    })?;
    let sid = jingle
        .attr("sid")
        .ok_or(StanzaError::MissingAttr("jingle", "sid"))?
        .to_owned();

    let contents = jingle
        .children()
        .filter(|c| c.is("content", ns::JINGLE))
        .map(|content| ParsedContent {
            name: content.attr("name").unwrap_or_default().to_owned(),
            description: content
                .get_child("description", ns::JINGLE_RTP)
                .cloned(),
            transport: content
                .get_child("transport", ns::JINGLE_ICE_UDP)
                .cloned(),
        })
        .collect();

    Ok(Some(JinglePayload {
        action,
        sid,
        contents,
        jingle: jingle.clone(),
    }))
}

/// Mute change requested by a `session-info` payload.
#[derive(Clone, Debug)]
pub struct MuteInfo {
    pub muted: bool,
    /// Content name the change is scoped to; `None` applies to all media.
    pub content: Option<String>,
    /// Stream ids the change is restricted to; empty applies to all.
    pub msids: Vec<String>,
}

/// Extracts a mute / unmute request from a `session-info` payload.
pub fn parse_mute(jingle: &Element) -> Option<MuteInfo> {
    for child in jingle.children() {
        let muted = if child.is("mute", ns::JINGLE_RTP_INFO) {
            true
        } else if child.is("unmute", ns::JINGLE_RTP_INFO) {
            false
        } else {
            continue;
        };
        let content = child.attr("name").map(str::to_owned);
        let mut msids: Vec<String> = child
            .children()
            .filter(|c| c.is("mediastream", ns::MMUC))
            .filter_map(|c| c.attr("msid"))
            .map(str::to_owned)
            .collect();
        if msids.is_empty() {
            msids = jingle
                .children()
                .filter(|c| c.is("mediastream", ns::MMUC))
                .filter_map(|c| c.attr("msid"))
                .map(str::to_owned)
                .collect();
        }
        return Some(MuteInfo { muted, content, msids });
    }
    None
}

/// Inputs of a `session-initiate` offer.
#[derive(Debug)]
pub struct Offer<'a> {
    /// Freshly generated session id.
    pub sid: &'a str,
    /// Focus occupant address stamped as the session initiator.
    pub initiator: &'a str,
    pub media: Media,
    /// Bridge channels of the endpoint the offer is addressed to, with
    /// transports already resolved.
    pub channels: &'a EndpointChannels,
    /// Cumulative sources of every *other* participant, per content name.
    pub remote_sources: &'a SourceMap,
}

/// Builds a `session-initiate` payload.
pub fn session_initiate(offer: &Offer<'_>) -> Element {
    let mut jingle = Element::builder("jingle", ns::JINGLE)
        .attr("action", Action::SessionInitiate.as_str())
        .attr("initiator", offer.initiator)
        .attr("sid", offer.sid);

    let no_sources: Vec<Element> = Vec::new();
    let mut grouped: Vec<&str> = Vec::new();

    for &name in ["audio", "video"].iter() {
        let channel = match offer.channels.get(name) {
            Some(channel) => channel,
            None => continue,
        };
        let payload_types = match name {
            "audio" => codecs::audio_payload_types(offer.media),
            _ => codecs::video_payload_types(offer.media),
        };
        let sources = offer.remote_sources.get(name).unwrap_or(&no_sources);
        let description = rtp_description(
            name,
            &payload_types,
            codecs::hdrexts(name),
            sources,
        );
        jingle = jingle.append(
            Element::builder("content", ns::JINGLE)
                .attr("creator", "initiator")
                .attr("name", name)
                .attr("senders", "both")
                .append(description)
                .append(offer_transport(channel.transport.as_ref(), false))
                .build(),
        );
        grouped.push(name);
    }

    if offer.media.datachannels {
        if let Some(channel) = offer.channels.get("data") {
            jingle = jingle.append(
                Element::builder("content", ns::JINGLE)
                    .attr("creator", "initiator")
                    .attr("name", "data")
                    .attr("senders", "both")
                    .append(offer_transport(channel.transport.as_ref(), true))
                    .build(),
            );
            grouped.push("data");
        }
    }

    if offer.media.bundle {
        let mut group = Element::builder("group", ns::JINGLE_GROUPING)
            .attr("semantics", "BUNDLE");
        for name in grouped {
            group = group.append(
                Element::builder("content", ns::JINGLE_GROUPING)
                    .attr("name", name)
                    .build(),
            );
        }
        jingle = jingle.append(group.build());
    }

    jingle.build()
}

/// Builds a `source-add` / `source-remove` delta payload.
pub fn source_delta(
    action: Action,
    sid: &str,
    initiator: &str,
    delta: &SourceMap,
) -> Element {
    let mut jingle = Element::builder("jingle", ns::JINGLE)
        .attr("action", action.as_str())
        .attr("initiator", initiator)
        .attr("sid", sid);

    fn rank(name: &str) -> u8 {
        match name {
            "audio" => 0,
            "video" => 1,
            _ => 2,
        }
    }
    let mut names: Vec<&String> =
        delta.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| k).collect();
    names.sort_by(|a, b| {
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    });

    for name in names {
        let mut description = Element::builder("description", ns::JINGLE_RTP)
            .attr("media", name.as_str());
        for source in &delta[name] {
            description = description.append(source.clone());
        }
        jingle = jingle.append(
            Element::builder("content", ns::JINGLE)
                .attr("creator", "initiator")
                .attr("name", name.as_str())
                .append(description.build())
                .build(),
        );
    }

    jingle.build()
}

/// Builds a `session-terminate` payload with the given reason.
pub fn session_terminate(sid: &str, initiator: &str, reason: &str) -> Element {
    Element::builder("jingle", ns::JINGLE)
        .attr("action", Action::SessionTerminate.as_str())
        .attr("initiator", initiator)
        .attr("sid", sid)
        .append(
            Element::builder("reason", ns::JINGLE)
                .append(Element::builder(reason, ns::JINGLE).build())
                .build(),
        )
        .build()
}

/// Copies the bridge transport into an offer, forcing the DTLS setup role
/// to `actpass`, and attaching an `sctpmap` for the data content.
fn offer_transport(transport: Option<&Element>, data: bool) -> Element {
    let mut out = match transport {
        Some(transport) => transport.clone(),
        None => Element::builder("transport", ns::JINGLE_ICE_UDP).build(),
    };
    for child in out.children_mut() {
        if child.is("fingerprint", ns::JINGLE_DTLS) {
            child.set_attr("setup", "actpass");
        }
    }
    if data {
        out.append_child(
            Element::builder("sctpmap", ns::JINGLE_DTLS_SCTP)
                .attr("number", SCTP_PORT)
                .attr("protocol", "webrtc-datachannel")
                .attr("streams", SCTP_STREAMS)
                .build(),
        );
    }
    out
}

/// Builds an RTP description from the static codec table plus remote
/// sources.
fn rtp_description(
    content: &str,
    payload_types: &[codecs::PayloadType],
    hdrexts: &[codecs::HdrExt],
    sources: &[Element],
) -> Element {
    let mut description = Element::builder("description", ns::JINGLE_RTP)
        .attr("media", content);

    for pt in payload_types {
        let mut payload = Element::builder("payload-type", ns::JINGLE_RTP)
            .attr("id", pt.id.to_string())
            .attr("name", pt.name)
            .attr("clockrate", pt.clockrate.to_string());
        if pt.channels > 0 {
            payload = payload.attr("channels", pt.channels.to_string());
        }
        for (name, value) in pt.parameters {
            payload = payload.append(
                Element::builder("parameter", ns::JINGLE_RTP)
                    .attr("name", *name)
                    .attr("value", *value)
                    .build(),
            );
        }
        for (fb_type, subtype) in pt.rtcp_fbs {
            let mut fb = Element::builder("rtcp-fb", ns::JINGLE_RTCP_FB)
                .attr("type", *fb_type);
            if let Some(subtype) = subtype {
                fb = fb.attr("subtype", *subtype);
            }
            payload = payload.append(fb.build());
        }
        description = description.append(payload.build());
    }

    for hdrext in hdrexts {
        description = description.append(
            Element::builder("rtp-hdrext", ns::JINGLE_RTP_HDREXT)
                .attr("id", hdrext.id.to_string())
                .attr("uri", hdrext.uri)
                .build(),
        );
    }

    description = description
        .append(Element::builder("rtcp-mux", ns::JINGLE_RTP).build());

    for source in sources {
        description = description.append(source.clone());
    }

    description.build()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::stanza::colibri::Channel;

    fn transport_with_fingerprint() -> Element {
        Element::builder("transport", ns::JINGLE_ICE_UDP)
            .attr("ufrag", "u1")
            .attr("pwd", "p1")
            .append(
                Element::builder("fingerprint", ns::JINGLE_DTLS)
                    .attr("hash", "sha-256")
                    .attr("setup", "passive")
                    .append("AA:BB:CC".to_owned())
                    .build(),
            )
            .build()
    }

    fn channels() -> EndpointChannels {
        EndpointChannels {
            audio: Some(Channel {
                id: "a1".to_owned(),
                transport: Some(transport_with_fingerprint()),
            }),
            video: Some(Channel {
                id: "v1".to_owned(),
                transport: Some(transport_with_fingerprint()),
            }),
            data: Some(Channel {
                id: "d1".to_owned(),
                transport: Some(transport_with_fingerprint()),
            }),
        }
    }

    fn remote_source(ssrc: &str) -> Element {
        Element::builder("source", ns::JINGLE_SSMA)
            .attr("ssrc", ssrc)
            .build()
    }

    #[test]
    fn initiate_offer_shape() {
        let mut remote_sources = SourceMap::new();
        remote_sources
            .insert("audio".to_owned(), vec![remote_source("4242")]);

        let channels = channels();
        let offer = session_initiate(&Offer {
            sid: "sid1",
            initiator: "room@muc.example.com/focus",
            media: Media::default(),
            channels: &channels,
            remote_sources: &remote_sources,
        });

        assert_eq!(offer.attr("action"), Some("session-initiate"));
        assert_eq!(offer.attr("sid"), Some("sid1"));

        let contents: Vec<_> = offer
            .children()
            .filter(|c| c.is("content", ns::JINGLE))
            .collect();
        assert_eq!(contents.len(), 3);

        let audio = contents[0];
        let description =
            audio.get_child("description", ns::JINGLE_RTP).unwrap();
        assert!(description
            .children()
            .any(|c| c.is("payload-type", ns::JINGLE_RTP)
                && c.attr("name") == Some("opus")));
        assert!(description.get_child("rtcp-mux", ns::JINGLE_RTP).is_some());
        assert!(description
            .children()
            .any(|c| c.is("source", ns::JINGLE_SSMA)
                && c.attr("ssrc") == Some("4242")));

        let transport =
            audio.get_child("transport", ns::JINGLE_ICE_UDP).unwrap();
        let fingerprint =
            transport.get_child("fingerprint", ns::JINGLE_DTLS).unwrap();
        assert_eq!(fingerprint.attr("setup"), Some("actpass"));

        let data = contents[2];
        assert_eq!(data.attr("name"), Some("data"));
        let data_transport =
            data.get_child("transport", ns::JINGLE_ICE_UDP).unwrap();
        assert!(data_transport
            .get_child("sctpmap", ns::JINGLE_DTLS_SCTP)
            .is_some());

        let group = offer.get_child("group", ns::JINGLE_GROUPING).unwrap();
        assert_eq!(group.attr("semantics"), Some("BUNDLE"));
        assert_eq!(group.children().count(), 3);
    }

    #[test]
    fn no_bundle_no_group() {
        let media = Media { bundle: false, ..Media::default() };
        let channels = channels();
        let offer = session_initiate(&Offer {
            sid: "sid1",
            initiator: "room@muc.example.com/focus",
            media,
            channels: &channels,
            remote_sources: &SourceMap::new(),
        });
        assert!(offer.get_child("group", ns::JINGLE_GROUPING).is_none());
    }

    #[test]
    fn source_delta_skips_empty_contents() {
        let mut delta = SourceMap::new();
        delta.insert("audio".to_owned(), vec![remote_source("1")]);
        delta.insert("video".to_owned(), vec![]);

        let jingle = source_delta(
            Action::SourceAdd,
            "sid2",
            "room@muc.example.com/focus",
            &delta,
        );
        assert_eq!(jingle.attr("action"), Some("source-add"));
        let contents: Vec<_> = jingle
            .children()
            .filter(|c| c.is("content", ns::JINGLE))
            .collect();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].attr("name"), Some("audio"));
    }

    #[test]
    fn terminate_carries_reason() {
        let jingle = session_terminate(
            "sid3",
            "room@muc.example.com/focus",
            "success",
        );
        let reason = jingle.get_child("reason", ns::JINGLE).unwrap();
        assert!(reason.get_child("success", ns::JINGLE).is_some());
    }

    #[test]
    fn parses_accept_payload() {
        let iq = Element::builder("iq", ns::CLIENT)
            .attr("type", "set")
            .attr("id", "j1")
            .append(
                Element::builder("jingle", ns::JINGLE)
                    .attr("action", "session-accept")
                    .attr("sid", "sid4")
                    .append(
                        Element::builder("content", ns::JINGLE)
                            .attr("name", "audio")
                            .append(
                                Element::builder(
                                    "description",
                                    ns::JINGLE_RTP,
                                )
                                .attr("media", "audio")
                                .build(),
                            )
                            .build(),
                    )
                    .build(),
            )
            .build();

        let payload = parse(&iq).unwrap().unwrap();
        assert_eq!(payload.action, Action::SessionAccept);
        assert_eq!(payload.sid, "sid4");
        assert_eq!(payload.contents.len(), 1);
        assert!(payload.contents[0].description.is_some());
        assert!(payload.contents[0].transport.is_none());
    }

    #[test]
    fn non_jingle_iq_parses_to_none() {
        let iq = Element::builder("iq", ns::CLIENT).attr("type", "set").build();
        assert!(parse(&iq).unwrap().is_none());
    }

    #[test]
    fn mute_with_mediastream_restriction() {
        let jingle = Element::builder("jingle", ns::JINGLE)
            .attr("action", "session-info")
            .attr("sid", "sid5")
            .append(
                Element::builder("mute", ns::JINGLE_RTP_INFO)
                    .attr("name", "audio")
                    .append(
                        Element::builder("mediastream", ns::MMUC)
                            .attr("msid", "m1")
                            .build(),
                    )
                    .build(),
            )
            .build();

        let mute = parse_mute(&jingle).unwrap();
        assert!(mute.muted);
        assert_eq!(mute.content.as_deref(), Some("audio"));
        assert_eq!(mute.msids, vec!["m1".to_owned()]);
    }

    #[test]
    fn unmute_without_restriction_applies_to_all() {
        let jingle = Element::builder("jingle", ns::JINGLE)
            .attr("action", "session-info")
            .attr("sid", "sid6")
            .append(Element::builder("unmute", ns::JINGLE_RTP_INFO).build())
            .build();

        let mute = parse_mute(&jingle).unwrap();
        assert!(!mute.muted);
        assert_eq!(mute.content, None);
        assert!(mute.msids.is_empty());
    }

    #[test]
    fn delta_sources_keyed_by_content() {
        let mut delta: HashMap<String, Vec<Element>> = HashMap::new();
        delta.insert("video".to_owned(), vec![remote_source("7")]);
        delta.insert("audio".to_owned(), vec![remote_source("8")]);
        let jingle = source_delta(
            Action::SourceRemove,
            "sid7",
            "room@muc.example.com/focus",
            &delta,
        );
        let names: Vec<_> = jingle
            .children()
            .filter(|c| c.is("content", ns::JINGLE))
            .filter_map(|c| c.attr("name"))
            .collect();
        assert_eq!(names, vec!["audio", "video"]);
    }
}
