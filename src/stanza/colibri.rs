//! COLIBRI conference element builders and reply parsing.
//!
//! The focus talks to the bridge exclusively through `<conference>`
//! elements: channel allocation (create/update), channel description
//! updates translated from Jingle payloads, and expiry. Channel ids are
//! assigned by the bridge and treated as opaque strings.

use std::collections::HashMap;

use minidom::Element;

use crate::{
    conf::Media,
    stanza::{jingle::ParsedContent, ns, StanzaError},
};

/// Content names a conference is allocated with.
pub const MEDIA_CONTENTS: [&str; 2] = ["audio", "video"];

/// One bridge-side channel of an endpoint.
#[derive(Clone, Debug)]
pub struct Channel {
    /// Bridge-assigned channel id.
    pub id: String,
    /// ICE transport advertised for this channel, when not bundled.
    pub transport: Option<Element>,
}

/// Channels allocated for one endpoint, one per medium.
#[derive(Clone, Debug, Default)]
pub struct EndpointChannels {
    pub audio: Option<Channel>,
    pub video: Option<Channel>,
    pub data: Option<Channel>,
}

impl EndpointChannels {
    /// Whether the per-medium channel map is usable for a session: audio
    /// and video must both be present.
    pub fn is_complete(&self) -> bool {
        self.audio.is_some() && self.video.is_some()
    }

    /// Channel for the given content name.
    pub fn get(&self, content: &str) -> Option<&Channel> {
        match content {
            "audio" => self.audio.as_ref(),
            "video" => self.video.as_ref(),
            "data" => self.data.as_ref(),
            _ => None,
        }
    }

    /// Iterates `(content name, channel)` pairs of present channels.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Channel)> {
        self.audio
            .iter()
            .map(|ch| ("audio", ch))
            .chain(self.video.iter().map(|ch| ("video", ch)))
            .chain(self.data.iter().map(|ch| ("data", ch)))
    }
}

/// Builds a conference create (no `id`) or allocation update (`id` set)
/// requesting channels for every given endpoint.
pub fn conference_request(
    conference_id: Option<&str>,
    endpoints: &[String],
    media: Media,
) -> Element {
    let mut conference = Element::builder("conference", ns::COLIBRI);
    if let Some(id) = conference_id {
        conference = conference.attr("id", id);
    }
    for &name in MEDIA_CONTENTS.iter() {
        let mut content =
            Element::builder("content", ns::COLIBRI).attr("name", name);
        for endpoint in endpoints {
            let mut channel = Element::builder("channel", ns::COLIBRI)
                .attr("initiator", "true")
                .attr("endpoint", endpoint.as_str());
            if media.bundle {
                channel = channel.attr("channel-bundle-id", endpoint.as_str());
            }
            content = content.append(channel.build());
        }
        conference = conference.append(content.build());
    }
    if media.datachannels {
        let mut content =
            Element::builder("content", ns::COLIBRI).attr("name", "data");
        for endpoint in endpoints {
            let mut sctp = Element::builder("sctpconnection", ns::COLIBRI)
                .attr("initiator", "true")
                .attr("endpoint", endpoint.as_str());
            if media.bundle {
                sctp = sctp.attr("channel-bundle-id", endpoint.as_str());
            }
            content = content.append(sctp.build());
        }
        conference = conference.append(content.build());
    }
    conference.build()
}

/// Translates a Jingle payload of `endpoint` into a conference update for
/// its channels: payload types, RTP header extensions, `rtcp-mux`, FID
/// source groups and the transport, per content.
pub fn update_request(
    conference_id: &str,
    endpoint: &str,
    contents: &[ParsedContent],
    channels: &EndpointChannels,
) -> Element {
    let mut conference = Element::builder("conference", ns::COLIBRI)
        .attr("id", conference_id);
    for parsed in contents {
        let channel = match channels.get(&parsed.name) {
            Some(channel) => channel,
            None => continue,
        };
        let element_name =
            if parsed.name == "data" { "sctpconnection" } else { "channel" };
        let mut ch = Element::builder(element_name, ns::COLIBRI)
            .attr("id", channel.id.as_str())
            .attr("endpoint", endpoint);
        if let Some(description) = &parsed.description {
            for pt in description
                .children()
                .filter(|c| c.is("payload-type", ns::JINGLE_RTP))
            {
                ch = ch.append(pt.clone());
            }
            for hdrext in description
                .children()
                .filter(|c| c.is("rtp-hdrext", ns::JINGLE_RTP_HDREXT))
            {
                ch = ch.append(hdrext.clone());
            }
            if let Some(mux) =
                description.get_child("rtcp-mux", ns::JINGLE_RTP)
            {
                ch = ch.append(mux.clone());
            }
            for group in description.children().filter(|c| {
                c.is("ssrc-group", ns::JINGLE_SSMA)
                    && c.attr("semantics") == Some("FID")
            }) {
                ch = ch.append(group.clone());
            }
        }
        if let Some(transport) = &parsed.transport {
            ch = ch.append(transport.clone());
        }
        conference = conference.append(
            Element::builder("content", ns::COLIBRI)
                .attr("name", parsed.name.as_str())
                .append(ch.build())
                .build(),
        );
    }
    conference.build()
}

/// Builds a minimal conference update expiring every given channel set.
pub fn expire_request(
    conference_id: &str,
    sets: &[&EndpointChannels],
) -> Element {
    let mut by_content: HashMap<&'static str, Vec<&Channel>> = HashMap::new();
    for set in sets {
        for (name, channel) in set.iter() {
            by_content.entry(name).or_default().push(channel);
        }
    }

    let mut conference = Element::builder("conference", ns::COLIBRI)
        .attr("id", conference_id);
    for &name in ["audio", "video", "data"].iter() {
        let channels = match by_content.get(name) {
            Some(channels) if !channels.is_empty() => channels,
            _ => continue,
        };
        let element_name =
            if name == "data" { "sctpconnection" } else { "channel" };
        let mut content =
            Element::builder("content", ns::COLIBRI).attr("name", name);
        for channel in channels {
            content = content.append(
                Element::builder(element_name, ns::COLIBRI)
                    .attr("id", channel.id.as_str())
                    .attr("expire", "0")
                    .build(),
            );
        }
        conference = conference.append(content.build());
    }
    conference.build()
}

/// A parsed bridge reply to a conference create or update.
#[derive(Clone, Debug)]
pub struct ConferenceReply {
    /// Bridge-assigned conference id.
    pub id: String,
    endpoints: HashMap<String, EndpointChannels>,
    bundles: HashMap<String, Element>,
}

impl ConferenceReply {
    /// Parses a `<conference>` reply element.
    pub fn parse(conference: &Element) -> Result<Self, StanzaError> {
        if !conference.is("conference", ns::COLIBRI) {
            return Err(StanzaError::MissingChild("conference"));
        }
        let id = conference
            .attr("id")
            .ok_or(StanzaError::MissingAttr("conference", "id"))?
            .to_owned();

        let mut endpoints: HashMap<String, EndpointChannels> = HashMap::new();
        for content in conference
            .children()
            .filter(|c| c.is("content", ns::COLIBRI))
        {
            let name = content.attr("name").unwrap_or_default();
            for ch in content.children() {
                let endpoint = match ch.attr("endpoint") {
                    Some(endpoint) => endpoint.to_owned(),
                    None => continue,
                };
                let transport =
                    ch.get_child("transport", ns::JINGLE_ICE_UDP).cloned();
                if ch.is("channel", ns::COLIBRI) {
                    let channel = Channel {
                        id: ch
                            .attr("id")
                            .ok_or(StanzaError::MissingAttr("channel", "id"))?
                            .to_owned(),
                        transport,
                    };
                    let slot = endpoints.entry(endpoint).or_default();
                    match name {
                        "audio" => slot.audio = Some(channel),
                        "video" => slot.video = Some(channel),
                        _ => {}
                    }
                } else if ch.is("sctpconnection", ns::COLIBRI) {
                    let id = ch
                        .attr("id")
                        .unwrap_or_else(|| endpoint.as_str())
                        .to_owned();
                    endpoints.entry(endpoint).or_default().data =
                        Some(Channel { id, transport });
                }
            }
        }

        let mut bundles = HashMap::new();
        for bundle in conference
            .children()
            .filter(|c| c.is("channel-bundle", ns::COLIBRI))
        {
            if let (Some(id), Some(transport)) = (
                bundle.attr("id"),
                bundle.get_child("transport", ns::JINGLE_ICE_UDP),
            ) {
                bundles.insert(id.to_owned(), transport.clone());
            }
        }

        Ok(Self { id, endpoints, bundles })
    }

    /// Channels of the given endpoint, with bundled transports resolved
    /// from the matching `channel-bundle` block.
    pub fn channels_for(&self, endpoint: &str) -> Option<EndpointChannels> {
        let mut channels = self.endpoints.get(endpoint)?.clone();
        if let Some(bundle) = self.bundles.get(endpoint) {
            if let Some(ch) = channels.audio.as_mut() {
                ch.transport.get_or_insert_with(|| bundle.clone());
            }
            if let Some(ch) = channels.video.as_mut() {
                ch.transport.get_or_insert_with(|| bundle.clone());
            }
            if let Some(ch) = channels.data.as_mut() {
                ch.transport.get_or_insert_with(|| bundle.clone());
            }
        }
        Some(channels)
    }
}
