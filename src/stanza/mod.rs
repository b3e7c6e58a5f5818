//! Pure stanza builders and parsers.
//!
//! Everything in this module is deterministic and side-effect free: typed
//! values in, [`Element`]s out. The controller builds first and mutates room
//! state only after every build succeeded, so a failed turn leaves no
//! half-applied state behind.

pub mod colibri;
pub mod jingle;
pub mod ns;

use derive_more::Display;
use failure::Fail;
use minidom::Element;

/// Errors of stanza parsing.
#[derive(Debug, Display, Fail)]
pub enum StanzaError {
    /// A required attribute is absent.
    #[display(fmt = "Missing attribute '{}' on <{}>", _1, _0)]
    MissingAttr(&'static str, &'static str),

    /// A required child element is absent.
    #[display(fmt = "Missing <{}> child", _0)]
    MissingChild(&'static str),

    /// The stanza does not parse as what it claims to be.
    #[display(fmt = "Malformed stanza: {}", _0)]
    Malformed(String),
}

/// Builds an `<iq type='set'>` carrying the given payload.
pub fn iq_set(to: &str, from: &str, id: &str, payload: Element) -> Element {
    Element::builder("iq", ns::CLIENT)
        .attr("type", "set")
        .attr("to", to)
        .attr("from", from)
        .attr("id", id)
        .append(payload)
        .build()
}

/// Builds an empty `<iq type='result'>` acknowledging `request`.
pub fn iq_result(request: &Element, from: &str) -> Element {
    Element::builder("iq", ns::CLIENT)
        .attr("type", "result")
        .attr("to", request.attr("from"))
        .attr("from", from)
        .attr("id", request.attr("id"))
        .build()
}

/// Builds an error reply to `stanza` with the given error type and defined
/// condition, addressed back to its sender.
pub fn error_reply(
    stanza: &Element,
    error_type: &str,
    condition: &str,
) -> Element {
    Element::builder(stanza.name(), ns::CLIENT)
        .attr("type", "error")
        .attr("to", stanza.attr("from"))
        .attr("from", stanza.attr("to"))
        .attr("id", stanza.attr("id"))
        .append(
            Element::builder("error", ns::CLIENT)
                .attr("type", error_type)
                .append(Element::builder(condition, ns::STANZAS).build())
                .build(),
        )
        .build()
}

/// Builds the pub/sub subscription request for the bridge statistics node.
pub fn pubsub_subscribe(
    service: &str,
    node: &str,
    subscriber: &str,
    id: &str,
) -> Element {
    let mut subscribe =
        Element::builder("subscribe", ns::PUBSUB).attr("node", node);
    if !subscriber.is_empty() {
        subscribe = subscribe.attr("jid", subscriber);
    }
    Element::builder("iq", ns::CLIENT)
        .attr("type", "set")
        .attr("to", service)
        .attr("id", id)
        .append(
            Element::builder("pubsub", ns::PUBSUB)
                .append(subscribe.build())
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iq_result_mirrors_request() {
        let request = Element::builder("iq", ns::CLIENT)
            .attr("type", "set")
            .attr("from", "romeo@example.com/garden")
            .attr("to", "room@muc.example.com/focus")
            .attr("id", "ab12")
            .build();
        let result = iq_result(&request, "room@muc.example.com/focus");
        assert_eq!(result.attr("type"), Some("result"));
        assert_eq!(result.attr("to"), Some("romeo@example.com/garden"));
        assert_eq!(result.attr("id"), Some("ab12"));
    }

    #[test]
    fn error_reply_carries_condition() {
        let presence = Element::builder("presence", ns::CLIENT)
            .attr("from", "romeo@example.com/garden")
            .attr("to", "room@muc.example.com/nick")
            .build();
        let reply = error_reply(&presence, "modify", "resource-constraint");
        assert_eq!(reply.name(), "presence");
        assert_eq!(reply.attr("type"), Some("error"));
        let error = reply.get_child("error", ns::CLIENT).unwrap();
        assert_eq!(error.attr("type"), Some("modify"));
        assert!(error.get_child("resource-constraint", ns::STANZAS).is_some());
    }

    #[test]
    fn pubsub_subscribe_shape() {
        let iq = pubsub_subscribe(
            "pubsub.example.com",
            "videobridge",
            "focus.example.com",
            "sub1",
        );
        let pubsub = iq.get_child("pubsub", ns::PUBSUB).unwrap();
        let subscribe = pubsub.get_child("subscribe", ns::PUBSUB).unwrap();
        assert_eq!(subscribe.attr("node"), Some("videobridge"));
        assert_eq!(subscribe.attr("jid"), Some("focus.example.com"));
    }
}
