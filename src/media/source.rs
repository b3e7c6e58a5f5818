//! Advertised RTP source (SSRC) tracking.
//!
//! Sources travel as opaque `source` / `ssrc-group` elements in the SSMA
//! namespace. The focus never interprets them beyond the `ssrc` attribute
//! (for removal matching) and the `msid` parameter (for presence
//! annotations); everything else is relayed verbatim.

use std::collections::{BTreeMap, HashMap};

use minidom::Element;

use crate::stanza::ns;

/// Per-content advertised sources of one participant: content name
/// (`audio` / `video`) to the list of `source` and `ssrc-group` elements.
pub type SourceMap = HashMap<String, Vec<Element>>;

/// Mute state of one media stream, as shown in presence annotations.
/// Values are `"true"` (sending) or `"muted"`; `None` means the stream has
/// no such medium.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MsidState {
    pub audio: Option<String>,
    pub video: Option<String>,
}

/// Collects clones of all `source` and `ssrc-group` elements of an RTP
/// description.
pub fn collect_sources(description: &Element) -> Vec<Element> {
    description
        .children()
        .filter(|c| {
            c.is("source", ns::JINGLE_SSMA)
                || c.is("ssrc-group", ns::JINGLE_SSMA)
        })
        .cloned()
        .collect()
}

/// Returns the `ssrc` attribute of a `source` element.
fn ssrc_of(source: &Element) -> Option<&str> {
    source.attr("ssrc")
}

/// Returns the stream id (`msid` parameter, first token) advertised by a
/// `source` element.
pub fn msid_of(source: &Element) -> Option<String> {
    source
        .children()
        .filter(|c| c.is("parameter", ns::JINGLE_SSMA))
        .find(|p| p.attr("name") == Some("msid"))
        .and_then(|p| p.attr("value"))
        .and_then(|v| v.split_whitespace().next().map(str::to_owned))
}

/// Removes from `existing` every `source` whose ssrc appears in `removal`,
/// and every `ssrc-group` that references a removed ssrc.
pub fn remove_matching(existing: &mut Vec<Element>, removal: &[Element]) {
    let removed: Vec<&str> = removal
        .iter()
        .filter(|e| e.is("source", ns::JINGLE_SSMA))
        .filter_map(ssrc_of)
        .collect();

    existing.retain(|el| {
        if el.is("source", ns::JINGLE_SSMA) {
            ssrc_of(el).map_or(true, |s| !removed.contains(&s))
        } else if el.is("ssrc-group", ns::JINGLE_SSMA) {
            !el.children()
                .filter(|c| c.is("source", ns::JINGLE_SSMA))
                .filter_map(ssrc_of)
                .any(|s| removed.contains(&s))
        } else {
            true
        }
    });
}

/// Rebuilds the msid map from the current sources, preserving mute flags of
/// surviving `(msid, medium)` pairs from `previous`.
pub fn derive_msids(
    sources: &SourceMap,
    previous: &BTreeMap<String, MsidState>,
) -> BTreeMap<String, MsidState> {
    let mut msids = BTreeMap::<String, MsidState>::new();
    for (content, elements) in sources {
        for el in elements.iter().filter(|e| e.is("source", ns::JINGLE_SSMA))
        {
            let msid = match msid_of(el) {
                Some(msid) => msid,
                None => continue,
            };
            let prior = previous.get(&msid);
            let entry = msids.entry(msid).or_default();
            match content.as_str() {
                "audio" => {
                    entry.audio = prior
                        .and_then(|p| p.audio.clone())
                        .or_else(|| Some("true".to_owned()));
                }
                "video" => {
                    entry.video = prior
                        .and_then(|p| p.video.clone())
                        .or_else(|| Some("true".to_owned()));
                }
                _ => {}
            }
        }
    }
    msids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(ssrc: &str, msid: Option<&str>) -> Element {
        let mut builder =
            Element::builder("source", ns::JINGLE_SSMA).attr("ssrc", ssrc);
        if let Some(msid) = msid {
            builder = builder.append(
                Element::builder("parameter", ns::JINGLE_SSMA)
                    .attr("name", "msid")
                    .attr("value", format!("{} track0", msid))
                    .build(),
            );
        }
        builder.build()
    }

    fn fid_group(ssrcs: &[&str]) -> Element {
        let mut builder = Element::builder("ssrc-group", ns::JINGLE_SSMA)
            .attr("semantics", "FID");
        for ssrc in ssrcs {
            builder = builder.append(source(ssrc, None));
        }
        builder.build()
    }

    fn description(children: Vec<Element>) -> Element {
        let mut builder = Element::builder("description", ns::JINGLE_RTP)
            .attr("media", "video");
        for child in children {
            builder = builder.append(child);
        }
        builder.build()
    }

    #[test]
    fn collects_sources_and_groups() {
        let desc = description(vec![
            source("1001", Some("m1")),
            fid_group(&["1001", "1002"]),
        ]);
        assert_eq!(collect_sources(&desc).len(), 2);
    }

    #[test]
    fn msid_is_first_token() {
        let el = source("1001", Some("m1"));
        assert_eq!(msid_of(&el), Some("m1".to_owned()));
    }

    #[test]
    fn removal_drops_sources_and_referencing_groups() {
        let mut existing = vec![
            source("1001", Some("m1")),
            source("1002", None),
            fid_group(&["1001", "1002"]),
            source("2001", Some("m2")),
        ];
        remove_matching(&mut existing, &[source("1001", None)]);
        assert_eq!(existing.len(), 2);
        assert_eq!(ssrc_of(&existing[0]), Some("1002"));
        assert_eq!(ssrc_of(&existing[1]), Some("2001"));
    }

    #[test]
    fn derive_preserves_mute_flags() {
        let sources: SourceMap = hashmap! {
            "audio".to_owned() => vec![source("1", Some("m1"))],
            "video".to_owned() => vec![source("2", Some("m1"))],
        };

        let mut previous = BTreeMap::new();
        previous.insert(
            "m1".to_owned(),
            MsidState {
                audio: Some("muted".to_owned()),
                video: Some("true".to_owned()),
            },
        );

        let msids = derive_msids(&sources, &previous);
        let m1 = &msids["m1"];
        assert_eq!(m1.audio.as_deref(), Some("muted"));
        assert_eq!(m1.video.as_deref(), Some("true"));
    }

    #[test]
    fn derive_defaults_to_unmuted() {
        let sources: SourceMap = hashmap! {
            "audio".to_owned() => vec![source("1", Some("m9"))],
        };
        let msids = derive_msids(&sources, &BTreeMap::new());
        assert_eq!(msids["m9"].audio.as_deref(), Some("true"));
        assert_eq!(msids["m9"].video, None);
    }
}
