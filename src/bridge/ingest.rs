//! Bridge statistics ingestion from the pub/sub feed.
//!
//! Bridges publish `<stats>` items to a pub/sub node; each item carries
//! flat `<stat name value/>` children. Only numeric values survive
//! parsing; entries are stamped with the local wall clock at receipt, which
//! is what the liveness window of the selector is measured against.

use std::time::Instant;

use minidom::Element;

use crate::{bridge::BridgeStats, stanza::ns};

/// One parsed statistics publication.
#[derive(Clone, Debug)]
pub struct StatsUpdate {
    /// Publisher identity: the bridge the statistics describe.
    pub bridge: String,
    pub stats: BridgeStats,
}

/// Parses a pub/sub event message carrying bridge statistics items for
/// `node`. Returns one update per `<item>` with a resolvable publisher.
pub fn parse_stats_event(message: &Element, node: &str) -> Vec<StatsUpdate> {
    let mut updates = Vec::new();

    let event = match message.get_child("event", ns::PUBSUB_EVENT) {
        Some(event) => event,
        None => return updates,
    };
    let items = match event.get_child("items", ns::PUBSUB_EVENT) {
        Some(items) if items.attr("node") == Some(node) => items,
        _ => return updates,
    };

    for item in
        items.children().filter(|c| c.is("item", ns::PUBSUB_EVENT))
    {
        let bridge = match item.attr("publisher").or_else(|| message.attr("from"))
        {
            Some(publisher) => publisher.to_owned(),
            None => continue,
        };
        let stats = match item.get_child("stats", ns::COLIBRI) {
            Some(stats) => stats,
            None => continue,
        };

        let mut values = std::collections::HashMap::new();
        for stat in
            stats.children().filter(|c| c.is("stat", ns::COLIBRI))
        {
            if let (Some(name), Some(value)) =
                (stat.attr("name"), stat.attr("value"))
            {
                if let Ok(value) = value.parse::<f64>() {
                    values.insert(name.to_owned(), value);
                }
            }
        }

        updates.push(StatsUpdate {
            bridge,
            stats: BridgeStats {
                upload_bitrate: values
                    .get("bit_rate_upload")
                    .copied()
                    .unwrap_or_default(),
                download_bitrate: values
                    .get("bit_rate_download")
                    .copied()
                    .unwrap_or_default(),
                cpu: values.get("cpu_usage").copied().unwrap_or_default(),
                participant_count: values
                    .get("participants")
                    .copied()
                    .unwrap_or_default() as u64,
                updated_at: Instant::now(),
            },
        });
    }

    updates
}
