//! Participant record of one room occupant.

use std::collections::BTreeMap;

use jid::FullJid;

use crate::media::{MsidState, SourceMap};

/// One occupant of a focused room, keyed in the room by its in-room
/// nickname. The nickname doubles as the bridge-visible endpoint id.
#[derive(Clone, Debug)]
pub struct Participant {
    /// Real address of the occupant.
    pub jid: FullJid,

    /// In-room nickname; the endpoint id on the bridge.
    pub nick: String,

    /// Whether the joining presence advertised bridge capability.
    pub bridged: bool,

    /// Advertised sources per content name. Pre-occupied with empty lists
    /// when the session is initiated, so fan-out to this participant is
    /// well-defined before its `session-accept`.
    pub sources: SourceMap,

    /// Mute state per media stream id, rendered into presence
    /// annotations.
    pub msids: BTreeMap<String, MsidState>,
}

impl Participant {
    /// Creates a new [`Participant`] with no advertised sources.
    pub fn new(jid: FullJid, nick: String, bridged: bool) -> Self {
        Self {
            jid,
            nick,
            bridged,
            sources: SourceMap::new(),
            msids: BTreeMap::new(),
        }
    }

    /// Whether this participant has advertised any source.
    pub fn has_sources(&self) -> bool {
        self.sources.values().any(|list| !list.is_empty())
    }
}
