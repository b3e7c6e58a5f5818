//! Correlation of outgoing COLIBRI requests with their replies.

use std::collections::HashMap;

use jid::BareJid;

/// What an outstanding COLIBRI request was sent for.
#[derive(Clone, Debug)]
pub struct CorrelationEntry {
    /// Room the request allocates channels in.
    pub room: BareJid,
    /// Endpoints whose channels the request allocates, in the order they
    /// were put into the request.
    pub endpoints: Vec<String>,
}

/// In-memory table of outstanding COLIBRI requests, keyed by request id.
///
/// Entries are installed at send time and removed on the first matching
/// reply or on room destruction; replies without an entry are stale and
/// must be ignored.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    entries: HashMap<String, CorrelationEntry>,
}

impl CorrelationTable {
    /// Creates an empty [`CorrelationTable`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an entry for an outgoing request.
    pub fn insert(
        &mut self,
        request: String,
        room: BareJid,
        endpoints: Vec<String>,
    ) {
        self.entries
            .insert(request, CorrelationEntry { room, endpoints });
    }

    /// Whether a request is still outstanding.
    pub fn contains(&self, request: &str) -> bool {
        self.entries.contains_key(request)
    }

    /// Peeks the entry of an outstanding request.
    pub fn get(&self, request: &str) -> Option<&CorrelationEntry> {
        self.entries.get(request)
    }

    /// Removes and returns the entry of a request, if still outstanding.
    pub fn take(&mut self, request: &str) -> Option<CorrelationEntry> {
        self.entries.remove(request)
    }

    /// Drops every outstanding entry of `room`.
    pub fn drop_room(&mut self, room: &BareJid) {
        self.entries.retain(|_, entry| entry.room != *room);
    }
}
