//! Per-room state of the focus.

use std::collections::HashMap;

use jid::BareJid;

use crate::{
    media::SourceMap,
    signalling::participant::Participant,
    stanza::colibri::EndpointChannels,
};

/// Allocation state of the room's bridge conference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConferenceState {
    /// No conference has been requested yet.
    Absent,
    /// A create request is in flight; joins are queued until the reply.
    Pending,
    /// The bridge acknowledged creation under this conference id.
    Assigned(String),
}

/// An active Jingle session of one participant.
#[derive(Clone, Debug)]
pub struct Session {
    /// Session id, freshly generated per session.
    pub sid: String,
    /// Bridge channels backing this session. Always carries audio and
    /// video.
    pub channels: EndpointChannels,
    /// Whether a `session-accept` was already applied.
    pub accepted: bool,
}

/// Per-room record of the focus: conference allocation state, occupants,
/// active sessions and the pending-join queue.
#[derive(Debug)]
pub struct Room {
    /// Room address.
    pub jid: BareJid,

    /// Conference allocation state on the bridge.
    pub conference: ConferenceState,

    /// Bridge selected at first allocation, fixed until full destruction.
    pub bridge: Option<String>,

    /// Active Jingle sessions, keyed by nickname.
    pub sessions: HashMap<String, Session>,

    /// Nicknames waiting for channels because creation is in flight.
    pub pending_joins: Vec<String>,

    participants: HashMap<String, Participant>,
    join_order: Vec<String>,
}

impl Room {
    /// Creates an empty [`Room`].
    pub fn new(jid: BareJid) -> Self {
        Self {
            jid,
            conference: ConferenceState::Absent,
            bridge: None,
            sessions: HashMap::new(),
            pending_joins: Vec::new(),
            participants: HashMap::new(),
            join_order: Vec::new(),
        }
    }

    /// Bridge-assigned conference id, when assigned.
    pub fn conference_id(&self) -> Option<&str> {
        match &self.conference {
            ConferenceState::Assigned(id) => Some(id),
            _ => None,
        }
    }

    /// Inserts (or re-materializes) a participant, keeping join order.
    pub fn insert_participant(&mut self, participant: Participant) {
        let nick = participant.nick.clone();
        if self.participants.insert(nick.clone(), participant).is_none() {
            self.join_order.push(nick);
        }
    }

    /// Removes a participant with its session and queue slot.
    pub fn remove_participant(&mut self, nick: &str) -> Option<Participant> {
        self.join_order.retain(|n| n != nick);
        self.pending_joins.retain(|n| n != nick);
        self.sessions.remove(nick);
        self.participants.remove(nick)
    }

    /// Looks up a participant by nickname.
    pub fn participant(&self, nick: &str) -> Option<&Participant> {
        self.participants.get(nick)
    }

    /// Looks up a participant by nickname, mutably.
    pub fn participant_mut(&mut self, nick: &str) -> Option<&mut Participant> {
        self.participants.get_mut(nick)
    }

    /// Iterates participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.join_order
            .iter()
            .filter_map(move |nick| self.participants.get(nick))
    }

    /// Number of bridge-capable participants.
    pub fn capable_count(&self) -> usize {
        self.participants.values().filter(|p| p.bridged).count()
    }

    /// Whether the room is empty of participants.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Capable participants without an active session, in join order.
    pub fn capable_without_session(&self) -> Vec<String> {
        self.participants()
            .filter(|p| p.bridged && !self.sessions.contains_key(&p.nick))
            .map(|p| p.nick.clone())
            .collect()
    }

    /// Session members in join order. This is the stable fan-out order of
    /// a controller turn.
    pub fn session_members(&self) -> Vec<String> {
        self.join_order
            .iter()
            .filter(|nick| self.sessions.contains_key(*nick))
            .cloned()
            .collect()
    }

    /// Cumulative advertised sources of every session member except
    /// `excluded`, merged per content name.
    pub fn sources_excluding(&self, excluded: &str) -> SourceMap {
        let mut merged = SourceMap::new();
        for nick in self.session_members() {
            if nick == excluded {
                continue;
            }
            if let Some(participant) = self.participants.get(&nick) {
                for (content, sources) in &participant.sources {
                    merged
                        .entry(content.clone())
                        .or_default()
                        .extend(sources.iter().cloned());
                }
            }
        }
        merged
    }
}
