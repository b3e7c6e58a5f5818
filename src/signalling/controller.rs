//! The focus state machine.
//!
//! [`FocusController`] consumes room events and inbound stanzas, mutates
//! per-room state and enqueues outbound stanzas on the [`StanzaSender`].
//! Every handler is one logical turn: it runs to completion, builds every
//! outbound stanza before mutating state, and never raises to the host.
//! Timer-driven work is returned as [`Followup`]s for the actor layer to
//! schedule.

use std::{collections::HashMap, fmt, rc::Rc, sync::Arc, time::Duration};

use jid::{BareJid, FullJid};
use minidom::Element;

use crate::{
    bridge::{parse_stats_event, BridgeSelector},
    conf::Conf,
    log::prelude::*,
    media::{source, SourceMap},
    signalling::{
        correlation::CorrelationTable,
        participant::Participant,
        presence,
        room::{ConferenceState, Room, Session},
        token, FocusError,
    },
    stanza::{
        self, colibri,
        colibri::{ConferenceReply, EndpointChannels},
        jingle,
        jingle::{Action, JinglePayload, Offer},
        ns,
    },
    utils::generate_id,
};

/// Resource under which the focus occupies every room.
const FOCUS_NICK: &str = "focus";

/// Abstraction over the host connection outbound stanzas are enqueued on.
///
/// Sends are non-blocking enqueues; delivery is the host's concern.
pub trait StanzaSender: fmt::Debug {
    /// Enqueues a stanza for delivery.
    fn send(&self, stanza: Element);
}

/// Deferred work a turn asks the event loop to schedule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Followup {
    /// Re-check an outstanding allocation once the pending timeout
    /// elapsed.
    PendingCheck { room: BareJid, request: String, after: Duration },
    /// Re-check the teardown precondition once the linger interval
    /// elapsed.
    Teardown { room: BareJid, after: Duration },
}

/// Result of one controller turn.
#[derive(Debug, Default)]
pub struct Turn {
    /// Whether the event was consumed by the focus.
    pub consumed: bool,
    /// Work the event loop should schedule.
    pub followups: Vec<Followup>,
}

impl Turn {
    fn consumed() -> Self {
        Self { consumed: true, followups: Vec::new() }
    }

    fn ignored() -> Self {
        Self::default()
    }

    fn with(followups: Vec<Followup>) -> Self {
        Self { consumed: true, followups }
    }
}

/// The per-process conference focus: the room registry plus everything
/// needed to drive both protocol legs.
#[derive(Debug)]
pub struct FocusController {
    conf: Arc<Conf>,
    sender: Rc<dyn StanzaSender>,
    rooms: HashMap<BareJid, Room>,
    correlations: CorrelationTable,
    selector: BridgeSelector,
}

impl FocusController {
    /// Creates a new [`FocusController`] enqueueing outbound stanzas on
    /// `sender`.
    pub fn new(conf: Arc<Conf>, sender: Rc<dyn StanzaSender>) -> Self {
        Self {
            conf,
            sender,
            rooms: HashMap::new(),
            correlations: CorrelationTable::new(),
            selector: BridgeSelector::new(),
        }
    }

    /// Whether a room is currently tracked.
    pub fn is_tracked(&self, room: &BareJid) -> bool {
        self.rooms.contains_key(room)
    }

    /// Focus occupant address inside `room`.
    fn focus_occupant(&self, room: &BareJid) -> String {
        format!("{}/{}", room, FOCUS_NICK)
    }

    /// Handles a join about to happen: rejects duplicate sessions from the
    /// same real address and announces the room media mode.
    pub fn on_pre_join(
        &mut self,
        room_jid: &BareJid,
        presence: &Element,
    ) -> Turn {
        let from = match presence.attr("from") {
            Some(from) => from.to_owned(),
            None => return Turn::ignored(),
        };

        if let Some(room) = self.rooms.get(room_jid) {
            if let Ok(joiner) = from.parse::<FullJid>() {
                let bare = BareJid::from(joiner);
                let duplicate = room.session_members().iter().any(|nick| {
                    room.participant(nick).map_or(false, |p| {
                        BareJid::from(p.jid.clone()) == bare
                    })
                });
                if duplicate {
                    debug!(
                        "Rejecting second session of {} in room {}",
                        from, room_jid,
                    );
                    self.sender.send(stanza::error_reply(
                        presence,
                        "modify",
                        "resource-constraint",
                    ));
                    return Turn::consumed();
                }
            }
        }

        let capable =
            self.rooms.get(room_jid).map_or(0, Room::capable_count);
        let would = capable + usize::from(presence::is_bridged(presence));
        let mode = if would >= self.conf.focus.min_participants {
            "relay"
        } else {
            "p2p"
        };
        self.sender.send(presence::mode_message(
            &room_jid.to_string(),
            true,
            mode,
        ));
        self.sender.send(presence::mode_message(&from, false, mode));
        Turn::consumed()
    }

    /// Handles a materialized join: records the participant and, once the
    /// capable threshold is reached, drives channel allocation.
    pub fn on_joined(
        &mut self,
        room_jid: &BareJid,
        nick: &str,
        jid: &FullJid,
        presence: &Element,
    ) -> Turn {
        let bridged = presence::is_bridged(presence);
        let min = self.conf.focus.min_participants;

        let room = self
            .rooms
            .entry(room_jid.clone())
            .or_insert_with(|| Room::new(room_jid.clone()));
        room.insert_participant(Participant::new(
            jid.clone(),
            nick.to_owned(),
            bridged,
        ));

        if !bridged || room.capable_count() < min {
            return Turn::consumed();
        }

        if room.conference == ConferenceState::Pending {
            if !room.pending_joins.iter().any(|n| n == nick) {
                room.pending_joins.push(nick.to_owned());
            }
            debug!(
                "Queued join of {} in room {}: creation in flight",
                nick, room_jid,
            );
            return Turn::consumed();
        }

        Turn::with(self.allocate(room_jid))
    }

    /// Handles an occupant leaving the room.
    pub fn on_left(&mut self, room_jid: &BareJid, nick: &str) -> Turn {
        self.handle_leave(room_jid, nick)
    }

    /// Handles a reply of the bridge to an outstanding COLIBRI request.
    pub fn on_colibri_reply(&mut self, iq: &Element) -> Turn {
        let request = match iq.attr("id") {
            Some(id) if self.correlations.contains(id) => id.to_owned(),
            _ => return Turn::ignored(),
        };

        match iq.attr("type") {
            Some("result") => {}
            Some("error") => {
                // Tolerated: the pending check will fail the bridge over.
                warn!("Bridge errored on request {}", request);
                if let Some(from) = iq.attr("from") {
                    self.selector.evict(from);
                }
                return Turn::consumed();
            }
            _ => return Turn::ignored(),
        }

        let entry_room = match self.correlations.get(&request) {
            Some(entry) => entry.room.clone(),
            None => return Turn::ignored(),
        };

        // The reply must come back from the room's selected bridge,
        // addressed to the reversible room token.
        if let Some(room) = self.rooms.get(&entry_room) {
            if let (Some(bridge), Some(from)) =
                (room.bridge.as_deref(), iq.attr("from"))
            {
                if bridge != from {
                    warn!(
                        "Dropping reply for {} from foreign bridge {}",
                        entry_room, from,
                    );
                    return Turn::consumed();
                }
            }
        }
        if let Some(to) = iq.attr("to") {
            match token::decode(to) {
                Ok(decoded) if decoded == entry_room => {}
                _ => {
                    warn!("Dropping reply with foreign token {}", to);
                    return Turn::consumed();
                }
            }
        }

        let reply = match iq
            .get_child("conference", ns::COLIBRI)
            .ok_or(stanza::StanzaError::MissingChild("conference"))
            .and_then(ConferenceReply::parse)
            .map_err(FocusError::from)
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Unusable bridge reply for {}: {}", entry_room, e);
                return Turn::consumed();
            }
        };

        let entry = match self.correlations.take(&request) {
            Some(entry) => entry,
            None => return Turn::ignored(),
        };
        let focus = self.focus_occupant(&entry.room);
        let media = self.conf.media;
        let room = match self.rooms.get_mut(&entry.room) {
            Some(room) => room,
            // Room destroyed while the request was in flight.
            None => return Turn::consumed(),
        };

        room.conference = ConferenceState::Assigned(reply.id.clone());
        info!(
            "Conference {} assigned to room {} on bridge {:?}",
            reply.id, entry.room, room.bridge,
        );

        let mut installs = Vec::new();
        for nick in &entry.endpoints {
            let participant = match room.participant(nick) {
                Some(participant) => participant,
                // Left while the request was in flight.
                None => continue,
            };
            if room.sessions.contains_key(nick) {
                continue;
            }
            let channels = match reply.channels_for(nick) {
                Some(channels) if channels.is_complete() => channels,
                _ => {
                    warn!(
                        "Bridge allocated no usable channels for {} in {}",
                        nick, entry.room,
                    );
                    continue;
                }
            };
            let sid = generate_id(16);
            let offer = jingle::session_initiate(&Offer {
                sid: &sid,
                initiator: &focus,
                media,
                channels: &channels,
                remote_sources: &room.sources_excluding(nick),
            });
            let iq_out = stanza::iq_set(
                &participant.jid.to_string(),
                &focus,
                &generate_id(16),
                offer,
            );
            installs.push((
                nick.clone(),
                Session { sid, channels, accepted: false },
                iq_out,
            ));
        }

        for (nick, session, iq_out) in installs {
            room.sessions.insert(nick.clone(), session);
            let participant = match room.participant_mut(&nick) {
                Some(participant) => participant,
                None => continue,
            };
            participant.sources.entry("audio".to_owned()).or_default();
            participant.sources.entry("video".to_owned()).or_default();
            self.sender.send(iq_out);
        }

        let drained = !room.pending_joins.is_empty();
        room.pending_joins.clear();
        let followups =
            if drained { self.allocate(&entry.room) } else { Vec::new() };
        Turn::with(followups)
    }

    /// Handles a Jingle IQ of the occupant `nick`.
    pub fn on_jingle(
        &mut self,
        room_jid: &BareJid,
        nick: &str,
        iq: &Element,
    ) -> Turn {
        if !self.rooms.contains_key(room_jid) {
            return Turn::ignored();
        }
        let payload = match jingle::parse(iq) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Turn::ignored(),
            Err(e) => {
                warn!("Dropping malformed jingle from {}: {}", nick, e);
                return Turn::ignored();
            }
        };
        let focus = self.focus_occupant(room_jid);

        match payload.action {
            Action::SessionAccept | Action::SourceAdd
            | Action::SourceRemove => {
                self.handle_sources(room_jid, nick, &payload, iq)
            }
            Action::SessionInfo => {
                self.handle_session_info(room_jid, nick, &payload, iq)
            }
            Action::SessionTerminate => {
                self.sender.send(stanza::iq_result(iq, &focus));
                self.handle_leave(room_jid, nick)
            }
            Action::TransportInfo => {
                self.sender.send(stanza::iq_result(iq, &focus));
                Turn::consumed()
            }
            Action::SessionInitiate => {
                debug!("Ignoring client-initiated session from {}", nick);
                Turn::consumed()
            }
        }
    }

    /// Handles a statistics pub/sub message.
    pub fn on_stats(&mut self, message: &Element) -> Turn {
        let service = self.conf.pubsub.service.clone();
        if service.is_empty()
            || message.attr("from") != Some(service.as_str())
        {
            return Turn::ignored();
        }
        if message.get_child("event", ns::PUBSUB_EVENT).is_none() {
            return Turn::ignored();
        }
        for update in parse_stats_event(message, &self.conf.pubsub.node) {
            trace!("Bridge stats from {}", update.bridge);
            self.selector.observe(update.bridge, update.stats);
        }
        Turn::consumed()
    }

    /// Answers a service-discovery info query with the focus feature set.
    pub fn on_disco_info(&mut self, iq: &Element) -> Turn {
        if iq.attr("type") != Some("get")
            || iq.get_child("query", ns::DISCO_INFO).is_none()
        {
            return Turn::ignored();
        }
        self.sender.send(
            Element::builder("iq", ns::CLIENT)
                .attr("type", "result")
                .attr("to", iq.attr("from"))
                .attr("from", iq.attr("to"))
                .attr("id", iq.attr("id"))
                .append(presence::disco_info())
                .build(),
        );
        Turn::consumed()
    }

    /// Pre-change hook: rewrites an outgoing presence so its mediastream
    /// annotations always reflect the authoritative msid map.
    pub fn filter_presence(
        &self,
        room_jid: &BareJid,
        nick: &str,
        presence: &Element,
    ) -> Element {
        if presence.attr("type") == Some("unavailable") {
            return presence.clone();
        }
        match self
            .rooms
            .get(room_jid)
            .and_then(|room| room.participant(nick))
        {
            Some(participant) => {
                presence::stamp_mediastreams(presence, &participant.msids)
            }
            None => presence::strip_mediastreams(presence),
        }
    }

    /// Linger timer fired: re-checks the teardown precondition and
    /// destroys the room when it still holds.
    pub fn on_destroy_check(&mut self, room_jid: &BareJid) -> Turn {
        self.destroy_room(room_jid, true);
        Turn::consumed()
    }

    /// Pending timer fired: when the bridge never answered, resets the
    /// room to unallocated and reissues allocation on another bridge.
    pub fn on_pending_check(
        &mut self,
        room_jid: &BareJid,
        request: &str,
    ) -> Turn {
        if self.correlations.take(request).is_none() {
            // Answered in time.
            return Turn::consumed();
        }
        let min = self.conf.focus.min_participants;
        let room = match self.rooms.get_mut(room_jid) {
            Some(room) => room,
            None => return Turn::consumed(),
        };
        match room.conference {
            ConferenceState::Pending => {
                if let Some(bridge) = room.bridge.take() {
                    warn!(
                        "Bridge {} timed out creating a conference for {}",
                        bridge, room_jid,
                    );
                    self.selector.evict(&bridge);
                }
                room.conference = ConferenceState::Absent;
                room.pending_joins.clear();
                let enough = room.capable_count() >= min;
                let followups =
                    if enough { self.allocate(room_jid) } else { Vec::new() };
                Turn::with(followups)
            }
            _ => {
                // An allocation update timed out mid-conference; the
                // assigned bridge is kept and the request is abandoned.
                warn!(
                    "Bridge update for room {} timed out; dropping request",
                    room_jid,
                );
                Turn::consumed()
            }
        }
    }

    /// Issues the pub/sub subscription for bridge statistics.
    pub fn subscribe_stats(&self) {
        let pubsub = &self.conf.pubsub;
        if pubsub.service.is_empty() {
            return;
        }
        info!(
            "Subscribing to bridge stats on {} node {}",
            pubsub.service, pubsub.node,
        );
        self.sender.send(stanza::pubsub_subscribe(
            &pubsub.service,
            &pubsub.node,
            &self.conf.focus.address,
            &generate_id(16),
        ));
    }

    /// Tears down every room unconditionally, expiring all bridge
    /// channels. Used on graceful shutdown.
    pub fn shutdown(&mut self) {
        let rooms: Vec<BareJid> = self.rooms.keys().cloned().collect();
        for room in rooms {
            self.destroy_room(&room, false);
        }
    }

    /// Requests channels for every capable endpoint without a session.
    fn allocate(&mut self, room_jid: &BareJid) -> Vec<Followup> {
        let conf = Arc::clone(&self.conf);
        let room = match self.rooms.get_mut(room_jid) {
            Some(room) => room,
            None => return Vec::new(),
        };
        let endpoints = room.capable_without_session();
        if endpoints.is_empty() {
            return Vec::new();
        }

        let bridge = match &room.bridge {
            Some(bridge) => bridge.clone(),
            None => {
                let bridge = self.selector.select(
                    conf.bridge.liveness,
                    &conf.bridge.default_bridge,
                );
                room.bridge = Some(bridge.clone());
                bridge
            }
        };

        let request = generate_id(16);
        let payload = colibri::conference_request(
            room.conference_id(),
            &endpoints,
            conf.media,
        );
        if room.conference == ConferenceState::Absent {
            room.conference = ConferenceState::Pending;
        }
        info!(
            "Requesting channels on {} for {:?} in room {}",
            bridge, endpoints, room_jid,
        );
        self.correlations.insert(
            request.clone(),
            room_jid.clone(),
            endpoints,
        );
        self.sender.send(stanza::iq_set(
            &bridge,
            &token::encode(room_jid),
            &request,
            payload,
        ));

        vec![Followup::PendingCheck {
            room: room_jid.clone(),
            request,
            after: conf.focus.pending_timeout,
        }]
    }

    /// Applies `session-accept` / `source-add` / `source-remove` of
    /// `nick`: mutate sources, republish presence, update the bridge and
    /// fan the delta out to every other session member.
    fn handle_sources(
        &mut self,
        room_jid: &BareJid,
        nick: &str,
        payload: &JinglePayload,
        iq: &Element,
    ) -> Turn {
        let focus = self.focus_occupant(room_jid);
        let bridge_token = token::encode(room_jid);
        let room = match self.rooms.get_mut(room_jid) {
            Some(room) => room,
            None => return Turn::ignored(),
        };
        let session = match room.sessions.get(nick) {
            Some(session) => session.clone(),
            None => {
                debug!("Jingle from {} without a session", nick);
                return Turn::ignored();
            }
        };
        if payload.action == Action::SessionAccept && session.accepted {
            // Duplicate accept: acknowledged and otherwise ignored.
            self.sender.send(stanza::iq_result(iq, &focus));
            return Turn::consumed();
        }
        let participant = match room.participant(nick) {
            Some(participant) => participant,
            None => return Turn::ignored(),
        };

        let mut delta = SourceMap::new();
        for content in &payload.contents {
            if let Some(description) = &content.description {
                delta.insert(
                    content.name.clone(),
                    source::collect_sources(description),
                );
            }
        }

        let mut new_sources = participant.sources.clone();
        let mut fan_out = true;
        match payload.action {
            Action::SessionAccept => {
                new_sources = delta.clone();
                new_sources.entry("audio".to_owned()).or_default();
                new_sources.entry("video".to_owned()).or_default();
            }
            Action::SourceAdd => {
                for (content, sources) in &delta {
                    new_sources
                        .entry(content.clone())
                        .or_default()
                        .extend(sources.iter().cloned());
                }
            }
            Action::SourceRemove => {
                let mut removed_any = false;
                for (content, removal) in &delta {
                    if let Some(existing) = new_sources.get_mut(content) {
                        let before = existing.len();
                        source::remove_matching(existing, removal);
                        removed_any |= existing.len() != before;
                    }
                }
                fan_out = removed_any;
            }
            _ => return Turn::ignored(),
        }
        let msids = source::derive_msids(&new_sources, &participant.msids);

        let presence_out =
            presence::occupant_presence(room_jid, nick, &msids);
        let bridge_update = match (&room.bridge, room.conference_id()) {
            (Some(bridge), Some(conference_id)) => Some(stanza::iq_set(
                bridge,
                &bridge_token,
                &generate_id(16),
                colibri::update_request(
                    conference_id,
                    nick,
                    &payload.contents,
                    &session.channels,
                ),
            )),
            _ => None,
        };

        let fanout_action = match payload.action {
            Action::SourceRemove => Action::SourceRemove,
            _ => Action::SourceAdd,
        };
        let mut fanouts = Vec::new();
        if fan_out && delta.values().any(|list| !list.is_empty()) {
            for other in room.session_members() {
                if other == nick {
                    continue;
                }
                let sid = room.sessions[&other].sid.clone();
                if let Some(peer) = room.participant(&other) {
                    fanouts.push(stanza::iq_set(
                        &peer.jid.to_string(),
                        &focus,
                        &generate_id(16),
                        jingle::source_delta(
                            fanout_action,
                            &sid,
                            &focus,
                            &delta,
                        ),
                    ));
                }
            }
        }
        let ack = stanza::iq_result(iq, &focus);

        // All builds succeeded; commit and send.
        if let Some(participant) = room.participant_mut(nick) {
            participant.sources = new_sources;
            participant.msids = msids;
        }
        if payload.action == Action::SessionAccept {
            if let Some(session) = room.sessions.get_mut(nick) {
                session.accepted = true;
            }
        }

        self.sender.send(presence_out);
        if let Some(update) = bridge_update {
            self.sender.send(update);
        }
        for fanout in fanouts {
            self.sender.send(fanout);
        }
        self.sender.send(ack);
        Turn::consumed()
    }

    /// Applies a `session-info` mute / unmute and republishes presence.
    fn handle_session_info(
        &mut self,
        room_jid: &BareJid,
        nick: &str,
        payload: &JinglePayload,
        iq: &Element,
    ) -> Turn {
        let focus = self.focus_occupant(room_jid);
        let room = match self.rooms.get_mut(room_jid) {
            Some(room) => room,
            None => return Turn::ignored(),
        };
        let mute = match jingle::parse_mute(&payload.jingle) {
            Some(mute) => mute,
            None => {
                self.sender.send(stanza::iq_result(iq, &focus));
                return Turn::consumed();
            }
        };
        let participant = match room.participant_mut(nick) {
            Some(participant) => participant,
            None => return Turn::ignored(),
        };

        let value = if mute.muted { "muted" } else { "true" };
        for (msid, state) in participant.msids.iter_mut() {
            if !mute.msids.is_empty() && !mute.msids.contains(msid) {
                continue;
            }
            let scope = mute.content.as_deref();
            if scope.map_or(true, |c| c == "audio") && state.audio.is_some()
            {
                state.audio = Some(value.to_owned());
            }
            if scope.map_or(true, |c| c == "video") && state.video.is_some()
            {
                state.video = Some(value.to_owned());
            }
        }

        let presence_out =
            presence::occupant_presence(room_jid, nick, &participant.msids);
        self.sender.send(presence_out);
        self.sender.send(stanza::iq_result(iq, &focus));
        Turn::consumed()
    }

    /// Removes `nick` from the room: drop the session, retract its
    /// sources from peers, expire its channels and run the teardown check.
    fn handle_leave(&mut self, room_jid: &BareJid, nick: &str) -> Turn {
        let focus = self.focus_occupant(room_jid);
        let bridge_token = token::encode(room_jid);
        let min = self.conf.focus.min_participants;
        let linger = self.conf.focus.linger_time;

        let room = match self.rooms.get_mut(room_jid) {
            Some(room) => room,
            None => return Turn::ignored(),
        };
        if room.participant(nick).is_none() {
            return Turn::ignored();
        }

        let mut outs = Vec::new();
        if let Some(session) = room.sessions.get(nick).cloned() {
            let delta = room
                .participant(nick)
                .map(|p| p.sources.clone())
                .unwrap_or_default();
            if delta.values().any(|list| !list.is_empty()) {
                for other in room.session_members() {
                    if other == nick {
                        continue;
                    }
                    let sid = room.sessions[&other].sid.clone();
                    if let Some(peer) = room.participant(&other) {
                        outs.push(stanza::iq_set(
                            &peer.jid.to_string(),
                            &focus,
                            &generate_id(16),
                            jingle::source_delta(
                                Action::SourceRemove,
                                &sid,
                                &focus,
                                &delta,
                            ),
                        ));
                    }
                }
            }
            if let (Some(bridge), Some(conference_id)) =
                (room.bridge.as_deref(), room.conference_id())
            {
                outs.push(stanza::iq_set(
                    bridge,
                    &bridge_token,
                    &generate_id(16),
                    colibri::expire_request(
                        conference_id,
                        &[&session.channels],
                    ),
                ));
            }
        }

        room.remove_participant(nick);
        info!("Participant {} left room {}", nick, room_jid);
        for out in outs {
            self.sender.send(out);
        }

        let room = match self.rooms.get(room_jid) {
            Some(room) => room,
            None => return Turn::consumed(),
        };
        if room.capable_count() >= min {
            return Turn::consumed();
        }

        let inert = room.conference == ConferenceState::Absent
            && room.sessions.is_empty();
        if inert {
            if room.is_empty() {
                self.rooms.remove(room_jid);
                self.correlations.drop_room(room_jid);
            }
            return Turn::consumed();
        }

        if linger.is_zero() {
            self.destroy_room(room_jid, true);
            Turn::consumed()
        } else {
            Turn::with(vec![Followup::Teardown {
                room: room_jid.clone(),
                after: linger,
            }])
        }
    }

    /// Tears the room down: announce p2p mode, terminate every session,
    /// expire every channel in one request and clear all per-room state.
    /// Idempotent; with `recheck` the teardown precondition is verified
    /// first.
    fn destroy_room(&mut self, room_jid: &BareJid, recheck: bool) -> bool {
        let focus = self.focus_occupant(room_jid);
        let bridge_token = token::encode(room_jid);
        let min = self.conf.focus.min_participants;

        let room = match self.rooms.get(room_jid) {
            Some(room) => room,
            None => return false,
        };
        if recheck && room.capable_count() >= min {
            debug!("Teardown of {} aborted: threshold reached again", room_jid);
            return false;
        }

        let mut outs = vec![presence::mode_message(
            &room_jid.to_string(),
            true,
            "p2p",
        )];
        for nick in room.session_members() {
            let session = &room.sessions[&nick];
            if let Some(participant) = room.participant(&nick) {
                outs.push(stanza::iq_set(
                    &participant.jid.to_string(),
                    &focus,
                    &generate_id(16),
                    jingle::session_terminate(&session.sid, &focus, "success"),
                ));
            }
        }
        if let (Some(bridge), Some(conference_id)) =
            (room.bridge.as_deref(), room.conference_id())
        {
            let members = room.session_members();
            let sets: Vec<&EndpointChannels> = members
                .iter()
                .map(|nick| &room.sessions[nick].channels)
                .collect();
            if !sets.is_empty() {
                outs.push(stanza::iq_set(
                    bridge,
                    &bridge_token,
                    &generate_id(16),
                    colibri::expire_request(conference_id, &sets),
                ));
            }
        }

        for out in outs {
            self.sender.send(out);
        }
        self.rooms.remove(room_jid);
        self.correlations.drop_room(room_jid);
        info!("Destroyed room {}", room_jid);
        true
    }
}
