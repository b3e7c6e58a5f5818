//! Actor surface of the focus.
//!
//! One logical turn per message: the host fires room events and routed
//! stanzas into this mailbox, timers re-enter through the same mailbox
//! via [`AsyncContext::notify`], so all per-room state is mutated from a
//! single logical thread.

use std::{rc::Rc, sync::Arc, time::Duration};

use actix::{
    dev::{MessageResponse, OneshotSender},
    Actor, AsyncContext, Context, Handler, Message,
};
use jid::{BareJid, FullJid};
use minidom::Element;

use crate::{
    log::prelude::*,
    shutdown::ShutdownGracefully,
    signalling::controller::{FocusController, Followup, StanzaSender},
    AppContext,
};

/// Whether an inbound event was consumed by the focus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Consumed(pub bool);

impl<A, M> MessageResponse<A, M> for Consumed
where
    A: Actor,
    M: Message<Result = Consumed>,
{
    fn handle(
        self,
        _: &mut A::Context,
        tx: Option<OneshotSender<M::Result>>,
    ) {
        if let Some(tx) = tx {
            let _ = tx.send(self);
        }
    }
}

/// A presence rewritten by the pre-change hook.
#[derive(Clone, Debug)]
pub struct Filtered(pub Element);

impl<A, M> MessageResponse<A, M> for Filtered
where
    A: Actor,
    M: Message<Result = Filtered>,
{
    fn handle(
        self,
        _: &mut A::Context,
        tx: Option<OneshotSender<M::Result>>,
    ) {
        if let Some(tx) = tx {
            let _ = tx.send(self);
        }
    }
}

/// A join presence is about to be processed by the host.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct PreJoin {
    pub room: BareJid,
    pub presence: Element,
}

/// An occupant record was materialized by the host.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct OccupantJoined {
    pub room: BareJid,
    pub nick: String,
    pub jid: FullJid,
    pub presence: Element,
}

/// An occupant left the room.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct OccupantLeft {
    pub room: BareJid,
    pub nick: String,
}

/// An IQ reply addressed to a room token came back from a bridge.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct ColibriReply {
    pub iq: Element,
}

/// A Jingle IQ of a room occupant was routed to the focus.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct JingleRequest {
    pub room: BareJid,
    pub nick: String,
    pub iq: Element,
}

/// A message from the statistics pub/sub feed.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct StatsReceived {
    pub message: Element,
}

/// A service-discovery info query addressed to the focus.
#[derive(Debug, Message)]
#[rtype(result = "Consumed")]
pub struct DiscoInfoQuery {
    pub iq: Element,
}

/// Pre-change hook: rewrite an outgoing presence before broadcast.
#[derive(Debug, Message)]
#[rtype(result = "Filtered")]
pub struct FilterPresence {
    pub room: BareJid,
    pub nick: String,
    pub presence: Element,
}

/// Linger timer of a room elapsed.
#[derive(Debug, Message)]
#[rtype(result = "()")]
struct DestroyConference {
    room: BareJid,
}

/// Pending-allocation timer of a request elapsed.
#[derive(Debug, Message)]
#[rtype(result = "()")]
struct PendingTimeout {
    room: BareJid,
    request: String,
}

/// The focus actor wrapping the [`FocusController`] state machine.
#[derive(Debug)]
pub struct Focus {
    controller: FocusController,
    subscription_delay: Duration,
}

impl Focus {
    /// Creates a new [`Focus`] enqueueing outbound stanzas on `sender`.
    pub fn new(context: &AppContext, sender: Rc<dyn StanzaSender>) -> Self {
        Self {
            subscription_delay: context.config.pubsub.subscription_delay,
            controller: FocusController::new(
                Arc::clone(&context.config),
                sender,
            ),
        }
    }

    /// Schedules deferred re-checks requested by a turn.
    fn schedule(ctx: &mut Context<Self>, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::PendingCheck { room, request, after } => {
                    ctx.run_later(after, move |_, ctx| {
                        ctx.notify(PendingTimeout { room, request });
                    });
                }
                Followup::Teardown { room, after } => {
                    ctx.run_later(after, move |_, ctx| {
                        ctx.notify(DestroyConference { room });
                    });
                }
            }
        }
    }
}

impl Actor for Focus {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Conference focus started");
        // Give hosts time to initialize before subscribing to the
        // statistics feed.
        ctx.run_later(self.subscription_delay, |focus, _| {
            focus.controller.subscribe_stats();
        });
    }
}

impl Handler<PreJoin> for Focus {
    type Result = Consumed;

    fn handle(&mut self, msg: PreJoin, _: &mut Self::Context) -> Consumed {
        let turn = room_scope(&msg.room, || {
            self.controller.on_pre_join(&msg.room, &msg.presence)
        });
        Consumed(turn.consumed)
    }
}

impl Handler<OccupantJoined> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: OccupantJoined,
        ctx: &mut Self::Context,
    ) -> Consumed {
        let turn = room_scope(&msg.room, || {
            self.controller.on_joined(
                &msg.room,
                &msg.nick,
                &msg.jid,
                &msg.presence,
            )
        });
        Self::schedule(ctx, turn.followups);
        Consumed(turn.consumed)
    }
}

impl Handler<OccupantLeft> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: OccupantLeft,
        ctx: &mut Self::Context,
    ) -> Consumed {
        let turn = room_scope(&msg.room, || {
            self.controller.on_left(&msg.room, &msg.nick)
        });
        Self::schedule(ctx, turn.followups);
        Consumed(turn.consumed)
    }
}

impl Handler<ColibriReply> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: ColibriReply,
        ctx: &mut Self::Context,
    ) -> Consumed {
        let turn = self.controller.on_colibri_reply(&msg.iq);
        Self::schedule(ctx, turn.followups);
        Consumed(turn.consumed)
    }
}

impl Handler<JingleRequest> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: JingleRequest,
        ctx: &mut Self::Context,
    ) -> Consumed {
        let turn = room_scope(&msg.room, || {
            self.controller.on_jingle(&msg.room, &msg.nick, &msg.iq)
        });
        Self::schedule(ctx, turn.followups);
        Consumed(turn.consumed)
    }
}

impl Handler<StatsReceived> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: StatsReceived,
        _: &mut Self::Context,
    ) -> Consumed {
        Consumed(self.controller.on_stats(&msg.message).consumed)
    }
}

impl Handler<DiscoInfoQuery> for Focus {
    type Result = Consumed;

    fn handle(
        &mut self,
        msg: DiscoInfoQuery,
        _: &mut Self::Context,
    ) -> Consumed {
        Consumed(self.controller.on_disco_info(&msg.iq).consumed)
    }
}

impl Handler<FilterPresence> for Focus {
    type Result = Filtered;

    fn handle(
        &mut self,
        msg: FilterPresence,
        _: &mut Self::Context,
    ) -> Filtered {
        Filtered(self.controller.filter_presence(
            &msg.room,
            &msg.nick,
            &msg.presence,
        ))
    }
}

impl Handler<DestroyConference> for Focus {
    type Result = ();

    fn handle(&mut self, msg: DestroyConference, _: &mut Self::Context) {
        room_scope(&msg.room, || {
            self.controller.on_destroy_check(&msg.room)
        });
    }
}

impl Handler<PendingTimeout> for Focus {
    type Result = ();

    fn handle(&mut self, msg: PendingTimeout, ctx: &mut Self::Context) {
        let turn = room_scope(&msg.room, || {
            self.controller.on_pending_check(&msg.room, &msg.request)
        });
        Self::schedule(ctx, turn.followups);
    }
}

impl Handler<ShutdownGracefully> for Focus {
    type Result = ();

    fn handle(&mut self, _: ShutdownGracefully, _: &mut Self::Context) {
        info!("Shutting down: expiring all conferences");
        self.controller.shutdown();
    }
}
