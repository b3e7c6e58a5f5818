//! Graceful shutdown implementation.
//!
//! Listens for OS signals and informs subscribers, giving the focus a
//! chance to expire every bridge channel before the process exits.

use actix::{
    Actor, AsyncContext, Context, Handler, Message, Recipient, System,
};
#[cfg(unix)]
use futures::StreamExt as _;

use crate::log::prelude::*;

/// Message subscribers are informed with to perform their graceful
/// shutdown.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct ShutdownGracefully;

/// Subscribes a recipient to [`ShutdownGracefully`] notifications.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe(pub Recipient<ShutdownGracefully>);

/// Service which listens for incoming OS signals and performs graceful
/// shutdown for all its subscribers.
#[derive(Default)]
pub struct GracefulShutdown {
    subs: Vec<Recipient<ShutdownGracefully>>,
}

impl GracefulShutdown {
    /// Creates a new [`GracefulShutdown`] service.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for GracefulShutdown {
    type Context = Context<Self>;

    #[cfg(not(unix))]
    fn started(&mut self, _: &mut Self::Context) {
        warn!(
            "Graceful shutdown is disabled: only UNIX signals are \
             supported, and current platform is not UNIX"
        );
    }

    #[cfg(unix)]
    fn started(&mut self, ctx: &mut Self::Context) {
        use tokio::signal::unix::{signal, SignalKind};
        use tokio_stream::wrappers::SignalStream;

        let mut register_sig = |kind: SignalKind, num: i32| match signal(kind)
        {
            Ok(sig_stream) => {
                ctx.add_message_stream(
                    SignalStream::new(sig_stream)
                        .map(move |_| OsSignal(num)),
                );
            }
            Err(err) => error!("Cannot register OsSignal: {:?}", err),
        };

        register_sig(SignalKind::hangup(), 1);
        register_sig(SignalKind::interrupt(), 2);
        register_sig(SignalKind::quit(), 3);
        register_sig(SignalKind::terminate(), 15);
    }
}

/// Message received when the process catches an OS signal.
#[derive(Message)]
#[rtype(result = "()")]
struct OsSignal(i32);

impl Handler<OsSignal> for GracefulShutdown {
    type Result = ();

    fn handle(&mut self, sig: OsSignal, _: &mut Context<Self>) {
        info!("OS signal '{}' received", sig.0);
        for sub in &self.subs {
            sub.do_send(ShutdownGracefully);
        }
        System::current().stop();
    }
}

impl Handler<Subscribe> for GracefulShutdown {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Context<Self>) {
        self.subs.push(msg.0);
    }
}
