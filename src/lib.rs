//! Conference focus agent for multi-party real-time media calls.
//!
//! The focus sits between WebRTC-capable XMPP endpoints and a media
//! bridge: per room it allocates bridge channels over COLIBRI, drives one
//! Jingle session per participant, and propagates source advertisements
//! between peers. The hosting XMPP server embeds this crate, feeds room
//! events into the [`Focus`] actor and delivers whatever the focus
//! enqueues on its [`StanzaSender`].
//!
//! [`Focus`]: crate::signalling::Focus
//! [`StanzaSender`]: crate::signalling::StanzaSender

#![allow(clippy::module_name_repetitions)]

#[macro_use]
pub mod utils;

pub mod bridge;
pub mod conf;
pub mod log;
pub mod media;
pub mod shutdown;
pub mod signalling;
pub mod stanza;

use std::sync::Arc;

use crate::conf::Conf;

/// Global application context.
#[derive(Clone, Debug)]
pub struct AppContext {
    /// Focus configuration.
    pub config: Arc<Conf>,
}

impl AppContext {
    /// Creates new [`AppContext`].
    #[must_use]
    pub fn new(config: Conf) -> Self {
        Self { config: Arc::new(config) }
    }
}
