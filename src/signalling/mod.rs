//! The conference focus state machine and its actor surface.

pub mod controller;
pub mod correlation;
pub mod focus;
pub mod participant;
pub mod presence;
pub mod room;
pub mod token;

use derive_more::{Display, From};
use failure::Fail;

use crate::stanza::StanzaError;

pub use self::{
    controller::{FocusController, StanzaSender},
    focus::Focus,
    participant::Participant,
    room::Room,
};

/// Errors of the focus state machine.
///
/// None of these ever propagate to the host: handlers log them and leave
/// the room state untouched.
#[derive(Debug, Display, Fail, From)]
pub enum FocusError {
    /// A bridge-facing room token did not decode back to a room address.
    #[display(fmt = "Malformed room token: {}", _0)]
    #[from(ignore)]
    BadToken(String),

    /// A stanza failed to parse.
    #[display(fmt = "{}", _0)]
    Stanza(StanzaError),
}
