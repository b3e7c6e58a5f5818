//! Logging surface of the focus.
//!
//! The focus normally lives inside a hosting server which owns the root
//! logger, so all modules log through `slog-scope` and the host decides
//! the drain. [`new_logger`] builds the JSON logger used when the focus
//! runs on its own (and in tests): records are tagged with the service
//! identity, and warnings are duplicated to the second writer so bridge
//! trouble surfaces on stderr even when stdout is piped away.
//!
//! [`room_scope`] extends the current scope with the room a turn operates
//! on; every record logged inside the turn then names the conference it
//! belongs to, which is what makes interleaved multi-room logs readable.

use std::io;

use jid::BareJid;
use slog::{o, Drain, Duplicate, Fuse, Level, Logger};
use slog_async::Async;
use slog_json::Json;

pub mod prelude {
    //! Common logging definitions, used as `crate::log::prelude::*`.

    pub use slog::{slog_debug, slog_error, slog_info, slog_trace, slog_warn};
    pub use slog_scope::{debug, error, info, trace, warn};

    pub use super::room_scope;
}

/// Builds the standalone JSON logger of the focus: records below WARN go
/// to `out`, warnings and above to `err`. Every record carries the
/// service name and version next to the timestamp, level and message.
pub fn new_logger<W1, W2>(out: W1, err: W2) -> Logger
where
    W1: io::Write + Send + 'static,
    W2: io::Write + Send + 'static,
{
    let fine = Json::default(out);
    let alarming = Json::default(err);
    let split = Duplicate::new(
        fine.filter(|r| !r.level().is_at_least(Level::Warning)),
        alarming.filter_level(Level::Warning),
    )
    .map(Fuse);
    let drain = Async::new(split).build().fuse();
    Logger::root(
        drain,
        o!(
            "svc" => env!("CARGO_PKG_NAME"),
            "v" => env!("CARGO_PKG_VERSION"),
        ),
    )
}

/// Runs `f` with the current logging scope extended by the room key.
///
/// The controller handles events of many rooms on one logical thread;
/// scoping each turn keeps its records attributable without threading a
/// logger through every call.
pub fn room_scope<F, R>(room: &BareJid, f: F) -> R
where
    F: FnOnce() -> R,
{
    let scoped = slog_scope::logger().new(o!("room" => room.to_string()));
    slog_scope::scope(&scoped, f)
}
