//! Media-level model: static codec tables and advertised source tracking.

pub mod codecs;
pub mod source;

pub use self::source::{MsidState, SourceMap};
