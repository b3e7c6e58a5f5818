//! Media bridge bookkeeping: statistics ingestion and bridge selection.

pub mod ingest;
pub mod selector;

pub use self::{
    ingest::parse_stats_event,
    selector::{BridgeSelector, BridgeStats},
};
