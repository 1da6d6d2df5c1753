//! chronicle-store: the durable half of the turn-transaction engine.
//!
//! One SQLite database plus one append-only NDJSON event log per campaign.
//! The database is authoritative; the log is a human-recoverable mirror
//! written only at commit time and reconciled by `validate`/`repair_events`.

pub mod append_log;
pub mod db;
pub mod entities;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod paths;
pub mod repair;
pub mod snapshot_io;
pub mod store;
pub mod turns;
pub mod validate;

pub use error::{Result, StoreError};
pub use repair::{repair_events, RepairOutcome};
pub use store::CampaignStore;
pub use turns::{CommitOutcome, TurnRow, TurnStatus, UndoMode, UndoOutcome};
pub use validate::{validate_campaign, CampaignReport, ParityReport};
