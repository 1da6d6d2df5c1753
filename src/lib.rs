// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! chronicle-kernel: the deterministic state model for turn-scoped campaign
//! transactions.
//!
//! This crate owns the pure half of the engine: the campaign snapshot types,
//! the six-category turn diff, the checkpoint checksum, and the append-log
//! record model. It performs no I/O; durability lives in `chronicle-store`.
//!
//! # Determinism Guarantees
//! - Snapshots serialize canonically (ordered maps, no timestamps)
//! - Same snapshot => same checksum on any architecture
//! - Diffs are a pure function of (pre, post) snapshots

pub mod checksum;
pub mod diff;
pub mod error;
pub mod event;
pub mod snapshot;
pub mod types;

pub use checksum::state_checksum;
pub use diff::TurnDiff;
pub use error::{KernelError, Result};
pub use event::{EventRecord, EventStage};
pub use snapshot::CampaignSnapshot;
