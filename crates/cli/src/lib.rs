//! chronicle-cli: the command surface over the turn-transaction engine.
//!
//! Every command prints exactly one JSON envelope on stdout; diagnostics go
//! to stderr via `tracing`. Domain payloads are validated here, at the edge,
//! before anything is staged.

pub mod commands;
pub mod context;
pub mod envelope;

pub use context::{CmdResult, CommandError, Ctx};
pub use envelope::Envelope;
