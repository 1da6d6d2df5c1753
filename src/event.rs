// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Event records: the audit trail of every state-mutating command.
//!
//! An event is staged while its turn is open and promoted to committed at
//! commit time. Committed events are mirrored, one JSON object per line, into
//! the campaign's append log; `EventRecord` is that line format.

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStage {
    Staged,
    Committed,
}

impl EventStage {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStage::Staged => "staged",
            EventStage::Committed => "committed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "staged" => Ok(EventStage::Staged),
            "committed" => Ok(EventStage::Committed),
            other => Err(KernelError::UnknownStage(other.to_string())),
        }
    }
}

/// One committed event as mirrored into the append log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub campaign_id: String,
    pub turn_id: i64,
    #[serde(default)]
    pub turn_number: i64,
    pub command: String,
    pub payload: serde_json::Value,
    pub timestamp: String,
}

impl EventRecord {
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
