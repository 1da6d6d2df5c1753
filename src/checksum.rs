// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Checkpoint checksum over a campaign snapshot.
//!
//! Drift detection only, not a security primitive. Any two processes hashing
//! identical state must agree, which the canonical snapshot encoding
//! guarantees.

use crate::error::Result;
use crate::snapshot::CampaignSnapshot;

/// Hex digest of the canonical snapshot encoding.
pub fn state_checksum(snapshot: &CampaignSnapshot) -> Result<String> {
    let bytes = snapshot.canonical_json()?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
