// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! The full logical state of one campaign at a point in time.
//!
//! Snapshots anchor everything the engine does: `begin` captures one as the
//! rollback/diff baseline, `commit` diffs against it and checksums the new
//! one, and undo restores one wholesale. Ordered maps keep the JSON encoding
//! canonical so two processes serializing the same state agree byte-for-byte.

use crate::error::Result;
use crate::types::{
    ActiveSpell, Clock, ItemStack, Location, Npc, PlayerCharacter, Quest, Relationship,
    RewardEvent, Rumor, Secret, WorldState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub world_state: WorldState,
    pub locations: BTreeMap<String, Location>,
    pub player_characters: BTreeMap<String, PlayerCharacter>,
    pub npcs: BTreeMap<String, Npc>,
    pub inventory: BTreeMap<String, ItemStack>,
    /// Keyed by `Relationship::edge_key`.
    pub relationships: BTreeMap<String, Relationship>,
    pub quests: BTreeMap<String, Quest>,
    pub rumors: BTreeMap<String, Rumor>,
    pub secrets: BTreeMap<String, Secret>,
    pub clocks: BTreeMap<String, Clock>,
    pub active_spells: BTreeMap<String, ActiveSpell>,
    pub rewards: BTreeMap<String, RewardEvent>,
}

impl CampaignSnapshot {
    /// Canonical JSON encoding. BTreeMap iteration order makes this
    /// deterministic for identical state.
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
