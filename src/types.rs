// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Entity types shared by the snapshot model, the diff engine, and the store.
//!
//! Every type here is plain data: serde round-trippable, orderable where the
//! snapshot needs canonical ordering, and free of any storage concerns.

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which entity table an owner/endpoint reference points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Pc,
    Npc,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Pc => "pc",
            OwnerKind::Npc => "npc",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pc" => Ok(OwnerKind::Pc),
            "npc" => Ok(OwnerKind::Npc),
            other => Err(KernelError::UnknownOwnerKind(other.to_string())),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for OwnerKind {
    fn default() -> Self {
        OwnerKind::Pc
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub world_date: String,
    #[serde(default)]
    pub world_time: String,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub world_day_index: i64,
    #[serde(default)]
    pub active_arc: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCharacter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "class")]
    pub char_class: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default)]
    pub max_hp: i64,
    #[serde(default)]
    pub current_hp: i64,
    #[serde(default)]
    pub ac: i64,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub initiative_mod: i64,
    #[serde(default)]
    pub xp_total: i64,
    #[serde(default)]
    pub currency_cp: i64,
    /// Slot pools keyed by spell level ("1", "2", ...).
    #[serde(default)]
    pub spell_slots: BTreeMap<String, i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub max_hp: i64,
    #[serde(default)]
    pub current_hp: i64,
    #[serde(default)]
    pub ac: i64,
    #[serde(default)]
    pub initiative_mod: i64,
    #[serde(default)]
    pub trust: i64,
    #[serde(default)]
    pub fear: i64,
    #[serde(default)]
    pub debt: i64,
    #[serde(default)]
    pub reputation: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: String,
    pub owner_type: OwnerKind,
    pub owner_id: String,
    pub item_name: String,
    pub quantity: i64,
    #[serde(default)]
    pub consumable: bool,
    #[serde(default = "default_true")]
    pub stackable: bool,
}

fn default_true() -> bool {
    true
}

/// A directed standing edge between two characters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_type: OwnerKind,
    pub source_id: String,
    pub target_type: OwnerKind,
    pub target_id: String,
    #[serde(default)]
    pub trust: i64,
    #[serde(default)]
    pub fear: i64,
    #[serde(default)]
    pub debt: i64,
    #[serde(default)]
    pub reputation: i64,
}

impl Relationship {
    /// Canonical map key for the edge, stable across snapshots.
    pub fn edge_key(&self) -> String {
        format!(
            "{}:{}->{}:{}",
            self.source_type, self.source_id, self.target_type, self.target_id
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Quest::default_status")]
    pub status: String,
    #[serde(default)]
    pub is_main_arc: bool,
    #[serde(default)]
    pub objectives: BTreeMap<String, Objective>,
}

impl Quest {
    pub fn default_status() -> String {
        "open".to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Objective::default_status")]
    pub status: String,
    #[serde(default)]
    pub order_index: i64,
}

impl Objective {
    pub fn default_status() -> String {
        "open".to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumor {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub truth_status: String,
    #[serde(default)]
    pub spread_level: i64,
    #[serde(default)]
    pub decay: i64,
    #[serde(default)]
    pub revealed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub discovery_condition: String,
    #[serde(default)]
    pub associated_rumor_id: Option<String>,
    #[serde(default = "Secret::default_reveal_status")]
    pub reveal_status: String,
}

impl Secret {
    pub fn default_reveal_status() -> String {
        "hidden".to_string()
    }
}

/// A progress clock; keyed by name, advances toward `max_segments`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub name: String,
    #[serde(default)]
    pub segments: i64,
    #[serde(default)]
    pub max_segments: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSpell {
    pub id: String,
    pub caster_type: OwnerKind,
    pub caster_id: String,
    pub spell_name: String,
    #[serde(default)]
    pub remaining_rounds: i64,
    #[serde(default)]
    pub requires_concentration: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A granted reward, kept in the snapshot so rollback and undo restore the
/// reward history along with everything else.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub id: String,
    pub recipient_type: OwnerKind,
    pub recipient_id: String,
    pub reward: serde_json::Value,
    #[serde(default)]
    pub turn_number: i64,
    #[serde(default)]
    pub created_at: String,
}
