// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! Turn diff: a structural comparison of two campaign snapshots, grouped
//! into six fixed categories.
//!
//! Every category is present in every diff, empty or not — consumers rely on
//! the shape. Each category has its own comparison policy; this is not a
//! generic deep-diff. Diffs are always computed against the snapshot taken
//! when the turn was opened, never against a previous diff.

use crate::snapshot::CampaignSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// What changed: `world`, `pc:<id>`, `npc:<id>`, `quest:<id>/obj:<id>`,
    /// a relationship edge key, `rumor:<id>`, `secret:<id>`, `clock:<name>`.
    pub subject: String,
    pub field: String,
    pub from: Value,
    pub to: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnDiff {
    pub time_advanced: Vec<FieldChange>,
    pub location_change: Vec<FieldChange>,
    pub hp_resources_changed: Vec<FieldChange>,
    pub inventory_currency_changed: Vec<FieldChange>,
    pub relationship_reputation_changed: Vec<FieldChange>,
    pub quest_rumor_clock_updates: Vec<FieldChange>,
}

impl TurnDiff {
    pub fn compute(pre: &CampaignSnapshot, post: &CampaignSnapshot) -> TurnDiff {
        let mut diff = TurnDiff::default();
        diff.collect_time(pre, post);
        diff.collect_locations(pre, post);
        diff.collect_hp_resources(pre, post);
        diff.collect_inventory_currency(pre, post);
        diff.collect_relationships(pre, post);
        diff.collect_quest_rumor_clock(pre, post);
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.time_advanced.is_empty()
            && self.location_change.is_empty()
            && self.hp_resources_changed.is_empty()
            && self.inventory_currency_changed.is_empty()
            && self.relationship_reputation_changed.is_empty()
            && self.quest_rumor_clock_updates.is_empty()
    }

    /// One-line rendering of the non-empty categories.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (name, entries) in [
            ("time_advanced", &self.time_advanced),
            ("location_change", &self.location_change),
            ("hp_resources_changed", &self.hp_resources_changed),
            ("inventory_currency_changed", &self.inventory_currency_changed),
            (
                "relationship_reputation_changed",
                &self.relationship_reputation_changed,
            ),
            ("quest_rumor_clock_updates", &self.quest_rumor_clock_updates),
        ] {
            if !entries.is_empty() {
                parts.push(format!("{}({})", name, entries.len()));
            }
        }
        if parts.is_empty() {
            "no state changes".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn collect_time(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        let a = &pre.world_state;
        let b = &post.world_state;
        push_str_change(&mut self.time_advanced, "world", "world_date", &a.world_date, &b.world_date);
        push_str_change(&mut self.time_advanced, "world", "world_time", &a.world_time, &b.world_time);
        if a.world_day_index != b.world_day_index {
            self.time_advanced.push(FieldChange {
                subject: "world".into(),
                field: "world_day_index".into(),
                from: a.world_day_index.into(),
                to: b.world_day_index.into(),
            });
        }
    }

    fn collect_locations(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        let a = &pre.world_state;
        let b = &post.world_state;
        push_str_change(&mut self.location_change, "world", "location_id", &a.location_id, &b.location_id);
        push_str_change(&mut self.location_change, "world", "region", &a.region, &b.region);

        for id in key_union(pre.player_characters.keys(), post.player_characters.keys()) {
            let from = pre.player_characters.get(&id).map(|pc| pc.location_id.clone());
            let to = post.player_characters.get(&id).map(|pc| pc.location_id.clone());
            push_opt_str_change(&mut self.location_change, &format!("pc:{id}"), "location_id", from, to);
        }
        for id in key_union(pre.npcs.keys(), post.npcs.keys()) {
            let from = pre.npcs.get(&id).map(|n| n.location_id.clone());
            let to = post.npcs.get(&id).map(|n| n.location_id.clone());
            push_opt_str_change(&mut self.location_change, &format!("npc:{id}"), "location_id", from, to);
        }
    }

    fn collect_hp_resources(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        for id in key_union(pre.player_characters.keys(), post.player_characters.keys()) {
            let subject = format!("pc:{id}");
            let a = pre.player_characters.get(&id);
            let b = post.player_characters.get(&id);
            push_opt_num_change(&mut self.hp_resources_changed, &subject, "current_hp", a.map(|p| p.current_hp), b.map(|p| p.current_hp));
            push_opt_num_change(&mut self.hp_resources_changed, &subject, "max_hp", a.map(|p| p.max_hp), b.map(|p| p.max_hp));

            let mut levels = BTreeSet::new();
            if let Some(pc) = a {
                levels.extend(pc.spell_slots.keys().cloned());
            }
            if let Some(pc) = b {
                levels.extend(pc.spell_slots.keys().cloned());
            }
            for level in levels {
                let from = a.and_then(|p| p.spell_slots.get(&level).copied());
                let to = b.and_then(|p| p.spell_slots.get(&level).copied());
                push_opt_num_change(&mut self.hp_resources_changed, &subject, &format!("spell_slots.{level}"), from, to);
            }
        }

        for id in key_union(pre.npcs.keys(), post.npcs.keys()) {
            let subject = format!("npc:{id}");
            let a = pre.npcs.get(&id);
            let b = post.npcs.get(&id);
            push_opt_num_change(&mut self.hp_resources_changed, &subject, "current_hp", a.map(|n| n.current_hp), b.map(|n| n.current_hp));
            push_opt_num_change(&mut self.hp_resources_changed, &subject, "max_hp", a.map(|n| n.max_hp), b.map(|n| n.max_hp));
        }

        for id in key_union(pre.active_spells.keys(), post.active_spells.keys()) {
            let a = pre.active_spells.get(&id);
            let b = post.active_spells.get(&id);
            let subject = a
                .or(b)
                .map(|s| format!("{}:{}", s.caster_type, s.caster_id))
                .unwrap_or_default();
            let field = a
                .or(b)
                .map(|s| format!("spell:{}", s.spell_name))
                .unwrap_or_default();
            let from = a.map(|s| spell_status(s.active));
            let to = b.map(|s| spell_status(s.active));
            push_opt_str_change(&mut self.hp_resources_changed, &subject, &field, from, to);
        }
    }

    fn collect_inventory_currency(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        for id in key_union(pre.inventory.keys(), post.inventory.keys()) {
            let a = pre.inventory.get(&id);
            let b = post.inventory.get(&id);
            let stack = a.or(b).expect("key came from one of the maps");
            let subject = format!("{}:{}", stack.owner_type, stack.owner_id);
            let field = format!("item:{}", stack.item_name);
            push_opt_num_change(&mut self.inventory_currency_changed, &subject, &field, a.map(|s| s.quantity), b.map(|s| s.quantity));
        }

        for id in key_union(pre.player_characters.keys(), post.player_characters.keys()) {
            let subject = format!("pc:{id}");
            let a = pre.player_characters.get(&id);
            let b = post.player_characters.get(&id);
            push_opt_num_change(&mut self.inventory_currency_changed, &subject, "currency_cp", a.map(|p| p.currency_cp), b.map(|p| p.currency_cp));
            push_opt_num_change(&mut self.inventory_currency_changed, &subject, "xp_total", a.map(|p| p.xp_total), b.map(|p| p.xp_total));
        }
    }

    fn collect_relationships(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        for key in key_union(pre.relationships.keys(), post.relationships.keys()) {
            let a = pre.relationships.get(&key);
            let b = post.relationships.get(&key);
            push_opt_num_change(&mut self.relationship_reputation_changed, &key, "trust", a.map(|r| r.trust), b.map(|r| r.trust));
            push_opt_num_change(&mut self.relationship_reputation_changed, &key, "fear", a.map(|r| r.fear), b.map(|r| r.fear));
            push_opt_num_change(&mut self.relationship_reputation_changed, &key, "debt", a.map(|r| r.debt), b.map(|r| r.debt));
            push_opt_num_change(&mut self.relationship_reputation_changed, &key, "reputation", a.map(|r| r.reputation), b.map(|r| r.reputation));
        }

        // NPC standing fields count as reputation state too.
        for id in key_union(pre.npcs.keys(), post.npcs.keys()) {
            let subject = format!("npc:{id}");
            let a = pre.npcs.get(&id);
            let b = post.npcs.get(&id);
            push_opt_num_change(&mut self.relationship_reputation_changed, &subject, "trust", a.map(|n| n.trust), b.map(|n| n.trust));
            push_opt_num_change(&mut self.relationship_reputation_changed, &subject, "fear", a.map(|n| n.fear), b.map(|n| n.fear));
            push_opt_num_change(&mut self.relationship_reputation_changed, &subject, "debt", a.map(|n| n.debt), b.map(|n| n.debt));
            push_opt_num_change(&mut self.relationship_reputation_changed, &subject, "reputation", a.map(|n| n.reputation), b.map(|n| n.reputation));
        }
    }

    fn collect_quest_rumor_clock(&mut self, pre: &CampaignSnapshot, post: &CampaignSnapshot) {
        for id in key_union(pre.quests.keys(), post.quests.keys()) {
            let a = pre.quests.get(&id);
            let b = post.quests.get(&id);
            let subject = format!("quest:{id}");
            push_opt_str_change(&mut self.quest_rumor_clock_updates, &subject, "status", a.map(|q| q.status.clone()), b.map(|q| q.status.clone()));

            let mut objective_ids = BTreeSet::new();
            if let Some(q) = a {
                objective_ids.extend(q.objectives.keys().cloned());
            }
            if let Some(q) = b {
                objective_ids.extend(q.objectives.keys().cloned());
            }
            for oid in objective_ids {
                let from = a.and_then(|q| q.objectives.get(&oid)).map(|o| o.status.clone());
                let to = b.and_then(|q| q.objectives.get(&oid)).map(|o| o.status.clone());
                push_opt_str_change(&mut self.quest_rumor_clock_updates, &format!("{subject}/obj:{oid}"), "status", from, to);
            }
        }

        for id in key_union(pre.rumors.keys(), post.rumors.keys()) {
            let subject = format!("rumor:{id}");
            let a = pre.rumors.get(&id);
            let b = post.rumors.get(&id);
            push_opt_num_change(&mut self.quest_rumor_clock_updates, &subject, "spread_level", a.map(|r| r.spread_level), b.map(|r| r.spread_level));
            push_opt_str_change(&mut self.quest_rumor_clock_updates, &subject, "revealed", a.map(|r| r.revealed.to_string()), b.map(|r| r.revealed.to_string()));
        }

        for id in key_union(pre.secrets.keys(), post.secrets.keys()) {
            let subject = format!("secret:{id}");
            let a = pre.secrets.get(&id);
            let b = post.secrets.get(&id);
            push_opt_str_change(&mut self.quest_rumor_clock_updates, &subject, "reveal_status", a.map(|s| s.reveal_status.clone()), b.map(|s| s.reveal_status.clone()));
        }

        for name in key_union(pre.clocks.keys(), post.clocks.keys()) {
            let subject = format!("clock:{name}");
            let a = pre.clocks.get(&name);
            let b = post.clocks.get(&name);
            push_opt_num_change(&mut self.quest_rumor_clock_updates, &subject, "segments", a.map(|c| c.segments), b.map(|c| c.segments));
        }
    }
}

fn spell_status(active: bool) -> String {
    if active { "active".to_string() } else { "ended".to_string() }
}

fn key_union<'a>(
    a: impl Iterator<Item = &'a String>,
    b: impl Iterator<Item = &'a String>,
) -> Vec<String> {
    let mut keys: BTreeSet<String> = a.cloned().collect();
    keys.extend(b.cloned());
    keys.into_iter().collect()
}

fn push_str_change(out: &mut Vec<FieldChange>, subject: &str, field: &str, from: &str, to: &str) {
    if from != to {
        out.push(FieldChange {
            subject: subject.to_string(),
            field: field.to_string(),
            from: from.into(),
            to: to.into(),
        });
    }
}

fn push_opt_str_change(
    out: &mut Vec<FieldChange>,
    subject: &str,
    field: &str,
    from: Option<String>,
    to: Option<String>,
) {
    if from != to {
        out.push(FieldChange {
            subject: subject.to_string(),
            field: field.to_string(),
            from: from.map(Value::from).unwrap_or(Value::Null),
            to: to.map(Value::from).unwrap_or(Value::Null),
        });
    }
}

fn push_opt_num_change(
    out: &mut Vec<FieldChange>,
    subject: &str,
    field: &str,
    from: Option<i64>,
    to: Option<i64>,
) {
    if from != to {
        out.push(FieldChange {
            subject: subject.to_string(),
            field: field.to_string(),
            from: from.map(Value::from).unwrap_or(Value::Null),
            to: to.map(Value::from).unwrap_or(Value::Null),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemStack, Npc, OwnerKind, PlayerCharacter, Relationship};

    fn base() -> CampaignSnapshot {
        let mut snap = CampaignSnapshot::default();
        snap.world_state.world_date = "1 Ches 1492 DR".into();
        snap.world_state.world_time = "08:00".into();
        snap.world_state.location_id = "loc_town".into();
        snap.player_characters.insert(
            "pc_hero".into(),
            PlayerCharacter {
                id: "pc_hero".into(),
                current_hp: 24,
                max_hp: 24,
                location_id: "loc_town".into(),
                ..PlayerCharacter::default()
            },
        );
        snap.npcs.insert(
            "npc_mayor".into(),
            Npc { id: "npc_mayor".into(), current_hp: 11, max_hp: 11, ..Npc::default() },
        );
        snap
    }

    #[test]
    fn identical_snapshots_are_an_empty_diff() {
        let snap = base();
        let diff = TurnDiff::compute(&snap, &snap);
        assert!(diff.is_empty());
        assert_eq!(diff.summary(), "no state changes");
    }

    #[test]
    fn time_change_populates_only_time_category() {
        let pre = base();
        let mut post = pre.clone();
        post.world_state.world_time = "12:00".into();

        let diff = TurnDiff::compute(&pre, &post);
        assert_eq!(diff.time_advanced.len(), 1);
        assert_eq!(diff.time_advanced[0].field, "world_time");
        assert!(diff.location_change.is_empty());
        assert!(diff.hp_resources_changed.is_empty());
        assert!(diff.inventory_currency_changed.is_empty());
        assert!(diff.relationship_reputation_changed.is_empty());
        assert!(diff.quest_rumor_clock_updates.is_empty());
    }

    #[test]
    fn item_grant_shows_in_inventory_category() {
        let pre = base();
        let mut post = pre.clone();
        post.inventory.insert(
            "item_1".into(),
            ItemStack {
                id: "item_1".into(),
                owner_type: OwnerKind::Pc,
                owner_id: "pc_hero".into(),
                item_name: "Potion of Healing".into(),
                quantity: 2,
                consumable: true,
                stackable: true,
            },
        );

        let diff = TurnDiff::compute(&pre, &post);
        assert_eq!(diff.inventory_currency_changed.len(), 1);
        let change = &diff.inventory_currency_changed[0];
        assert_eq!(change.subject, "pc:pc_hero");
        assert_eq!(change.field, "item:Potion of Healing");
        assert_eq!(change.from, Value::Null);
        assert_eq!(change.to, Value::from(2));
    }

    #[test]
    fn relationship_delta_per_edge_field() {
        let pre = base();
        let mut post = pre.clone();
        let rel = Relationship {
            source_type: OwnerKind::Pc,
            source_id: "pc_hero".into(),
            target_type: OwnerKind::Npc,
            target_id: "npc_mayor".into(),
            trust: 1,
            ..Relationship::default()
        };
        post.relationships.insert(rel.edge_key(), rel);

        let diff = TurnDiff::compute(&pre, &post);
        let trust: Vec<_> = diff
            .relationship_reputation_changed
            .iter()
            .filter(|c| c.field == "trust" && c.subject == "pc:pc_hero->npc:npc_mayor")
            .collect();
        assert_eq!(trust.len(), 1);
        assert_eq!(trust[0].to, Value::from(1));
    }

    #[test]
    fn hp_and_damage_land_in_resources() {
        let pre = base();
        let mut post = pre.clone();
        post.npcs.get_mut("npc_mayor").unwrap().current_hp = 5;

        let diff = TurnDiff::compute(&pre, &post);
        assert_eq!(diff.hp_resources_changed.len(), 1);
        assert_eq!(diff.hp_resources_changed[0].subject, "npc:npc_mayor");
        assert_eq!(diff.hp_resources_changed[0].from, Value::from(11));
        assert_eq!(diff.hp_resources_changed[0].to, Value::from(5));
    }

    #[test]
    fn all_six_categories_always_serialize() {
        let diff = TurnDiff::default();
        let value = serde_json::to_value(&diff).unwrap();
        let map = value.as_object().unwrap();
        for key in [
            "time_advanced",
            "location_change",
            "hp_resources_changed",
            "inventory_currency_changed",
            "relationship_reputation_changed",
            "quest_rumor_clock_updates",
        ] {
            assert!(map.contains_key(key), "missing category {key}");
        }
    }

    #[test]
    fn summary_names_non_empty_categories() {
        let pre = base();
        let mut post = pre.clone();
        post.world_state.world_time = "09:00".into();
        post.npcs.get_mut("npc_mayor").unwrap().current_hp = 9;

        let summary = TurnDiff::compute(&pre, &post).summary();
        assert!(summary.contains("time_advanced(1)"));
        assert!(summary.contains("hp_resources_changed(1)"));
        assert!(!summary.contains("inventory_currency_changed"));
    }
}
