//! Quest and objective bookkeeping.
//!
//! Statuses are normalized at the edge: quests settle on
//! open/active/completed/failed, objectives on open/complete/failed.
//! Objective ids are campaign-scoped, so reusing one under a different quest
//! is a conflict, not an upsert.

use crate::commands::short_id;
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{Objective, Quest};
use chronicle_store::{entities, CampaignStore};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn normalize_quest_status(raw: &str) -> Result<String, CommandError> {
    match raw {
        "open" | "active" | "completed" | "failed" => Ok(raw.to_string()),
        "complete" => Ok("completed".to_string()),
        other => Err(CommandError::with_details(
            "invalid_quest_status",
            json!({
                "message": format!("unknown quest status: {other}"),
                "status": other,
            }),
        )),
    }
}

fn normalize_objective_status(raw: &str) -> Result<String, CommandError> {
    match raw {
        "open" | "complete" | "failed" => Ok(raw.to_string()),
        "completed" => Ok("complete".to_string()),
        other => Err(CommandError::with_details(
            "invalid_objective_status",
            json!({
                "message": format!("unknown objective status: {other}"),
                "status": other,
            }),
        )),
    }
}

fn check_objective_ownership(
    store: &CampaignStore,
    quest_id: &str,
    objective_id: &str,
) -> Result<(), CommandError> {
    let owner = entities::objective_quest(store.conn(), store.campaign_id(), objective_id)?;
    match owner {
        Some(existing) if existing != quest_id => Err(CommandError::with_details(
            "objective_id_conflict",
            json!({
                "message": format!("objective {objective_id} already belongs to quest {existing}"),
                "objective_id": objective_id,
                "quest_id": quest_id,
                "existing_quest_id": existing,
            }),
        )),
        _ => Ok(()),
    }
}

#[derive(Deserialize)]
struct AddPayload {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_main_arc: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    objectives: Vec<ObjectiveInput>,
}

#[derive(Deserialize)]
struct ObjectiveInput {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    order_index: Option<i64>,
}

pub fn add(ctx: &Ctx) -> CmdResult {
    let payload: AddPayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let quest_id = payload.id.unwrap_or_else(|| short_id("quest"));
    let status = match payload.status.as_deref() {
        Some(raw) => normalize_quest_status(raw)?,
        None => Quest::default_status(),
    };

    let mut objectives = BTreeMap::new();
    for (index, input) in payload.objectives.iter().enumerate() {
        let objective_id = input.id.clone().unwrap_or_else(|| short_id("obj"));
        check_objective_ownership(&store, &quest_id, &objective_id)?;
        let status = match input.status.as_deref() {
            Some(raw) => normalize_objective_status(raw)?,
            None => Objective::default_status(),
        };
        objectives.insert(
            objective_id.clone(),
            Objective {
                id: objective_id,
                description: input.description.clone(),
                status,
                order_index: input.order_index.unwrap_or(index as i64),
            },
        );
    }

    let quest = Quest {
        id: quest_id,
        title: payload.title,
        description: payload.description,
        status,
        is_main_arc: payload.is_main_arc,
        objectives,
    };

    store.mutate("quest add", &ctx.raw_payload(), |conn| {
        entities::upsert_quest(conn, &campaign, &quest)
    })?;
    Ok(json!({ "quest": quest }))
}

#[derive(Deserialize)]
struct UpdatePayload {
    quest_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    objective_updates: Vec<ObjectiveInput>,
}

pub fn update(ctx: &Ctx) -> CmdResult {
    let payload: UpdatePayload = ctx.payload()?;
    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let Some(mut quest) = entities::get_quest(store.conn(), &campaign, &payload.quest_id)? else {
        return Err(CommandError::with_details(
            "quest_not_found",
            json!({
                "message": format!("quest {} does not exist", payload.quest_id),
                "quest_id": payload.quest_id,
            }),
        ));
    };

    if let Some(title) = payload.title {
        quest.title = title;
    }
    if let Some(description) = payload.description {
        quest.description = description;
    }
    if let Some(raw) = payload.status.as_deref() {
        quest.status = normalize_quest_status(raw)?;
    }

    for input in &payload.objective_updates {
        let objective_id = input.id.clone().unwrap_or_else(|| short_id("obj"));
        check_objective_ownership(&store, &quest.id, &objective_id)?;
        let existing = quest.objectives.get(&objective_id);
        let status = match input.status.as_deref() {
            Some(raw) => normalize_objective_status(raw)?,
            None => existing.map_or_else(Objective::default_status, |o| o.status.clone()),
        };
        let description = if input.description.is_empty() {
            existing.map_or(String::new(), |o| o.description.clone())
        } else {
            input.description.clone()
        };
        let order_index = input
            .order_index
            .or_else(|| existing.map(|o| o.order_index))
            .unwrap_or(quest.objectives.len() as i64);
        quest.objectives.insert(
            objective_id.clone(),
            Objective { id: objective_id, description, status, order_index },
        );
    }

    store.mutate("quest update", &ctx.raw_payload(), |conn| {
        entities::upsert_quest(conn, &campaign, &quest)
    })?;

    let objectives: Vec<&Objective> = quest.objectives.values().collect();
    Ok(json!({ "quest": &quest, "objectives": objectives }))
}
