//! Inventory grants and consumption. Stacks merge by (owner, item name)
//! when stackable; consuming below zero is rejected with nothing staged.

use crate::commands::{require_owner, short_id};
use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_kernel::types::{ItemStack, OwnerKind};
use chronicle_store::entities;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct GrantPayload {
    owner_type: OwnerKind,
    owner_id: String,
    #[serde(default)]
    item_id: Option<String>,
    item_name: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
    #[serde(default)]
    consumable: bool,
    #[serde(default = "default_stackable")]
    stackable: bool,
}

fn default_quantity() -> i64 {
    1
}

fn default_stackable() -> bool {
    true
}

pub fn grant(ctx: &Ctx) -> CmdResult {
    let payload: GrantPayload = ctx.payload()?;
    if payload.quantity < 1 {
        return Err(CommandError::new("invalid_quantity", "quantity must be at least 1"));
    }

    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    require_owner(&store, payload.owner_type, &payload.owner_id)?;
    let campaign = store.campaign_id().to_string();

    let existing = entities::find_item(
        store.conn(),
        &campaign,
        payload.owner_type,
        &payload.owner_id,
        &payload.item_name,
    )?;
    let item = match existing {
        Some(mut stack) if stack.stackable && payload.stackable => {
            stack.quantity += payload.quantity;
            stack
        }
        _ => ItemStack {
            id: payload.item_id.clone().unwrap_or_else(|| short_id("item")),
            owner_type: payload.owner_type,
            owner_id: payload.owner_id.clone(),
            item_name: payload.item_name.clone(),
            quantity: payload.quantity,
            consumable: payload.consumable,
            stackable: payload.stackable,
        },
    };

    store.mutate("item grant", &ctx.raw_payload(), |conn| {
        entities::upsert_item(conn, &campaign, &item)
    })?;
    Ok(json!({ "item": item }))
}

#[derive(Deserialize)]
struct ConsumePayload {
    owner_type: OwnerKind,
    owner_id: String,
    item_name: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
}

pub fn consume(ctx: &Ctx) -> CmdResult {
    let payload: ConsumePayload = ctx.payload()?;
    if payload.quantity < 1 {
        return Err(CommandError::new("invalid_quantity", "quantity must be at least 1"));
    }

    let mut store = ctx.open_store()?;
    store.require_open_turn()?;
    let campaign = store.campaign_id().to_string();

    let stack = entities::find_item(
        store.conn(),
        &campaign,
        payload.owner_type,
        &payload.owner_id,
        &payload.item_name,
    )?;
    let Some(mut stack) = stack else {
        return Err(CommandError::with_details(
            "insufficient_inventory",
            json!({
                "message": format!("{} has no {}", payload.owner_id, payload.item_name),
                "item_name": payload.item_name,
                "requested": payload.quantity,
                "available": 0,
            }),
        ));
    };
    if stack.quantity < payload.quantity {
        return Err(CommandError::with_details(
            "insufficient_inventory",
            json!({
                "message": format!(
                    "{} has {} x{}, cannot consume {}",
                    payload.owner_id, stack.item_name, stack.quantity, payload.quantity
                ),
                "item_name": stack.item_name,
                "requested": payload.quantity,
                "available": stack.quantity,
            }),
        ));
    }

    stack.quantity -= payload.quantity;
    let remaining = stack.quantity;
    store.mutate("item consume", &ctx.raw_payload(), |conn| {
        if stack.quantity == 0 {
            entities::delete_item(conn, &campaign, &stack.id)
        } else {
            entities::upsert_item(conn, &campaign, &stack)
        }
    })?;
    Ok(json!({
        "item_name": payload.item_name,
        "consumed": payload.quantity,
        "remaining": remaining,
    }))
}
