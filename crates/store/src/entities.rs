//! Row-level access to the entity tables.
//!
//! Free functions over `&Connection` so they compose with an open
//! transaction (rusqlite's `Transaction` derefs to `Connection`). Domain
//! validation does not live here; callers decide what a legal write is.

use crate::error::Result;
use chronicle_kernel::types::{
    ActiveSpell, Clock, ItemStack, Location, Npc, Objective, OwnerKind, PlayerCharacter, Quest,
    Relationship, RewardEvent, Rumor, Secret, WorldState,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

// --- locations ---

pub fn upsert_location(conn: &Connection, campaign_id: &str, location: &Location) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO locations (campaign_id, id, name, region)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(campaign_id, id) DO UPDATE SET name = excluded.name, region = excluded.region
        "#,
        params![campaign_id, location.id, location.name, location.region],
    )?;
    Ok(())
}

pub fn get_location(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<Location>> {
    Ok(conn
        .query_row(
            "SELECT id, name, region FROM locations WHERE campaign_id = ?1 AND id = ?2",
            params![campaign_id, id],
            location_from_row,
        )
        .optional()?)
}

pub fn list_locations(conn: &Connection, campaign_id: &str) -> Result<Vec<Location>> {
    let mut stmt =
        conn.prepare("SELECT id, name, region FROM locations WHERE campaign_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![campaign_id], location_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
    })
}

// --- player characters ---

pub fn upsert_pc(conn: &Connection, campaign_id: &str, pc: &PlayerCharacter) -> Result<()> {
    let slots = serde_json::to_string(&pc.spell_slots)?;
    conn.execute(
        r#"
        INSERT INTO player_characters
          (campaign_id, id, name, char_class, level, max_hp, current_hp, ac,
           location_id, initiative_mod, xp_total, currency_cp, spell_slots_json)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          name = excluded.name,
          char_class = excluded.char_class,
          level = excluded.level,
          max_hp = excluded.max_hp,
          current_hp = excluded.current_hp,
          ac = excluded.ac,
          location_id = excluded.location_id,
          initiative_mod = excluded.initiative_mod,
          xp_total = excluded.xp_total,
          currency_cp = excluded.currency_cp,
          spell_slots_json = excluded.spell_slots_json
        "#,
        params![
            campaign_id,
            pc.id,
            pc.name,
            pc.char_class,
            pc.level,
            pc.max_hp,
            pc.current_hp,
            pc.ac,
            pc.location_id,
            pc.initiative_mod,
            pc.xp_total,
            pc.currency_cp,
            slots
        ],
    )?;
    Ok(())
}

pub fn get_pc(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<PlayerCharacter>> {
    let row = conn
        .query_row(
            &format!("{PC_SELECT} WHERE campaign_id = ?1 AND id = ?2"),
            params![campaign_id, id],
            pc_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn list_pcs(conn: &Connection, campaign_id: &str) -> Result<Vec<PlayerCharacter>> {
    let mut stmt = conn.prepare(&format!("{PC_SELECT} WHERE campaign_id = ?1 ORDER BY id"))?;
    let rows = stmt.query_map(params![campaign_id], pc_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

const PC_SELECT: &str = r#"
    SELECT id, name, char_class, level, max_hp, current_hp, ac,
           location_id, initiative_mod, xp_total, currency_cp, spell_slots_json
    FROM player_characters
"#;

fn pc_from_row(row: &Row<'_>) -> rusqlite::Result<PlayerCharacter> {
    let slots_json: String = row.get(11)?;
    Ok(PlayerCharacter {
        id: row.get(0)?,
        name: row.get(1)?,
        char_class: row.get(2)?,
        level: row.get(3)?,
        max_hp: row.get(4)?,
        current_hp: row.get(5)?,
        ac: row.get(6)?,
        location_id: row.get(7)?,
        initiative_mod: row.get(8)?,
        xp_total: row.get(9)?,
        currency_cp: row.get(10)?,
        spell_slots: serde_json::from_str(&slots_json).unwrap_or_default(),
    })
}

// --- npcs ---

pub fn upsert_npc(conn: &Connection, campaign_id: &str, npc: &Npc) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO npcs
          (campaign_id, id, name, location_id, max_hp, current_hp, ac,
           initiative_mod, trust, fear, debt, reputation)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          name = excluded.name,
          location_id = excluded.location_id,
          max_hp = excluded.max_hp,
          current_hp = excluded.current_hp,
          ac = excluded.ac,
          initiative_mod = excluded.initiative_mod,
          trust = excluded.trust,
          fear = excluded.fear,
          debt = excluded.debt,
          reputation = excluded.reputation
        "#,
        params![
            campaign_id,
            npc.id,
            npc.name,
            npc.location_id,
            npc.max_hp,
            npc.current_hp,
            npc.ac,
            npc.initiative_mod,
            npc.trust,
            npc.fear,
            npc.debt,
            npc.reputation
        ],
    )?;
    Ok(())
}

pub fn get_npc(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<Npc>> {
    Ok(conn
        .query_row(
            &format!("{NPC_SELECT} WHERE campaign_id = ?1 AND id = ?2"),
            params![campaign_id, id],
            npc_from_row,
        )
        .optional()?)
}

pub fn list_npcs(conn: &Connection, campaign_id: &str) -> Result<Vec<Npc>> {
    let mut stmt = conn.prepare(&format!("{NPC_SELECT} WHERE campaign_id = ?1 ORDER BY id"))?;
    let rows = stmt.query_map(params![campaign_id], npc_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

const NPC_SELECT: &str = r#"
    SELECT id, name, location_id, max_hp, current_hp, ac,
           initiative_mod, trust, fear, debt, reputation
    FROM npcs
"#;

fn npc_from_row(row: &Row<'_>) -> rusqlite::Result<Npc> {
    Ok(Npc {
        id: row.get(0)?,
        name: row.get(1)?,
        location_id: row.get(2)?,
        max_hp: row.get(3)?,
        current_hp: row.get(4)?,
        ac: row.get(5)?,
        initiative_mod: row.get(6)?,
        trust: row.get(7)?,
        fear: row.get(8)?,
        debt: row.get(9)?,
        reputation: row.get(10)?,
    })
}

pub fn owner_exists(
    conn: &Connection,
    campaign_id: &str,
    kind: OwnerKind,
    id: &str,
) -> Result<bool> {
    let table = match kind {
        OwnerKind::Pc => "player_characters",
        OwnerKind::Npc => "npcs",
    };
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE campaign_id = ?1 AND id = ?2"),
            params![campaign_id, id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// --- world state ---

pub fn get_world_state(conn: &Connection, campaign_id: &str) -> Result<WorldState> {
    let row = conn
        .query_row(
            r#"
            SELECT world_date, world_time, weather, region, location_id, world_day_index, active_arc
            FROM world_state WHERE campaign_id = ?1
            "#,
            params![campaign_id],
            |row| {
                Ok(WorldState {
                    world_date: row.get(0)?,
                    world_time: row.get(1)?,
                    weather: row.get(2)?,
                    region: row.get(3)?,
                    location_id: row.get(4)?,
                    world_day_index: row.get(5)?,
                    active_arc: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(row.unwrap_or_default())
}

pub fn put_world_state(conn: &Connection, campaign_id: &str, world: &WorldState) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO world_state
          (campaign_id, world_date, world_time, weather, region, location_id, world_day_index, active_arc)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(campaign_id) DO UPDATE SET
          world_date = excluded.world_date,
          world_time = excluded.world_time,
          weather = excluded.weather,
          region = excluded.region,
          location_id = excluded.location_id,
          world_day_index = excluded.world_day_index,
          active_arc = excluded.active_arc
        "#,
        params![
            campaign_id,
            world.world_date,
            world.world_time,
            world.weather,
            world.region,
            world.location_id,
            world.world_day_index,
            world.active_arc
        ],
    )?;
    Ok(())
}

// --- inventory ---

pub fn upsert_item(conn: &Connection, campaign_id: &str, item: &ItemStack) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO inventory
          (campaign_id, id, owner_type, owner_id, item_name, quantity, consumable, stackable)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          owner_type = excluded.owner_type,
          owner_id = excluded.owner_id,
          item_name = excluded.item_name,
          quantity = excluded.quantity,
          consumable = excluded.consumable,
          stackable = excluded.stackable
        "#,
        params![
            campaign_id,
            item.id,
            item.owner_type.as_str(),
            item.owner_id,
            item.item_name,
            item.quantity,
            item.consumable as i64,
            item.stackable as i64
        ],
    )?;
    Ok(())
}

pub fn delete_item(conn: &Connection, campaign_id: &str, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM inventory WHERE campaign_id = ?1 AND id = ?2",
        params![campaign_id, id],
    )?;
    Ok(())
}

pub fn find_item(
    conn: &Connection,
    campaign_id: &str,
    owner_type: OwnerKind,
    owner_id: &str,
    item_name: &str,
) -> Result<Option<ItemStack>> {
    Ok(conn
        .query_row(
            &format!(
                "{ITEM_SELECT} WHERE campaign_id = ?1 AND owner_type = ?2 AND owner_id = ?3 AND item_name = ?4"
            ),
            params![campaign_id, owner_type.as_str(), owner_id, item_name],
            item_from_row,
        )
        .optional()?)
}

pub fn list_inventory(conn: &Connection, campaign_id: &str) -> Result<Vec<ItemStack>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT} WHERE campaign_id = ?1 ORDER BY id"))?;
    let rows = stmt.query_map(params![campaign_id], item_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

const ITEM_SELECT: &str = r#"
    SELECT id, owner_type, owner_id, item_name, quantity, consumable, stackable
    FROM inventory
"#;

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemStack> {
    let owner_type: String = row.get(1)?;
    Ok(ItemStack {
        id: row.get(0)?,
        owner_type: OwnerKind::parse(&owner_type).unwrap_or_default(),
        owner_id: row.get(2)?,
        item_name: row.get(3)?,
        quantity: row.get(4)?,
        consumable: row.get::<_, i64>(5)? != 0,
        stackable: row.get::<_, i64>(6)? != 0,
    })
}

// --- relationships ---

pub fn upsert_relationship(conn: &Connection, campaign_id: &str, rel: &Relationship) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO relationships
          (campaign_id, source_type, source_id, target_type, target_id, trust, fear, debt, reputation)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(campaign_id, source_type, source_id, target_type, target_id) DO UPDATE SET
          trust = excluded.trust,
          fear = excluded.fear,
          debt = excluded.debt,
          reputation = excluded.reputation
        "#,
        params![
            campaign_id,
            rel.source_type.as_str(),
            rel.source_id,
            rel.target_type.as_str(),
            rel.target_id,
            rel.trust,
            rel.fear,
            rel.debt,
            rel.reputation
        ],
    )?;
    Ok(())
}

pub fn get_relationship(
    conn: &Connection,
    campaign_id: &str,
    source_type: OwnerKind,
    source_id: &str,
    target_type: OwnerKind,
    target_id: &str,
) -> Result<Option<Relationship>> {
    Ok(conn
        .query_row(
            &format!(
                "{REL_SELECT} WHERE campaign_id = ?1 AND source_type = ?2 AND source_id = ?3
                 AND target_type = ?4 AND target_id = ?5"
            ),
            params![
                campaign_id,
                source_type.as_str(),
                source_id,
                target_type.as_str(),
                target_id
            ],
            relationship_from_row,
        )
        .optional()?)
}

pub fn list_relationships(conn: &Connection, campaign_id: &str) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "{REL_SELECT} WHERE campaign_id = ?1 ORDER BY source_type, source_id, target_type, target_id"
    ))?;
    let rows = stmt.query_map(params![campaign_id], relationship_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

const REL_SELECT: &str = r#"
    SELECT source_type, source_id, target_type, target_id, trust, fear, debt, reputation
    FROM relationships
"#;

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    let source_type: String = row.get(0)?;
    let target_type: String = row.get(2)?;
    Ok(Relationship {
        source_type: OwnerKind::parse(&source_type).unwrap_or_default(),
        source_id: row.get(1)?,
        target_type: OwnerKind::parse(&target_type).unwrap_or_default(),
        target_id: row.get(3)?,
        trust: row.get(4)?,
        fear: row.get(5)?,
        debt: row.get(6)?,
        reputation: row.get(7)?,
    })
}

// --- quests and objectives ---

pub fn upsert_quest(conn: &Connection, campaign_id: &str, quest: &Quest) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO quests (campaign_id, id, title, description, status, is_main_arc)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          title = excluded.title,
          description = excluded.description,
          status = excluded.status,
          is_main_arc = excluded.is_main_arc
        "#,
        params![
            campaign_id,
            quest.id,
            quest.title,
            quest.description,
            quest.status,
            quest.is_main_arc as i64
        ],
    )?;
    for objective in quest.objectives.values() {
        upsert_objective(conn, campaign_id, &quest.id, objective)?;
    }
    Ok(())
}

pub fn upsert_objective(
    conn: &Connection,
    campaign_id: &str,
    quest_id: &str,
    objective: &Objective,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO objectives (campaign_id, id, quest_id, description, status, order_index)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          description = excluded.description,
          status = excluded.status,
          order_index = excluded.order_index
        "#,
        params![
            campaign_id,
            objective.id,
            quest_id,
            objective.description,
            objective.status,
            objective.order_index
        ],
    )?;
    Ok(())
}

/// Which quest owns this objective id, if any. Objective ids are
/// campaign-scoped, so reuse across quests is a conflict the caller rejects.
pub fn objective_quest(conn: &Connection, campaign_id: &str, objective_id: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT quest_id FROM objectives WHERE campaign_id = ?1 AND id = ?2",
            params![campaign_id, objective_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn get_quest(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<Quest>> {
    let quest = conn
        .query_row(
            "SELECT id, title, description, status, is_main_arc FROM quests
             WHERE campaign_id = ?1 AND id = ?2",
            params![campaign_id, id],
            |row| {
                Ok(Quest {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    status: row.get(3)?,
                    is_main_arc: row.get::<_, i64>(4)? != 0,
                    objectives: BTreeMap::new(),
                })
            },
        )
        .optional()?;
    let Some(mut quest) = quest else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, description, status, order_index FROM objectives
         WHERE campaign_id = ?1 AND quest_id = ?2 ORDER BY order_index, id",
    )?;
    let rows = stmt.query_map(params![campaign_id, quest.id], |row| {
        Ok(Objective {
            id: row.get(0)?,
            description: row.get(1)?,
            status: row.get(2)?,
            order_index: row.get(3)?,
        })
    })?;
    for objective in rows {
        let objective = objective?;
        quest.objectives.insert(objective.id.clone(), objective);
    }
    Ok(Some(quest))
}

pub fn list_quests(conn: &Connection, campaign_id: &str) -> Result<Vec<Quest>> {
    let ids: Vec<String> = conn
        .prepare("SELECT id FROM quests WHERE campaign_id = ?1 ORDER BY id")?
        .query_map(params![campaign_id], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;
    let mut quests = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(quest) = get_quest(conn, campaign_id, &id)? {
            quests.push(quest);
        }
    }
    Ok(quests)
}

// --- rumors / secrets ---

pub fn upsert_rumor(conn: &Connection, campaign_id: &str, rumor: &Rumor) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO rumors (campaign_id, id, text, source, truth_status, spread_level, decay, revealed)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          text = excluded.text,
          source = excluded.source,
          truth_status = excluded.truth_status,
          spread_level = excluded.spread_level,
          decay = excluded.decay,
          revealed = excluded.revealed
        "#,
        params![
            campaign_id,
            rumor.id,
            rumor.text,
            rumor.source,
            rumor.truth_status,
            rumor.spread_level,
            rumor.decay,
            rumor.revealed as i64
        ],
    )?;
    Ok(())
}

pub fn get_rumor(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<Rumor>> {
    Ok(conn
        .query_row(
            "SELECT id, text, source, truth_status, spread_level, decay, revealed FROM rumors
             WHERE campaign_id = ?1 AND id = ?2",
            params![campaign_id, id],
            rumor_from_row,
        )
        .optional()?)
}

pub fn list_rumors(conn: &Connection, campaign_id: &str) -> Result<Vec<Rumor>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, source, truth_status, spread_level, decay, revealed FROM rumors
         WHERE campaign_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![campaign_id], rumor_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

fn rumor_from_row(row: &Row<'_>) -> rusqlite::Result<Rumor> {
    Ok(Rumor {
        id: row.get(0)?,
        text: row.get(1)?,
        source: row.get(2)?,
        truth_status: row.get(3)?,
        spread_level: row.get(4)?,
        decay: row.get(5)?,
        revealed: row.get::<_, i64>(6)? != 0,
    })
}

pub fn upsert_secret(conn: &Connection, campaign_id: &str, secret: &Secret) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO secrets (campaign_id, id, text, discovery_condition, associated_rumor_id, reveal_status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          text = excluded.text,
          discovery_condition = excluded.discovery_condition,
          associated_rumor_id = excluded.associated_rumor_id,
          reveal_status = excluded.reveal_status
        "#,
        params![
            campaign_id,
            secret.id,
            secret.text,
            secret.discovery_condition,
            secret.associated_rumor_id,
            secret.reveal_status
        ],
    )?;
    Ok(())
}

pub fn get_secret(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<Secret>> {
    Ok(conn
        .query_row(
            "SELECT id, text, discovery_condition, associated_rumor_id, reveal_status FROM secrets
             WHERE campaign_id = ?1 AND id = ?2",
            params![campaign_id, id],
            secret_from_row,
        )
        .optional()?)
}

pub fn list_secrets(conn: &Connection, campaign_id: &str) -> Result<Vec<Secret>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, discovery_condition, associated_rumor_id, reveal_status FROM secrets
         WHERE campaign_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![campaign_id], secret_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

fn secret_from_row(row: &Row<'_>) -> rusqlite::Result<Secret> {
    Ok(Secret {
        id: row.get(0)?,
        text: row.get(1)?,
        discovery_condition: row.get(2)?,
        associated_rumor_id: row.get(3)?,
        reveal_status: row.get(4)?,
    })
}

// --- clocks ---

pub fn upsert_clock(conn: &Connection, campaign_id: &str, clock: &Clock) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO clocks (campaign_id, name, segments, max_segments)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(campaign_id, name) DO UPDATE SET
          segments = excluded.segments,
          max_segments = excluded.max_segments
        "#,
        params![campaign_id, clock.name, clock.segments, clock.max_segments],
    )?;
    Ok(())
}

pub fn get_clock(conn: &Connection, campaign_id: &str, name: &str) -> Result<Option<Clock>> {
    Ok(conn
        .query_row(
            "SELECT name, segments, max_segments FROM clocks WHERE campaign_id = ?1 AND name = ?2",
            params![campaign_id, name],
            clock_from_row,
        )
        .optional()?)
}

pub fn list_clocks(conn: &Connection, campaign_id: &str) -> Result<Vec<Clock>> {
    let mut stmt = conn.prepare(
        "SELECT name, segments, max_segments FROM clocks WHERE campaign_id = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![campaign_id], clock_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

fn clock_from_row(row: &Row<'_>) -> rusqlite::Result<Clock> {
    Ok(Clock {
        name: row.get(0)?,
        segments: row.get(1)?,
        max_segments: row.get(2)?,
    })
}

// --- active spells ---

pub fn upsert_spell(conn: &Connection, campaign_id: &str, spell: &ActiveSpell) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO active_spells
          (campaign_id, id, caster_type, caster_id, spell_name, remaining_rounds, requires_concentration, active)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          caster_type = excluded.caster_type,
          caster_id = excluded.caster_id,
          spell_name = excluded.spell_name,
          remaining_rounds = excluded.remaining_rounds,
          requires_concentration = excluded.requires_concentration,
          active = excluded.active
        "#,
        params![
            campaign_id,
            spell.id,
            spell.caster_type.as_str(),
            spell.caster_id,
            spell.spell_name,
            spell.remaining_rounds,
            spell.requires_concentration as i64,
            spell.active as i64
        ],
    )?;
    Ok(())
}

pub fn get_spell(conn: &Connection, campaign_id: &str, id: &str) -> Result<Option<ActiveSpell>> {
    Ok(conn
        .query_row(
            &format!("{SPELL_SELECT} WHERE campaign_id = ?1 AND id = ?2"),
            params![campaign_id, id],
            spell_from_row,
        )
        .optional()?)
}

pub fn list_spells(conn: &Connection, campaign_id: &str) -> Result<Vec<ActiveSpell>> {
    let mut stmt = conn.prepare(&format!("{SPELL_SELECT} WHERE campaign_id = ?1 ORDER BY id"))?;
    let rows = stmt.query_map(params![campaign_id], spell_from_row)?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}

const SPELL_SELECT: &str = r#"
    SELECT id, caster_type, caster_id, spell_name, remaining_rounds, requires_concentration, active
    FROM active_spells
"#;

fn spell_from_row(row: &Row<'_>) -> rusqlite::Result<ActiveSpell> {
    let caster_type: String = row.get(1)?;
    Ok(ActiveSpell {
        id: row.get(0)?,
        caster_type: OwnerKind::parse(&caster_type).unwrap_or_default(),
        caster_id: row.get(2)?,
        spell_name: row.get(3)?,
        remaining_rounds: row.get(4)?,
        requires_concentration: row.get::<_, i64>(5)? != 0,
        active: row.get::<_, i64>(6)? != 0,
    })
}

// --- rewards ---

pub fn insert_reward(conn: &Connection, campaign_id: &str, reward: &RewardEvent) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO reward_events
          (campaign_id, id, turn_number, recipient_type, recipient_id, reward_json, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(campaign_id, id) DO UPDATE SET
          turn_number = excluded.turn_number,
          recipient_type = excluded.recipient_type,
          recipient_id = excluded.recipient_id,
          reward_json = excluded.reward_json,
          created_at = excluded.created_at
        "#,
        params![
            campaign_id,
            reward.id,
            reward.turn_number,
            reward.recipient_type.as_str(),
            reward.recipient_id,
            serde_json::to_string(&reward.reward)?,
            reward.created_at
        ],
    )?;
    Ok(())
}

pub fn list_rewards(conn: &Connection, campaign_id: &str) -> Result<Vec<RewardEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, turn_number, recipient_type, recipient_id, reward_json, created_at
         FROM reward_events WHERE campaign_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![campaign_id], |row| {
        let recipient_type: String = row.get(2)?;
        let reward_json: String = row.get(4)?;
        Ok(RewardEvent {
            id: row.get(0)?,
            turn_number: row.get(1)?,
            recipient_type: OwnerKind::parse(&recipient_type).unwrap_or_default(),
            recipient_id: row.get(3)?,
            reward: serde_json::from_str(&reward_json).unwrap_or(serde_json::Value::Null),
            created_at: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<_, _>>()?)
}
