pub mod campaign;
pub mod clock;
pub mod item;
pub mod npc;
pub mod ooc;
pub mod quest;
pub mod relationship;
pub mod reward;
pub mod rumor;
pub mod secret;
pub mod spell;
pub mod state;
pub mod turn;
pub mod validate;

use crate::context::CommandError;
use chronicle_kernel::types::OwnerKind;
use chronicle_store::{entities, CampaignStore};

/// Shared guard: the referenced character must exist before a command may
/// stage anything against it.
pub(crate) fn require_owner(
    store: &CampaignStore,
    kind: OwnerKind,
    id: &str,
) -> Result<(), CommandError> {
    let exists = entities::owner_exists(store.conn(), store.campaign_id(), kind, id)?;
    if exists {
        Ok(())
    } else {
        Err(CommandError::with_details(
            "owner_not_found",
            serde_json::json!({
                "message": format!("{kind} {id} does not exist"),
                "owner_type": kind.as_str(),
                "owner_id": id,
            }),
        ))
    }
}

pub(crate) fn short_id(prefix: &str) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &nonce[..8])
}
