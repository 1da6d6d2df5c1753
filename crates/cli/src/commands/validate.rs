//! Campaign health checks across one campaign or the whole root.
//!
//! Never aborts early: every campaign is checked and every report is
//! returned, whether the overall call passes or fails.

use crate::context::{CmdResult, CommandError, Ctx};
use chronicle_store::paths::list_campaign_ids;
use chronicle_store::{validate_campaign, CampaignStore};
use serde_json::json;

pub fn run(ctx: &Ctx) -> CmdResult {
    let campaign_ids = match &ctx.campaign {
        Some(id) => vec![id.clone()],
        None => list_campaign_ids(&ctx.root).map_err(chronicle_store::StoreError::from)?,
    };

    let mut results = Vec::new();
    let mut all_ok = true;
    for campaign_id in &campaign_ids {
        let store = CampaignStore::open(&ctx.root, campaign_id)?;
        let report = validate_campaign(&store)?;
        all_ok &= report.ok;
        results.push(report);
    }

    let data = json!({
        "validated_campaigns": results.len(),
        "results": results,
    });
    if all_ok {
        Ok(data)
    } else {
        Err(CommandError::with_details("validation_failed", data))
    }
}
