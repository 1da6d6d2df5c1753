use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "campaign.db";
pub const EVENTS_FILE: &str = "events.ndjson";

/// On-disk addresses for one campaign: `<root>/campaigns/<id>/` holding the
/// database and the append log side by side.
#[derive(Clone, Debug)]
pub struct CampaignPaths {
    pub dir: PathBuf,
    pub db: PathBuf,
    pub events_log: PathBuf,
}

impl CampaignPaths {
    pub fn new(root: &Path, campaign_id: &str) -> Self {
        let dir = root.join("campaigns").join(campaign_id);
        let db = dir.join(DB_FILE);
        let events_log = dir.join(EVENTS_FILE);
        Self { dir, db, events_log }
    }

    pub fn exists(&self) -> bool {
        self.db.exists()
    }
}

/// Campaign ids present under the root, sorted.
pub fn list_campaign_ids(root: &Path) -> std::io::Result<Vec<String>> {
    let campaigns_dir = root.join("campaigns");
    let mut ids = Vec::new();
    if !campaigns_dir.exists() {
        return Ok(ids);
    }
    for entry in std::fs::read_dir(&campaigns_dir)? {
        let entry = entry?;
        if entry.path().join(DB_FILE).exists() {
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}
