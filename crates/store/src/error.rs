use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no open turn for campaign {0}")]
    NoOpenTurn(String),

    #[error("turn {turn_number} is already open for campaign {campaign_id}")]
    TurnAlreadyOpen {
        campaign_id: String,
        turn_number: i64,
    },

    #[error("campaign {0} already exists")]
    CampaignExists(String),

    #[error("campaign {0} not found")]
    CampaignNotFound(String),

    #[error("nothing to undo for campaign {0}: latest turn is already rolled back or absent")]
    NothingToUndo(String),

    /// The turn is committed in the database but the mirror write failed;
    /// `validate` will report the parity break until `repair_events` runs.
    #[error("append log write failed after commit of turn {turn_number}: {source}")]
    AppendLogWrite {
        turn_number: i64,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Kernel(#[from] chronicle_kernel::KernelError),
}

impl StoreError {
    /// Stable machine-readable code for the CLI envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NoOpenTurn(_) => "no_open_turn",
            StoreError::TurnAlreadyOpen { .. } => "turn_already_open",
            StoreError::CampaignExists(_) => "campaign_exists",
            StoreError::CampaignNotFound(_) => "campaign_not_found",
            StoreError::NothingToUndo(_) => "nothing_to_undo",
            StoreError::AppendLogWrite { .. } => "append_log_write_failed",
            StoreError::Sql(_)
            | StoreError::Io(_)
            | StoreError::Json(_)
            | StoreError::Kernel(_) => "storage_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
