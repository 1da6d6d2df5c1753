use chronicle_store::{CampaignStore, StoreError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

/// Invocation context shared by every command handler: the state root, the
/// addressed campaign, the raw payload, and the verbosity flag.
pub struct Ctx {
    pub root: PathBuf,
    pub campaign: Option<String>,
    pub payload: Option<Value>,
    pub full: bool,
}

impl Ctx {
    pub fn new(root: PathBuf, campaign: Option<String>, payload: Option<Value>, full: bool) -> Self {
        Self { root, campaign, payload, full }
    }

    pub fn campaign_id(&self) -> Result<&str, CommandError> {
        self.campaign
            .as_deref()
            .ok_or_else(|| CommandError::new("missing_campaign", "--campaign is required"))
    }

    pub fn open_store(&self) -> Result<CampaignStore, CommandError> {
        Ok(CampaignStore::open(&self.root, self.campaign_id()?)?)
    }

    /// Deserializes the payload into the command's schema; shape problems are
    /// the caller's error, reported before anything is staged.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        let value = self.payload.clone().unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(value).map_err(|err| {
            CommandError::new("invalid_payload", &format!("payload does not match command schema: {err}"))
        })
    }

    pub fn raw_payload(&self) -> Value {
        self.payload.clone().unwrap_or_else(|| Value::Object(Default::default()))
    }
}

#[derive(Debug)]
pub struct CommandError {
    pub code: String,
    pub details: Value,
}

impl CommandError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            details: serde_json::json!({ "message": message }),
        }
    }

    pub fn with_details(code: &str, details: Value) -> Self {
        Self {
            code: code.to_string(),
            details,
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        Self {
            code: err.code().to_string(),
            details: serde_json::json!({ "message": err.to_string() }),
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::new("serialization_error", &err.to_string())
    }
}

pub type CmdResult = Result<Value, CommandError>;
