// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown owner kind: {0}")]
    UnknownOwnerKind(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
