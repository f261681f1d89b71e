use stockrec_core::{ConfigError, IngestError, ParseError};
use stockrec_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::NotFound(_) => 3,
            Self::Ingest(IngestError::Fetch(_)) => 4,
            Self::Ingest(IngestError::Lookup { .. }) => 5,
            Self::Parse(_) => 6,
            Self::Warehouse(_) => 5,
            Self::Serialization(_) => 7,
            Self::Io(_) => 10,
        }
    }
}
