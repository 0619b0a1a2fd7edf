use thiserror::Error;
use tickdex_core::{CoreError, StoreError, ValidationError, WarehouseError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {}", .0.code(), .0)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Core(error) => match error {
                CoreError::Validation(_)
                | CoreError::Config(_)
                | CoreError::InvalidDivisor { .. } => 2,
                CoreError::StoreUnavailable { .. } => 3,
                CoreError::TagNotFound { .. } | CoreError::EntryNotFound { .. } => 4,
                CoreError::NoDataInWindow { .. }
                | CoreError::UnknownInstrument { .. }
                | CoreError::NoConstituents { .. } => 5,
                CoreError::Io(_) => 10,
            },
            Self::Validation(_) | Self::Warehouse(WarehouseError::Rejected(_)) => 2,
            Self::Store(StoreError::Unavailable(_)) | Self::Warehouse(_) => 3,
            Self::Store(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
