//! Custom error types for crud-audit
//!
//! This module defines the error hierarchy for the engine using thiserror.
//! Every variant corresponds to exactly one [`ResCode`], so a failing result
//! envelope and its error value always agree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status code carried by every result envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResCode {
    Success,
    ParamsError,
    SaveError,
    ReadError,
    InsertError,
    UpdateError,
    DeleteError,
    LogError,
    MappingError,
    Unauthorized,
    ConfigError,
    IoError,
}

impl ResCode {
    /// Whether this code describes a successful outcome
    pub fn is_success(self) -> bool {
        matches!(self, ResCode::Success)
    }
}

impl std::fmt::Display for ResCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResCode::Success => "success",
            ResCode::ParamsError => "paramsError",
            ResCode::SaveError => "saveError",
            ResCode::ReadError => "readError",
            ResCode::InsertError => "insertError",
            ResCode::UpdateError => "updateError",
            ResCode::DeleteError => "deleteError",
            ResCode::LogError => "logError",
            ResCode::MappingError => "mappingError",
            ResCode::Unauthorized => "unauthorized",
            ResCode::ConfigError => "configError",
            ResCode::IoError => "ioError",
        };
        write!(f, "{}", name)
    }
}

/// The main error type for crud-audit operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrudError {
    /// Missing or invalid caller input
    #[error("Params error: {0}")]
    Params(String),

    /// Ambiguous or unsupported save shape
    #[error("Save error: {0}")]
    Save(String),

    /// Storage collaborator rejected a select/count
    #[error("Read error: {0}")]
    Read(String),

    /// Storage collaborator rejected an insert
    #[error("Insert error: {0}")]
    Insert(String),

    /// Storage collaborator rejected an update
    #[error("Update error: {0}")]
    Update(String),

    /// Storage collaborator rejected a delete
    #[error("Delete error: {0}")]
    Delete(String),

    /// Audit persistence failed
    #[error("Log error: {0}")]
    Log(String),

    /// A structured record was required but something else was supplied
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// The access gate denied the task
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl CrudError {
    /// The envelope status code for this error
    pub fn code(&self) -> ResCode {
        match self {
            Self::Params(_) => ResCode::ParamsError,
            Self::Save(_) => ResCode::SaveError,
            Self::Read(_) => ResCode::ReadError,
            Self::Insert(_) => ResCode::InsertError,
            Self::Update(_) => ResCode::UpdateError,
            Self::Delete(_) => ResCode::DeleteError,
            Self::Log(_) => ResCode::LogError,
            Self::Mapping(_) => ResCode::MappingError,
            Self::Unauthorized(_) => ResCode::Unauthorized,
            Self::Config(_) => ResCode::ConfigError,
            Self::Io(_) => ResCode::IoError,
        }
    }

    /// The bare message, without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Params(m)
            | Self::Save(m)
            | Self::Read(m)
            | Self::Insert(m)
            | Self::Update(m)
            | Self::Delete(m)
            | Self::Log(m)
            | Self::Mapping(m)
            | Self::Unauthorized(m)
            | Self::Config(m)
            | Self::Io(m) => m,
        }
    }

    /// Rebuild the error described by a failing status code
    ///
    /// Returns `None` for [`ResCode::Success`].
    pub fn from_code(code: ResCode, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        let err = match code {
            ResCode::Success => return None,
            ResCode::ParamsError => Self::Params(message),
            ResCode::SaveError => Self::Save(message),
            ResCode::ReadError => Self::Read(message),
            ResCode::InsertError => Self::Insert(message),
            ResCode::UpdateError => Self::Update(message),
            ResCode::DeleteError => Self::Delete(message),
            ResCode::LogError => Self::Log(message),
            ResCode::MappingError => Self::Mapping(message),
            ResCode::Unauthorized => Self::Unauthorized(message),
            ResCode::ConfigError => Self::Config(message),
            ResCode::IoError => Self::Io(message),
        };
        Some(err)
    }

    /// Check if this is a params error
    pub fn is_params(&self) -> bool {
        matches!(self, Self::Params(_))
    }
}

impl From<std::io::Error> for CrudError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CrudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Mapping(err.to_string())
    }
}

/// Result type alias for crud-audit operations
pub type CrudResult<T> = Result<T, CrudError>;
