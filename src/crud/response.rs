//! Result envelope returned by every public engine operation

use serde::{Deserialize, Serialize};

use crate::error::{CrudError, CrudResult, ResCode};
use crate::models::{Record, TaskType};
use crate::query::Filter;

/// Uniform `{code, message, value}` outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub code: ResCode,
    pub message: String,
    #[serde(default)]
    pub value: ResponseValue,
}

/// Typed payload of an envelope
///
/// Serialized without a tag: `null`, a bare count, or the result object, so
/// read stats sit at `value.stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    #[default]
    None,
    /// Rows written by the audit recorder
    Count(u64),
    Records(GetResult),
    Write(WriteResult),
}

/// Pagination and criteria reported with a read page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStats {
    pub skip: u64,
    pub limit: u64,
    pub records_count: u64,
    pub total_records_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub record_ids: Vec<String>,
}

/// Payload of a successful read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResult {
    /// Records in external naming
    pub records: Vec<Record>,
    pub stats: GetStats,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_res: Option<Box<ResponseMessage>>,
}

/// Payload of a successful create, update or delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    /// Created ids, or the ids the task targeted
    pub record_ids: Vec<String>,
    /// Rows affected
    pub records_count: u64,
    /// Records skipped by a best-effort batch update
    #[serde(default)]
    pub skipped_count: u64,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_res: Option<Box<ResponseMessage>>,
}

impl WriteResult {
    pub fn new(task_type: TaskType, record_ids: Vec<String>, records_count: u64) -> Self {
        Self {
            record_ids,
            records_count,
            skipped_count: 0,
            task_type,
            log_res: None,
        }
    }
}

impl ResponseMessage {
    pub fn success(message: impl Into<String>, value: ResponseValue) -> Self {
        Self {
            code: ResCode::Success,
            message: message.into(),
            value,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// The error equivalent to a failing status; `None` on success
    pub fn error(&self) -> Option<CrudError> {
        CrudError::from_code(self.code, self.message.clone())
    }

    pub fn into_result(self) -> CrudResult<ResponseValue> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }

    /// Audit sub-result attached to a read or write payload
    pub fn log_res(&self) -> Option<&ResponseMessage> {
        match &self.value {
            ResponseValue::Records(get) => get.log_res.as_deref(),
            ResponseValue::Write(write) => write.log_res.as_deref(),
            _ => None,
        }
    }

    /// Rows affected by a write, or records returned by a read
    pub fn count(&self) -> Option<u64> {
        match &self.value {
            ResponseValue::None => None,
            ResponseValue::Count(n) => Some(*n),
            ResponseValue::Records(get) => Some(get.stats.records_count),
            ResponseValue::Write(write) => Some(write.records_count),
        }
    }
}

impl From<CrudError> for ResponseMessage {
    fn from(err: CrudError) -> Self {
        Self {
            code: err.code(),
            message: err.message().to_string(),
            value: ResponseValue::None,
        }
    }
}
