//! Per-item results and operator diagnostics produced by a batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Message returned for an item whose store call faulted. Store details
/// never reach the client.
pub const INTERNAL_ERROR: &str = "Internal server error";

// ------------------------------------------------------------------ //
//  Field defects                                                      //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectKind {
    /// Field absent or empty.
    Required,
    /// Field present but malformed.
    Validity,
}

/// One rejected field of one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefect {
    /// Path of the field, e.g. `songs[3].tempo`.
    pub param: String,
    /// Offending raw value, omitted when the field was absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "type")]
    pub kind: DefectKind,
}

impl FieldDefect {
    pub fn required(param: impl Into<String>, value: Option<&Value>) -> Self {
        Self {
            param: param.into(),
            value: value.cloned(),
            kind: DefectKind::Required,
        }
    }

    pub fn validity(param: impl Into<String>, value: Option<&Value>) -> Self {
        Self {
            param: param.into(),
            value: value.cloned(),
            kind: DefectKind::Validity,
        }
    }
}

// ------------------------------------------------------------------ //
//  Item outcomes                                                      //
// ------------------------------------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

/// Result for exactly one input record, aligned with its input position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldDefect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemOutcome {
    pub fn succeeded() -> Self {
        Self {
            status: ItemStatus::Succeeded,
            errors: Vec::new(),
            message: None,
        }
    }

    pub fn invalid(errors: Vec<FieldDefect>) -> Self {
        Self {
            status: ItemStatus::Failed,
            errors,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Failed,
            errors: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }
}

// ------------------------------------------------------------------ //
//  Fault diagnostics                                                  //
// ------------------------------------------------------------------ //

/// Pipeline step during which the store faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultStage {
    Resolve,
    Persist,
}

impl FaultStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultStage::Resolve => "resolve",
            FaultStage::Persist => "persist",
        }
    }
}

impl std::fmt::Display for FaultStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbatim store failure, for operators only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultDiagnostic {
    pub batch_id: Uuid,
    pub operation: String,
    pub index: usize,
    pub stage: FaultStage,
    pub detail: String,
}

/// Everything a finished batch hands to its caller.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub outcomes: Vec<ItemOutcome>,
    pub faults: Vec<FaultDiagnostic>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
