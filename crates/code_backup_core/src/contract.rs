use serde::{Deserialize, Serialize};

pub const OUTCOME_BACKED_UP: &str = "backed-up";
pub const OUTCOME_SKIPPED: &str = "skipped";
pub const OUTCOME_FAILED: &str = "failed";

/// Current state of a target function as reported by the function registry.
///
/// Produced fresh on every invocation and never persisted. `code_location` is
/// a short-lived presigned URL; it must not be logged or stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSnapshot {
    pub function_name: String,
    pub function_arn: Option<String>,
    pub version: Option<String>,
    pub last_modified: Option<String>,
    pub code_sha256: String,
    pub code_location: String,
    pub code_size: Option<i64>,
}

/// Persisted per-function record tracking the last successful backup.
///
/// One record per function, overwritten on every successful backup. Absent on
/// first run, which is treated as "no prior backup" rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupStateRecord {
    #[serde(rename = "codeSha256")]
    pub code_sha256: String,
    #[serde(rename = "s3VersionId")]
    pub s3_version_id: String,
    #[serde(rename = "lastBackupAt")]
    pub last_backup_at: String,
    #[serde(
        rename = "lastModified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<String>,
    #[serde(
        rename = "functionArn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub function_arn: Option<String>,
}

/// Per-function result entry within one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetOutcome {
    pub function: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TargetOutcome {
    pub fn backed_up(
        function: impl Into<String>,
        code_sha256: impl Into<String>,
        backup_key: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            function: function.into(),
            status: OUTCOME_BACKED_UP.to_string(),
            version_id: Some(version_id.into()),
            backup_key: Some(backup_key.into()),
            code_sha256: Some(code_sha256.into()),
            reason: None,
        }
    }

    pub fn skipped(function: impl Into<String>, code_sha256: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            status: OUTCOME_SKIPPED.to_string(),
            version_id: None,
            backup_key: None,
            code_sha256: Some(code_sha256.into()),
            reason: None,
        }
    }

    pub fn failed(function: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            status: OUTCOME_FAILED.to_string(),
            version_id: None,
            backup_key: None,
            code_sha256: None,
            reason: Some(reason.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == OUTCOME_FAILED
    }
}

/// Aggregate response body for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationSummary {
    pub results: Vec<TargetOutcome>,
}

impl InvocationSummary {
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|outcome| outcome.is_failure())
            .count()
    }

    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.failed_count() == self.results.len()
    }
}
