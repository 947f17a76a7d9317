use std::collections::BTreeMap;
use std::fs;

use chrono::Utc;
use serde_json::{json, Value};

use code_backup_core::contract::{
    BackupStateRecord, FunctionSnapshot, InvocationSummary, TargetOutcome,
};
use code_backup_core::decision::{decide, Decision, NO_PRIOR_FINGERPRINT};
use code_backup_core::event::{normalize_targets, parse_target_list};
use code_backup_core::storage_keys::{
    backup_object_key, default_state_prefix, state_object_key, DEFAULT_DEST_PREFIX,
};

use crate::adapters::artifact::ArtifactFetcher;
use crate::adapters::object_store::{BackupStore, StoreReadError};
use crate::adapters::registry::FunctionRegistry;

/// Process-wide configuration, read once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub destination_bucket: String,
    pub destination_prefix: String,
    pub state_prefix: String,
    pub fallback_targets: Vec<String>,
    pub fail_on_any_error: bool,
}

impl BackupConfig {
    pub fn from_env() -> Result<Self, String> {
        let destination_bucket = std::env::var("DEST_BUCKET")
            .map_err(|_| "DEST_BUCKET must be configured".to_string())?;
        let destination_prefix =
            std::env::var("DEST_PREFIX").unwrap_or_else(|_| DEFAULT_DEST_PREFIX.to_string());
        let state_prefix = std::env::var("STATE_PREFIX")
            .unwrap_or_else(|_| default_state_prefix(&destination_prefix));
        let fallback_targets =
            parse_target_list(&std::env::var("TARGET_FUNCTION").unwrap_or_default());
        let fail_on_any_error = std::env::var("FAIL_ON_ANY_ERROR")
            .map(|raw| parse_flag(&raw))
            .unwrap_or(false);

        Ok(Self {
            destination_bucket,
            destination_prefix,
            state_prefix,
            fallback_targets,
            fail_on_any_error,
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Remaining-time gate derived from the invocation deadline. Near the
/// deadline the handler stops starting new per-target work; it never aborts
/// a transfer already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    deadline_epoch_ms: Option<i64>,
}

impl TimeBudget {
    const START_MARGIN_MS: i64 = 10_000;

    pub fn unlimited() -> Self {
        Self {
            deadline_epoch_ms: None,
        }
    }

    pub fn with_deadline(deadline_epoch_ms: i64) -> Self {
        Self {
            deadline_epoch_ms: Some(deadline_epoch_ms),
        }
    }

    pub fn allows_new_work(&self) -> bool {
        match self.deadline_epoch_ms {
            None => true,
            Some(deadline) => Utc::now().timestamp_millis() + Self::START_MARGIN_MS < deadline,
        }
    }
}

/// Invocation-level failure, surfaced to the platform so its retry and
/// alerting paths fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationFailure {
    pub message: String,
}

impl InvocationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn handle_backup_event(
    event: &Value,
    config: &BackupConfig,
    budget: &TimeBudget,
    registry: &dyn FunctionRegistry,
    store: &dyn BackupStore,
    fetcher: &dyn ArtifactFetcher,
) -> Result<InvocationSummary, InvocationFailure> {
    let targets = normalize_targets(event, &config.fallback_targets).map_err(|error| {
        log_error("malformed_event", json!({ "message": error.message() }));
        InvocationFailure::new(error.message())
    })?;

    store.ensure_versioning().map_err(|error| {
        log_error(
            "bucket_versioning_check_failed",
            json!({ "bucket": config.destination_bucket, "error": error }),
        );
        InvocationFailure::new(format!(
            "cannot verify versioning on {}: {error}",
            config.destination_bucket
        ))
    })?;

    let mut results = Vec::with_capacity(targets.len());
    for function_name in &targets {
        let outcome = if budget.allows_new_work() {
            process_function(function_name, config, registry, store, fetcher)
        } else {
            TargetOutcome::failed(
                function_name,
                "invocation time budget exhausted before processing",
            )
        };
        log_outcome(&outcome);
        results.push(outcome);
    }

    let summary = InvocationSummary { results };
    if summary.all_failed() {
        log_error("invocation_failed", json!({ "summary": &summary }));
        return Err(InvocationFailure::new(format!(
            "all {} target functions failed",
            summary.results.len()
        )));
    }
    if config.fail_on_any_error && summary.failed_count() > 0 {
        log_error("invocation_failed_by_policy", json!({ "summary": &summary }));
        return Err(InvocationFailure::new(format!(
            "{} of {} target functions failed",
            summary.failed_count(),
            summary.results.len()
        )));
    }

    log_info("invocation_completed", json!({ "summary": &summary }));
    Ok(summary)
}

fn process_function(
    function_name: &str,
    config: &BackupConfig,
    registry: &dyn FunctionRegistry,
    store: &dyn BackupStore,
    fetcher: &dyn ArtifactFetcher,
) -> TargetOutcome {
    let snapshot = match registry.describe_function(function_name) {
        Ok(snapshot) => snapshot,
        Err(error) => return TargetOutcome::failed(function_name, error.to_string()),
    };

    if snapshot.code_sha256.is_empty() || snapshot.code_location.is_empty() {
        return TargetOutcome::failed(
            function_name,
            "registry response missing code fingerprint or fetch location",
        );
    }

    let state_key = state_object_key(&config.state_prefix, function_name);
    let prior = match read_prior_state(store, &state_key, function_name) {
        Ok(prior) => prior,
        Err(message) => return TargetOutcome::failed(function_name, message),
    };

    let prior_fingerprint = prior
        .as_ref()
        .map(|record| record.code_sha256.as_str())
        .unwrap_or(NO_PRIOR_FINGERPRINT);
    if decide(prior_fingerprint, &snapshot.code_sha256) == Decision::Skip {
        return TargetOutcome::skipped(function_name, &snapshot.code_sha256);
    }

    let backup_key = backup_object_key(&config.destination_prefix, function_name);
    let staged = match fetcher.fetch_to_disk(&snapshot.code_location) {
        Ok(staged) => staged,
        Err(message) => {
            return TargetOutcome::failed(
                function_name,
                format!("artifact transfer failed: {message}"),
            )
        }
    };

    let put_result = store.write_object_from_path(
        &backup_key,
        &staged.path,
        "application/zip",
        &artifact_metadata(&snapshot),
    );
    let _ = fs::remove_file(&staged.path);

    let version_id = match put_result {
        Ok(Some(version_id)) => version_id,
        Ok(None) => {
            log_warn(
                "missing_version_id",
                json!({ "function": function_name, "key": backup_key }),
            );
            String::new()
        }
        Err(message) => {
            return TargetOutcome::failed(
                function_name,
                format!("artifact transfer failed: {message}"),
            )
        }
    };

    let record = BackupStateRecord {
        code_sha256: snapshot.code_sha256.clone(),
        s3_version_id: version_id.clone(),
        last_backup_at: Utc::now().to_rfc3339(),
        last_modified: snapshot.last_modified.clone(),
        function_arn: snapshot.function_arn.clone(),
    };
    let body = serde_json::to_vec(&record).expect("state record should serialize");
    if let Err(error) = store.write_object(&state_key, &body, "application/json") {
        log_warn(
            "state_write_inconsistency",
            json!({
                "function": function_name,
                "key": state_key,
                "stored_version_id": version_id,
                "error": error,
            }),
        );
        return TargetOutcome::failed(
            function_name,
            format!("state record write failed after backup of version {version_id}: {error}"),
        );
    }

    TargetOutcome::backed_up(function_name, &snapshot.code_sha256, &backup_key, &version_id)
}

/// Read the prior backup state record. Missing, inaccessible, and malformed
/// records all degrade to "no prior backup" so a permission gap or corrupt
/// record leads to a redundant backup, never a silently skipped one. Each
/// cause gets its own log line. Any other read failure fails the target.
fn read_prior_state(
    store: &dyn BackupStore,
    state_key: &str,
    function_name: &str,
) -> Result<Option<BackupStateRecord>, String> {
    match store.read_object(state_key) {
        Ok(body) => match serde_json::from_slice::<BackupStateRecord>(&body) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                log_warn(
                    "state_record_malformed",
                    json!({
                        "function": function_name,
                        "key": state_key,
                        "error": error.to_string(),
                    }),
                );
                Ok(None)
            }
        },
        Err(StoreReadError::NotFound) => {
            log_info(
                "state_record_missing",
                json!({ "function": function_name, "key": state_key }),
            );
            Ok(None)
        }
        Err(StoreReadError::AccessDenied(message)) => {
            log_warn(
                "state_record_inaccessible",
                json!({ "function": function_name, "key": state_key, "error": message }),
            );
            Ok(None)
        }
        Err(StoreReadError::Other(message)) => {
            Err(format!("state record read failed: {message}"))
        }
    }
}

fn artifact_metadata(snapshot: &FunctionSnapshot) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "function_arn".to_string(),
            snapshot.function_arn.clone().unwrap_or_default(),
        ),
        (
            "lambda_version".to_string(),
            snapshot.version.clone().unwrap_or_default(),
        ),
        (
            "last_modified".to_string(),
            snapshot.last_modified.clone().unwrap_or_default(),
        ),
        ("code_sha256".to_string(), snapshot.code_sha256.clone()),
    ])
}

fn log_outcome(outcome: &TargetOutcome) {
    if outcome.is_failure() {
        log_error("function_failed", json!(outcome));
    } else if outcome.version_id.is_some() {
        log_info("function_backed_up", json!(outcome));
    } else {
        log_info("function_skipped", json!(outcome));
    }
}

fn log_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "backup_handler",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_warn(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "backup_handler",
            "level": "warning",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "backup_handler",
            "level": "error",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
