pub const DEFAULT_DEST_PREFIX: &str = "lambda-code-backups";

/// Stable backup object key. Derived from the function name only, never from
/// a fingerprint or timestamp: overwriting the same key is what makes the
/// store's version history accumulate.
pub fn backup_object_key(dest_prefix: &str, function_name: &str) -> String {
    format!("{}/{function_name}.zip", dest_prefix.trim_matches('/'))
}

/// Key of the per-function backup state record.
pub fn state_object_key(state_prefix: &str, function_name: &str) -> String {
    format!("{}/{function_name}.json", state_prefix.trim_matches('/'))
}

pub fn default_state_prefix(dest_prefix: &str) -> String {
    format!("{}/.state", dest_prefix.trim_matches('/'))
}
