//! AWS-oriented adapters and handlers for function code backups.
//!
//! This crate owns runtime integration details (the Lambda handler, registry
//! and object-store adapters, artifact staging) around the deterministic
//! primitives in `code_backup_core`.

pub mod adapters;
pub mod handlers;
