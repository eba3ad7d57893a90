//! Shared domain types for the verdant alerting core.
//!
//! Everything that crosses a crate boundary lives here: sensor readings,
//! severities, escalation levels, evaluator verdicts, and the formatted
//! alert message handed to notification channels.

pub mod id;
pub mod types;
