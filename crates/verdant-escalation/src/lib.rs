//! Per-rule alert lifecycle state machine.
//!
//! The [`engine::EscalationEngine`] owns one [`state::AlertState`] per
//! rule and advances it through the escalation ladder
//! (`preventive -> warning -> critical -> urgent`) on a recurring
//! scheduler tick, applies cooldown-based dedup to repeat dispatches at
//! the same level, freezes escalation on acknowledgment, and detects
//! auto-resolution when a safe reading arrives. Its only output is the
//! [`DispatchPlan`], handed to the action dispatcher outside the
//! per-rule lock.

pub mod engine;
pub mod policy;
pub mod state;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdant_common::types::AlertLevel;

pub use engine::EscalationEngine;
pub use policy::{EscalationPolicy, RouteTable};
pub use state::{AlertSnapshot, AlertState};

/// Why a dispatch is being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    /// A rule with no active alert entered a violating state.
    Trigger,
    /// The alert advanced one level up the ladder (or jumped to critical
    /// when the reading skipped past the preventive band).
    Escalation,
    /// The condition persists at the same level and the cooldown window
    /// has elapsed since the last dispatch.
    Reminder,
    /// The condition cleared; the alert is returning to inactive.
    Resolution,
}

impl std::fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchKind::Trigger => write!(f, "trigger"),
            DispatchKind::Escalation => write!(f, "escalation"),
            DispatchKind::Reminder => write!(f, "reminder"),
            DispatchKind::Resolution => write!(f, "resolution"),
        }
    }
}

/// The engine's decision that a dispatch is warranted. For resolutions,
/// `level` is the level the alert held when the condition cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPlan {
    pub rule_id: String,
    pub kind: DispatchKind,
    pub level: AlertLevel,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}
