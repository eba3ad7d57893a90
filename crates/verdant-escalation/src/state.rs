use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdant_common::types::{AlertLevel, AlertPhase, DispatchOutcome, VerdictClass};

/// The per-rule mutable record the escalation engine owns exclusively.
///
/// Exactly one live `AlertState` exists per rule at any time; a rule with
/// no record is inactive. The record is only ever mutated while holding
/// that rule's lock.
#[derive(Debug, Clone)]
pub struct AlertState {
    pub rule_id: String,
    pub phase: AlertPhase,
    pub first_triggered_at: DateTime<Utc>,
    pub last_level_change_at: DateTime<Utc>,
    pub last_notified_at: Option<DateTime<Utc>>,
    /// Timestamp of the newest reading processed for this rule; verdicts
    /// older than this are dropped to keep per-rule ordering.
    pub last_reading_at: DateTime<Utc>,
    /// Classification carried by the newest processed reading. The tick
    /// only escalates while this is still violating.
    pub last_class: VerdictClass,
    pub current_value: f64,
    pub acknowledged_by: Option<String>,
    /// Set when this rule's own automated action reported success during
    /// the active escalation; suppresses reminder churn for one cooldown
    /// window.
    pub mitigated_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<DispatchOutcome>,
}

impl AlertState {
    pub fn new(
        rule_id: &str,
        level: AlertLevel,
        class: VerdictClass,
        value: f64,
        reading_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            phase: AlertPhase::Active(level),
            first_triggered_at: now,
            last_level_change_at: now,
            last_notified_at: Some(now),
            last_reading_at: reading_at,
            last_class: class,
            current_value: value,
            acknowledged_by: None,
            mitigated_at: None,
            last_outcome: None,
        }
    }
}

/// Read-only view of one rule's alert state, exposed to dashboards and
/// reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub rule_id: String,
    pub phase: AlertPhase,
    pub first_triggered_at: DateTime<Utc>,
    /// Seconds spent at the current level.
    pub secs_in_level: i64,
    pub current_value: f64,
    pub acknowledged_by: Option<String>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<DispatchOutcome>,
}

impl AlertSnapshot {
    pub fn from_state(state: &AlertState, now: DateTime<Utc>) -> Self {
        Self {
            rule_id: state.rule_id.clone(),
            phase: state.phase,
            first_triggered_at: state.first_triggered_at,
            secs_in_level: (now - state.last_level_change_at).num_seconds(),
            current_value: state.current_value,
            acknowledged_by: state.acknowledged_by.clone(),
            last_notified_at: state.last_notified_at,
            last_outcome: state.last_outcome,
        }
    }
}
