use crate::policy::EscalationPolicy;
use crate::state::{AlertSnapshot, AlertState};
use crate::{DispatchKind, DispatchPlan};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use verdant_common::types::{AlertLevel, AlertPhase, DispatchOutcome, Verdict, VerdictClass};

type StateSlot = Arc<Mutex<AlertState>>;

/// The alert lifecycle state machine.
///
/// One exclusive lock per rule id serializes all mutation of that rule's
/// [`AlertState`] (verdict processing and the scheduler tick alike) while
/// leaving unrelated rules free to proceed in parallel. The map of slots
/// itself sits behind a read-mostly lock that is only written when an
/// alert is created or resolved.
///
/// Every entry point takes `now` explicitly so tests can drive the
/// machine from a fake clock. No external failure can corrupt state:
/// the engine's transitions are pure in-memory bookkeeping, and dispatch
/// outcomes flow back only through [`record_outcome`](Self::record_outcome).
pub struct EscalationEngine {
    policy: EscalationPolicy,
    states: RwLock<HashMap<String, StateSlot>>,
}

impl EscalationEngine {
    pub fn new(policy: EscalationPolicy) -> Self {
        Self {
            policy,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Feed one verdict through the state machine. Returns a dispatch
    /// plan when the transition warrants one.
    pub async fn process_verdict(
        &self,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) -> Option<DispatchPlan> {
        let slot = {
            let states = self.states.read().unwrap();
            states.get(&verdict.rule_id).cloned()
        };

        match slot {
            Some(slot) => self.advance_existing(&slot, verdict, now).await,
            None => self.trigger_new(verdict, now),
        }
    }

    /// No live state for this rule: a safe verdict is a no-op, a
    /// violating one creates the state and dispatches immediately. A
    /// critical verdict enters the ladder directly at `critical` (rules
    /// without a preventive band, or a reading that jumped past it).
    fn trigger_new(&self, verdict: &Verdict, now: DateTime<Utc>) -> Option<DispatchPlan> {
        let level = match verdict.class {
            VerdictClass::None => return None,
            VerdictClass::Preventive => AlertLevel::Preventive,
            VerdictClass::Critical => AlertLevel::Critical,
        };

        let mut states = self.states.write().unwrap();
        // Lost a race with a concurrent trigger for the same rule: the
        // winner owns the state; this verdict is a duplicate of the same
        // condition and carries no new transition.
        if states.contains_key(&verdict.rule_id) {
            return None;
        }

        let state = AlertState::new(
            &verdict.rule_id,
            level,
            verdict.class,
            verdict.value,
            verdict.timestamp,
            now,
        );
        states.insert(verdict.rule_id.clone(), Arc::new(Mutex::new(state)));

        tracing::info!(
            rule_id = %verdict.rule_id,
            level = %level,
            value = verdict.value,
            "Alert triggered"
        );

        Some(DispatchPlan {
            rule_id: verdict.rule_id.clone(),
            kind: DispatchKind::Trigger,
            level,
            value: verdict.value,
            timestamp: now,
        })
    }

    async fn advance_existing(
        &self,
        slot: &StateSlot,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) -> Option<DispatchPlan> {
        let mut state = slot.lock().await;

        // Out-of-order protection: a late reading must never move the
        // level backward, so stale verdicts are dropped outright, the
        // resolution path included (a late safe reading must not resolve
        // an alert newer readings show still violating).
        if verdict.timestamp < state.last_reading_at {
            tracing::debug!(
                rule_id = %verdict.rule_id,
                verdict_ts = %verdict.timestamp,
                last_seen = %state.last_reading_at,
                "Stale verdict dropped"
            );
            return None;
        }

        state.last_reading_at = verdict.timestamp;
        state.current_value = verdict.value;
        state.last_class = verdict.class;

        if verdict.class == VerdictClass::None {
            return self.resolve(&mut state, now);
        }

        let level = match state.phase {
            AlertPhase::Active(level) => level,
            AlertPhase::Acknowledged(_) => {
                // Frozen: keep tracking the condition, dispatch nothing
                // until resolution or un-acknowledgment.
                return None;
            }
            AlertPhase::Resolved => return None,
        };

        // A reading that skipped past the preventive band jumps the
        // ladder; escalating to a new level always dispatches.
        if verdict.class == VerdictClass::Critical && level < AlertLevel::Critical {
            state.phase = AlertPhase::Active(AlertLevel::Critical);
            state.last_level_change_at = now;
            state.last_notified_at = Some(now);
            tracing::info!(
                rule_id = %verdict.rule_id,
                from = %level,
                to = %AlertLevel::Critical,
                "Alert jumped to critical"
            );
            return Some(DispatchPlan {
                rule_id: verdict.rule_id.clone(),
                kind: DispatchKind::Escalation,
                level: AlertLevel::Critical,
                value: verdict.value,
                timestamp: now,
            });
        }

        // Same level: repeat suppression. A dispatch counts against the
        // cooldown whether or not delivery later succeeds, and a recent
        // successful mitigation suppresses the reminder as well.
        let cooled_down = state
            .last_notified_at
            .map_or(true, |last| now - last >= self.policy.cooldown());
        let mitigation_fresh = state
            .mitigated_at
            .is_some_and(|at| now - at < self.policy.cooldown());

        if !cooled_down || mitigation_fresh {
            tracing::debug!(
                rule_id = %verdict.rule_id,
                level = %level,
                mitigated = mitigation_fresh,
                "Reminder suppressed"
            );
            return None;
        }

        state.last_notified_at = Some(now);
        Some(DispatchPlan {
            rule_id: verdict.rule_id.clone(),
            kind: DispatchKind::Reminder,
            level,
            value: verdict.value,
            timestamp: now,
        })
    }

    /// The condition cleared: emit one resolution dispatch and discard
    /// the record so the rule can retrigger fresh.
    fn resolve(&self, state: &mut AlertState, now: DateTime<Utc>) -> Option<DispatchPlan> {
        let level = state.phase.level()?;
        state.phase = AlertPhase::Resolved;

        let mut states = self.states.write().unwrap();
        states.remove(&state.rule_id);

        tracing::info!(
            rule_id = %state.rule_id,
            level = %level,
            value = state.current_value,
            "Alert resolved"
        );

        Some(DispatchPlan {
            rule_id: state.rule_id.clone(),
            kind: DispatchKind::Resolution,
            level,
            value: state.current_value,
            timestamp: now,
        })
    }

    /// Recurring scheduler tick: advance every unacknowledged active
    /// alert whose time at its current level has crossed the policy wait
    /// and whose latest reading was still violating. Escalation is never
    /// swallowed by cooldown.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<DispatchPlan> {
        let slots: Vec<StateSlot> = {
            let states = self.states.read().unwrap();
            states.values().cloned().collect()
        };

        let mut plans = Vec::new();
        for slot in slots {
            let mut state = slot.lock().await;

            let level = match state.phase {
                AlertPhase::Active(level) => level,
                AlertPhase::Acknowledged(_) | AlertPhase::Resolved => continue,
            };
            if !state.last_class.is_violating() {
                continue;
            }

            let Some(wait) = self.policy.wait_at(level) else {
                continue;
            };
            if now - state.last_level_change_at < wait {
                continue;
            }
            // wait_at returns None only at the top, so next() is present
            let Some(next) = level.next() else { continue };

            state.phase = AlertPhase::Active(next);
            state.last_level_change_at = now;
            state.last_notified_at = Some(now);

            tracing::info!(
                rule_id = %state.rule_id,
                from = %level,
                to = %next,
                "Alert escalated"
            );

            plans.push(DispatchPlan {
                rule_id: state.rule_id.clone(),
                kind: DispatchKind::Escalation,
                level: next,
                value: state.current_value,
                timestamp: now,
            });
        }
        plans
    }

    /// Freeze escalation for this rule. Returns false when there is no
    /// live alert or it is already acknowledged.
    pub async fn acknowledge(&self, rule_id: &str, who: &str, _now: DateTime<Utc>) -> bool {
        let Some(slot) = self.slot(rule_id) else {
            return false;
        };
        let mut state = slot.lock().await;
        match state.phase {
            AlertPhase::Active(level) => {
                state.phase = AlertPhase::Acknowledged(level);
                state.acknowledged_by = Some(who.to_string());
                tracing::info!(rule_id, who, level = %level, "Alert acknowledged");
                true
            }
            AlertPhase::Acknowledged(_) | AlertPhase::Resolved => false,
        }
    }

    /// Resume escalation for an acknowledged alert. The level clock
    /// restarts from `now`.
    pub async fn unacknowledge(&self, rule_id: &str, now: DateTime<Utc>) -> bool {
        let Some(slot) = self.slot(rule_id) else {
            return false;
        };
        let mut state = slot.lock().await;
        match state.phase {
            AlertPhase::Acknowledged(level) => {
                state.phase = AlertPhase::Active(level);
                state.acknowledged_by = None;
                state.last_level_change_at = now;
                tracing::info!(rule_id, level = %level, "Alert un-acknowledged");
                true
            }
            AlertPhase::Active(_) | AlertPhase::Resolved => false,
        }
    }

    /// Record that this rule's own automated action executed
    /// successfully. Does not resolve or acknowledge; only suppresses
    /// reminder churn for one cooldown window.
    pub async fn record_mitigation(&self, rule_id: &str, now: DateTime<Utc>) {
        if let Some(slot) = self.slot(rule_id) {
            let mut state = slot.lock().await;
            state.mitigated_at = Some(now);
            tracing::debug!(rule_id, "Mitigation recorded");
        }
    }

    /// Record the outcome of the most recent dispatch for observability.
    /// A failed dispatch still counted against the cooldown when the plan
    /// was issued; nothing is retried here.
    pub async fn record_outcome(&self, rule_id: &str, outcome: DispatchOutcome) {
        if let Some(slot) = self.slot(rule_id) {
            let mut state = slot.lock().await;
            state.last_outcome = Some(outcome);
            if outcome == DispatchOutcome::DeliveryFailed {
                tracing::warn!(rule_id, "Dispatch delivery failed");
            }
        }
    }

    /// Observability surface: one snapshot per live alert, sorted by
    /// rule id.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> Vec<AlertSnapshot> {
        let slots: Vec<StateSlot> = {
            let states = self.states.read().unwrap();
            states.values().cloned().collect()
        };

        let mut snapshots = Vec::with_capacity(slots.len());
        for slot in slots {
            let state = slot.lock().await;
            snapshots.push(AlertSnapshot::from_state(&state, now));
        }
        snapshots.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        snapshots
    }

    /// Number of live alerts.
    pub fn active_count(&self) -> usize {
        self.states.read().unwrap().len()
    }

    fn slot(&self, rule_id: &str) -> Option<StateSlot> {
        self.states.read().unwrap().get(rule_id).cloned()
    }
}
