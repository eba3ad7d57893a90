use crate::engine::EscalationEngine;
use crate::policy::EscalationPolicy;
use crate::{DispatchKind, DispatchPlan};
use chrono::{DateTime, Duration, Utc};
use verdant_common::types::{
    AlertLevel, AlertPhase, ChannelKind, DispatchOutcome, Tier, Verdict, VerdictClass,
};

fn verdict(rule_id: &str, class: VerdictClass, value: f64, ts: DateTime<Utc>) -> Verdict {
    Verdict {
        rule_id: rule_id.into(),
        class,
        value,
        timestamp: ts,
    }
}

fn engine() -> EscalationEngine {
    EscalationEngine::new(EscalationPolicy::default())
}

fn mins(n: i64) -> Duration {
    Duration::minutes(n)
}

#[tokio::test]
async fn preventive_trigger_dispatches_immediately() {
    let engine = engine();
    let t0 = Utc::now();

    let plan = engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .expect("trigger plan");
    assert_eq!(plan.kind, DispatchKind::Trigger);
    assert_eq!(plan.level, AlertLevel::Preventive);
    assert_eq!(engine.active_count(), 1);
}

#[tokio::test]
async fn safe_verdict_without_state_is_a_noop() {
    let engine = engine();
    let t0 = Utc::now();
    let plan = engine
        .process_verdict(&verdict("r1", VerdictClass::None, 20.0, t0), t0)
        .await;
    assert!(plan.is_none());
    assert_eq!(engine.active_count(), 0);
}

#[tokio::test]
async fn critical_verdict_enters_ladder_at_critical() {
    let engine = engine();
    let t0 = Utc::now();

    let plan = engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 35.0, t0), t0)
        .await
        .expect("trigger plan");
    assert_eq!(plan.kind, DispatchKind::Trigger);
    assert_eq!(plan.level, AlertLevel::Critical);
}

#[tokio::test]
async fn sustained_preventive_climbs_the_full_ladder() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();

    // Just before the 5 min boundary: nothing
    assert!(engine.tick(t0 + mins(4)).await.is_empty());

    let plans = engine.tick(t0 + mins(5)).await;
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].kind, DispatchKind::Escalation);
    assert_eq!(plans[0].level, AlertLevel::Warning);

    // Warning holds for 10 min
    assert!(engine.tick(t0 + mins(14)).await.is_empty());
    let plans = engine.tick(t0 + mins(15)).await;
    assert_eq!(plans[0].level, AlertLevel::Critical);

    // Critical holds for 15 min
    assert!(engine.tick(t0 + mins(29)).await.is_empty());
    let plans = engine.tick(t0 + mins(30)).await;
    assert_eq!(plans[0].level, AlertLevel::Urgent);

    // Urgent is the top of the ladder
    assert!(engine.tick(t0 + mins(120)).await.is_empty());
}

#[tokio::test]
async fn tick_does_not_escalate_after_condition_cleared_class() {
    // A verdict=none arriving resolves the alert outright, so the only
    // way last_class goes safe is resolution; this exercises the guard
    // by checking the resolved alert no longer ticks.
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();
    engine
        .process_verdict(&verdict("r1", VerdictClass::None, 20.0, t0 + mins(1)), t0 + mins(1))
        .await
        .unwrap();
    assert!(engine.tick(t0 + mins(10)).await.is_empty());
}

#[tokio::test]
async fn preventive_jumps_straight_to_critical_on_critical_verdict() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();

    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 33.0, t0 + mins(1)),
            t0 + mins(1),
        )
        .await
        .expect("jump plan");
    assert_eq!(plan.kind, DispatchKind::Escalation);
    assert_eq!(plan.level, AlertLevel::Critical);
}

#[tokio::test]
async fn repeats_within_cooldown_are_suppressed() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 31.0, t0), t0)
        .await
        .unwrap();

    // Same condition 10 minutes later: inside the 15 min cooldown
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 31.0, t0 + mins(10)),
            t0 + mins(10),
        )
        .await;
    assert!(plan.is_none());

    // 20 minutes in: cooled down, reminder goes out
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 31.0, t0 + mins(20)),
            t0 + mins(20),
        )
        .await
        .expect("reminder");
    assert_eq!(plan.kind, DispatchKind::Reminder);
    assert_eq!(plan.level, AlertLevel::Critical);
}

#[tokio::test]
async fn preventive_then_critical_then_suppressed_scenario() {
    // threshold=30 above, margin=2: values 29, 31, 33 ten minutes apart
    let engine = engine();
    let t0 = Utc::now();

    let p1 = engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();
    assert_eq!((p1.kind, p1.level), (DispatchKind::Trigger, AlertLevel::Preventive));

    let p2 = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 31.0, t0 + mins(10)),
            t0 + mins(10),
        )
        .await
        .unwrap();
    assert_eq!(
        (p2.kind, p2.level),
        (DispatchKind::Escalation, AlertLevel::Critical)
    );

    // Third reading is still critical but lands inside the cooldown
    let p3 = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 33.0, t0 + mins(20)),
            t0 + mins(20),
        )
        .await;
    assert!(p3.is_none());
}

#[tokio::test]
async fn resolution_dispatches_once_and_returns_to_inactive() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 35.0, t0), t0)
        .await
        .unwrap();

    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::None, 20.0, t0 + mins(5)),
            t0 + mins(5),
        )
        .await
        .expect("resolution");
    assert_eq!(plan.kind, DispatchKind::Resolution);
    assert_eq!(plan.level, AlertLevel::Critical);
    assert_eq!(engine.active_count(), 0);

    // Second safe reading: nothing left to resolve
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::None, 20.0, t0 + mins(6)),
            t0 + mins(6),
        )
        .await;
    assert!(plan.is_none());

    // The rule retriggers fresh afterwards
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 36.0, t0 + mins(7)),
            t0 + mins(7),
        )
        .await
        .expect("fresh trigger");
    assert_eq!(plan.kind, DispatchKind::Trigger);
}

#[tokio::test]
async fn acknowledgment_freezes_escalation_until_resolution() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();

    assert!(engine.acknowledge("r1", "operator-7", t0 + mins(1)).await);
    // Double-ack is a no-op
    assert!(!engine.acknowledge("r1", "operator-8", t0 + mins(2)).await);

    // Way past every boundary: still frozen
    assert!(engine.tick(t0 + mins(60)).await.is_empty());

    // Violating verdicts keep updating the condition but stay silent
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 33.0, t0 + mins(61)),
            t0 + mins(61),
        )
        .await;
    assert!(plan.is_none());

    // Auto-resolution still applies while acknowledged
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::None, 20.0, t0 + mins(62)),
            t0 + mins(62),
        )
        .await
        .expect("resolution");
    assert_eq!(plan.kind, DispatchKind::Resolution);
    assert_eq!(engine.active_count(), 0);
}

#[tokio::test]
async fn unacknowledge_restarts_the_level_clock() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();
    engine.acknowledge("r1", "operator-7", t0 + mins(1)).await;

    assert!(engine.unacknowledge("r1", t0 + mins(30)).await);
    // Clock restarted at t0+30: the 5 min wait counts from there
    assert!(engine.tick(t0 + mins(34)).await.is_empty());
    let plans = engine.tick(t0 + mins(35)).await;
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].level, AlertLevel::Warning);
}

#[tokio::test]
async fn rules_escalate_in_isolation() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("a", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();
    engine
        .process_verdict(
            &verdict("b", VerdictClass::Critical, 99.0, t0 + mins(3)),
            t0 + mins(3),
        )
        .await
        .unwrap();

    // Only rule a has been preventive long enough to advance
    let plans = engine.tick(t0 + mins(5)).await;
    let rule_ids: Vec<&str> = plans.iter().map(|p| p.rule_id.as_str()).collect();
    assert_eq!(rule_ids, vec!["a"]);

    // Resolving a leaves b untouched
    engine
        .process_verdict(
            &verdict("a", VerdictClass::None, 20.0, t0 + mins(6)),
            t0 + mins(6),
        )
        .await
        .unwrap();
    assert_eq!(engine.active_count(), 1);
    let snaps = engine.snapshot(t0 + mins(6)).await;
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].rule_id, "b");
    assert_eq!(snaps[0].phase, AlertPhase::Active(AlertLevel::Critical));
}

#[tokio::test]
async fn stale_verdicts_are_dropped() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 35.0, t0 + mins(10)),
            t0 + mins(10),
        )
        .await
        .unwrap();

    // A late safe reading from before the violation must not resolve
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::None, 20.0, t0 + mins(5)),
            t0 + mins(11),
        )
        .await;
    assert!(plan.is_none());
    assert_eq!(engine.active_count(), 1);
}

#[tokio::test]
async fn mitigation_suppresses_reminders_for_one_cooldown() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 35.0, t0), t0)
        .await
        .unwrap();

    // Actuator kicked in at t0+16; cooldown from the trigger has elapsed
    // at t0+20 but the mitigation is fresh, so no reminder.
    engine.record_mitigation("r1", t0 + mins(16)).await;
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 34.0, t0 + mins(20)),
            t0 + mins(20),
        )
        .await;
    assert!(plan.is_none());

    // One cooldown after the mitigation the reminder flows again
    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 34.0, t0 + mins(31)),
            t0 + mins(31),
        )
        .await
        .expect("reminder");
    assert_eq!(plan.kind, DispatchKind::Reminder);

    // Mitigation never resolves by itself
    assert_eq!(engine.active_count(), 1);
}

#[tokio::test]
async fn failed_dispatch_still_counts_for_cooldown() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 35.0, t0), t0)
        .await
        .unwrap();
    engine
        .record_outcome("r1", DispatchOutcome::DeliveryFailed)
        .await;

    // Failure is visible in the snapshot but does not reopen the cooldown
    let snaps = engine.snapshot(t0 + mins(1)).await;
    assert_eq!(snaps[0].last_outcome, Some(DispatchOutcome::DeliveryFailed));

    let plan = engine
        .process_verdict(
            &verdict("r1", VerdictClass::Critical, 35.0, t0 + mins(5)),
            t0 + mins(5),
        )
        .await;
    assert!(plan.is_none(), "no retry storm after a failed dispatch");
}

#[tokio::test]
async fn snapshot_reports_time_in_level() {
    let engine = engine();
    let t0 = Utc::now();
    engine
        .process_verdict(&verdict("r1", VerdictClass::Preventive, 29.0, t0), t0)
        .await
        .unwrap();

    let snaps = engine.snapshot(t0 + mins(3)).await;
    assert_eq!(snaps[0].phase, AlertPhase::Active(AlertLevel::Preventive));
    assert_eq!(snaps[0].secs_in_level, 180);
    assert_eq!(snaps[0].current_value, 29.0);
    assert!(snaps[0].acknowledged_by.is_none());
}

#[test]
fn policy_routes_respect_tier_gating() {
    let policy = EscalationPolicy::default();

    let urgent_pro = policy.channels_for(AlertLevel::Urgent, Tier::Pro);
    assert!(urgent_pro.contains(&ChannelKind::Chat));
    assert!(urgent_pro.contains(&ChannelKind::Sms));

    let urgent_plus = policy.channels_for(AlertLevel::Urgent, Tier::Plus);
    assert!(!urgent_plus.contains(&ChannelKind::Chat));
    assert!(urgent_plus.contains(&ChannelKind::Sms));

    let urgent_basic = policy.channels_for(AlertLevel::Urgent, Tier::Basic);
    assert!(!urgent_basic.contains(&ChannelKind::Chat));
    assert!(!urgent_basic.contains(&ChannelKind::Sms));
    assert!(urgent_basic.contains(&ChannelKind::Console));
}

#[test]
fn policy_defaults_match_the_escalation_windows() {
    let policy = EscalationPolicy::default();
    assert_eq!(
        policy.wait_at(AlertLevel::Preventive),
        Some(Duration::minutes(5))
    );
    assert_eq!(
        policy.wait_at(AlertLevel::Warning),
        Some(Duration::minutes(10))
    );
    assert_eq!(
        policy.wait_at(AlertLevel::Critical),
        Some(Duration::minutes(15))
    );
    assert_eq!(policy.wait_at(AlertLevel::Urgent), None);
    assert_eq!(policy.cooldown(), Duration::minutes(15));
}

#[tokio::test]
async fn plans_carry_the_triggering_value_and_timestamp() {
    let engine = engine();
    let t0 = Utc::now();
    let plan: DispatchPlan = engine
        .process_verdict(&verdict("r1", VerdictClass::Critical, 42.5, t0), t0)
        .await
        .unwrap();
    assert_eq!(plan.value, 42.5);
    assert_eq!(plan.timestamp, t0);
}
