use verdant_common::types::{AlertLevel, AlertMessage, Severity};
use verdant_escalation::{DispatchKind, DispatchPlan};
use verdant_rules::{Rule, RuleAction};

/// Severity to tag a dispatch with, derived from the plan.
///
/// Resolution notices are informational regardless of the level the
/// alert held. Preventive dispatches are always advisories; past the
/// preventive band the dispatch takes the higher of the level-derived
/// severity and the severity the rule author configured on the action.
pub fn severity_for(plan: &DispatchPlan, configured: Severity) -> Severity {
    if plan.kind == DispatchKind::Resolution {
        return Severity::Info;
    }
    match plan.level {
        AlertLevel::Preventive => Severity::Advisory,
        AlertLevel::Warning => Severity::Warning.max(configured),
        AlertLevel::Critical | AlertLevel::Urgent => Severity::Critical,
    }
}

/// Format a notify action into the message handed to channels.
///
/// Preventive dispatches use the action's distinct advisory text when
/// present; resolutions produce a recovery notice. Every body carries
/// the current value and the violated threshold.
pub fn format_message(rule: &Rule, action: &RuleAction, plan: &DispatchPlan) -> AlertMessage {
    let (configured_severity, message, advisory) = match action {
        RuleAction::Notify {
            severity,
            message,
            advisory,
        } => (*severity, message.as_str(), advisory.as_deref()),
        // Non-notify actions have no message content of their own.
        _ => (Severity::Info, "", None),
    };

    let severity = severity_for(plan, configured_severity);
    let threshold = rule.condition.reported_threshold(plan.value);

    let (subject, body) = match plan.kind {
        DispatchKind::Resolution => (
            format!("[resolved] {}", rule.name),
            format!(
                "{}: {} back in the safe zone at {:.2} (was {}, reached {} level)",
                rule.name, rule.sensor, plan.value, rule.condition, plan.level,
            ),
        ),
        _ if plan.level == AlertLevel::Preventive => {
            let text = advisory
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} approaching {}", rule.sensor, rule.condition));
            (
                format!("[{severity}] {}", rule.name),
                format!(
                    "{text}: current {:.2}, threshold {:.2}",
                    plan.value, threshold
                ),
            )
        }
        _ => (
            format!("[{severity}] {} ({})", rule.name, plan.level),
            format!(
                "{message}: {} is {:.2}, threshold {:.2} ({})",
                rule.sensor, plan.value, threshold, plan.kind,
            ),
        ),
    };

    AlertMessage {
        id: verdant_common::id::next_id(),
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        sensor: rule.sensor,
        severity,
        subject,
        body,
        value: plan.value,
        threshold,
        level: Some(plan.level),
        timestamp: plan.timestamp,
    }
}
