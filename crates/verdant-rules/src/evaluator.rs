use crate::rule::{Condition, Rule};
use verdant_common::types::{Reading, ReadingBatch, Verdict, VerdictClass};

/// Classify one reading against every applicable rule.
///
/// Pure and deterministic: no side effects, no shared mutable state, safe
/// to call concurrently from any number of readers. Disabled rules and
/// rules watching a different sensor field are skipped; a rule watching a
/// sensor the reading does not report is simply never matched (rules and
/// reading streams are configured independently).
///
/// A [`VerdictClass::None`] verdict is still emitted for matching rules:
/// the escalation engine needs safe readings to drive auto-resolution.
pub fn evaluate(reading: &Reading, rules: &[Rule]) -> Vec<Verdict> {
    rules
        .iter()
        .filter(|rule| rule.enabled && rule.sensor == reading.sensor)
        .map(|rule| Verdict {
            rule_id: rule.id.clone(),
            class: classify(rule, reading.value),
            value: reading.value,
            timestamp: reading.timestamp,
        })
        .collect()
}

/// Evaluate every reading in a batch, preserving per-reading order.
pub fn evaluate_batch(batch: &ReadingBatch, rules: &[Rule]) -> Vec<Verdict> {
    batch
        .readings
        .iter()
        .flat_map(|reading| evaluate(reading, rules))
        .collect()
}

fn classify(rule: &Rule, value: f64) -> VerdictClass {
    let margin = rule.warning_margin.unwrap_or(0.0);
    match rule.condition {
        Condition::Above { threshold } => {
            if value > threshold {
                VerdictClass::Critical
            } else if margin > 0.0 && value > threshold - margin {
                VerdictClass::Preventive
            } else {
                VerdictClass::None
            }
        }
        Condition::Below { threshold } => {
            if value < threshold {
                VerdictClass::Critical
            } else if margin > 0.0 && value < threshold + margin {
                VerdictClass::Preventive
            } else {
                VerdictClass::None
            }
        }
        // Range rules have no preventive band.
        Condition::Between { low, high } => {
            if value < low || value > high {
                VerdictClass::Critical
            } else {
                VerdictClass::None
            }
        }
    }
}
