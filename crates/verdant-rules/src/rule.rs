use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use verdant_common::types::{SensorKind, Severity};

/// Threshold or range condition a rule checks a reading against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Condition {
    /// Violated when the value rises above `threshold`.
    Above { threshold: f64 },
    /// Violated when the value drops below `threshold`.
    Below { threshold: f64 },
    /// Violated when the value leaves `[low, high]`. Range rules have no
    /// preventive band.
    Between { low: f64, high: f64 },
}

impl Condition {
    /// The hard boundary to report in notifications: the threshold for
    /// `above`/`below`, the violated bound (nearest) for `between`.
    pub fn reported_threshold(&self, value: f64) -> f64 {
        match *self {
            Condition::Above { threshold } | Condition::Below { threshold } => threshold,
            Condition::Between { low, high } => {
                if value < low {
                    low
                } else {
                    high
                }
            }
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Condition::Above { threshold } => write!(f, "above {threshold}"),
            Condition::Below { threshold } => write!(f, "below {threshold}"),
            Condition::Between { low, high } => write!(f, "outside [{low}, {high}]"),
        }
    }
}

/// Side effect a triggered rule requests. The vocabulary is fixed and
/// finite, so it is a closed sum type rather than dynamic dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RuleAction {
    /// Deliver a formatted message through the notification channels
    /// mapped for the current escalation level. `advisory`, when set, is
    /// used instead of `message` for preventive-band dispatches.
    Notify {
        severity: Severity,
        message: String,
        #[serde(default)]
        advisory: Option<String>,
    },
    /// Enqueue a command for asynchronous pickup by polling firmware.
    DeviceCommand { command: String },
    /// Request a state change from the actuator collaborator
    /// (e.g. climate control on/off).
    Actuator { command: String, target_value: f64 },
}

/// A named condition over one sensor field plus the actions to take when
/// it is violated. Immutable until edited through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub sensor: SensorKind,
    pub condition: Condition,
    /// Width of the preventive band adjacent to the threshold. Only
    /// meaningful for `above`/`below`; rejected on `between` rules.
    #[serde(default)]
    pub warning_margin: Option<f64>,
    pub actions: Vec<RuleAction>,
    pub enabled: bool,
}

impl Rule {
    /// Validates the invariants enforced at write time. A rule that
    /// passes here can always be evaluated safely.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        match self.condition {
            Condition::Above { threshold } | Condition::Below { threshold } => {
                if !threshold.is_finite() {
                    return Err(ValidationError::NonFiniteNumber { field: "threshold" });
                }
            }
            Condition::Between { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(ValidationError::NonFiniteNumber { field: "condition" });
                }
                if low > high {
                    return Err(ValidationError::InvertedRange { low, high });
                }
                if self.warning_margin.is_some() {
                    return Err(ValidationError::MarginOnRange);
                }
            }
        }

        if let Some(margin) = self.warning_margin {
            if !margin.is_finite() {
                return Err(ValidationError::NonFiniteNumber {
                    field: "warning_margin",
                });
            }
            if margin < 0.0 {
                return Err(ValidationError::NegativeMargin { margin });
            }
        }

        if self.actions.is_empty() {
            return Err(ValidationError::NoActions);
        }
        for (index, action) in self.actions.iter().enumerate() {
            match action {
                RuleAction::DeviceCommand { command } => {
                    if command.is_empty() {
                        return Err(ValidationError::EmptyCommand { index });
                    }
                }
                RuleAction::Actuator {
                    command,
                    target_value,
                } => {
                    if command.is_empty() {
                        return Err(ValidationError::EmptyCommand { index });
                    }
                    if !target_value.is_finite() {
                        return Err(ValidationError::NonFiniteNumber {
                            field: "target_value",
                        });
                    }
                }
                RuleAction::Notify { .. } => {}
            }
        }

        Ok(())
    }

    /// Whether the rule carries at least one actuator action, i.e. can
    /// produce a mitigation signal when that action succeeds.
    pub fn has_actuator_action(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, RuleAction::Actuator { .. }))
    }
}
