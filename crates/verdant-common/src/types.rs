use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sensor field a reading reports on (and a rule watches).
///
/// # Examples
///
/// ```
/// use verdant_common::types::SensorKind;
///
/// let kind: SensorKind = "water_level".parse().unwrap();
/// assert_eq!(kind, SensorKind::WaterLevel);
/// assert_eq!(kind.to_string(), "water_level");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Ph,
    Ec,
    WaterLevel,
    Light,
    Co2,
    Pressure,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Ph => "ph",
            SensorKind::Ec => "ec",
            SensorKind::WaterLevel => "water_level",
            SensorKind::Light => "light",
            SensorKind::Co2 => "co2",
            SensorKind::Pressure => "pressure",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            "ph" => Ok(SensorKind::Ph),
            "ec" => Ok(SensorKind::Ec),
            "water_level" => Ok(SensorKind::WaterLevel),
            "light" => Ok(SensorKind::Light),
            "co2" => Ok(SensorKind::Co2),
            "pressure" => Ok(SensorKind::Pressure),
            _ => Err(format!("unknown sensor kind: {s}")),
        }
    }
}

/// A single measurement event. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub sensor: SensorKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// A batch of readings reported together (one event may carry several
/// sensor fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingBatch {
    pub zone_id: String,
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<Reading>,
}

/// Notification severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use verdant_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert!(Severity::Critical > Severity::Advisory);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Advisory,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Advisory => write!(f, "advisory"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "advisory" => Ok(Severity::Advisory),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Outcome of evaluating one reading against one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictClass {
    /// Reading is in the safe zone for this rule.
    None,
    /// Reading entered the warning-margin band adjacent to the threshold.
    Preventive,
    /// Reading violated the threshold or left the allowed range.
    Critical,
}

impl VerdictClass {
    /// Whether this verdict represents a violating (non-safe) reading.
    pub fn is_violating(self) -> bool {
        !matches!(self, VerdictClass::None)
    }
}

/// Output of the rule evaluator for a single (reading, rule) pair.
/// Transient: handed to the escalation engine and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub rule_id: String,
    pub class: VerdictClass,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Escalation ladder an unresolved alert climbs over time,
/// ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Preventive,
    Warning,
    Critical,
    Urgent,
}

impl AlertLevel {
    /// The next level up the ladder, or `None` at the top.
    pub fn next(self) -> Option<AlertLevel> {
        match self {
            AlertLevel::Preventive => Some(AlertLevel::Warning),
            AlertLevel::Warning => Some(AlertLevel::Critical),
            AlertLevel::Critical => Some(AlertLevel::Urgent),
            AlertLevel::Urgent => None,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Preventive => write!(f, "preventive"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
            AlertLevel::Urgent => write!(f, "urgent"),
        }
    }
}

/// Lifecycle phase of a live alert. `inactive` is represented by the
/// absence of an alert-state record, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "phase", content = "level")]
pub enum AlertPhase {
    /// Escalating normally at the given level.
    Active(AlertLevel),
    /// An operator acknowledged the alert; the escalation clock is frozen
    /// at the given level but auto-resolution still applies.
    Acknowledged(AlertLevel),
    /// The condition cleared; a resolution dispatch is in flight and the
    /// record is about to be discarded.
    Resolved,
}

impl AlertPhase {
    pub fn level(self) -> Option<AlertLevel> {
        match self {
            AlertPhase::Active(level) | AlertPhase::Acknowledged(level) => Some(level),
            AlertPhase::Resolved => None,
        }
    }
}

/// Delivery channel family a notification can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Console,
    Push,
    Sms,
    Email,
    Chat,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Console => write!(f, "console"),
            ChannelKind::Push => write!(f, "push"),
            ChannelKind::Sms => write!(f, "sms"),
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Chat => write!(f, "chat"),
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(ChannelKind::Console),
            "push" => Ok(ChannelKind::Push),
            "sms" => Ok(ChannelKind::Sms),
            "email" => Ok(ChannelKind::Email),
            "chat" => Ok(ChannelKind::Chat),
            _ => Err(format!("unknown channel kind: {s}")),
        }
    }
}

/// Service tier of the alert's owning client. Gates which channel
/// families are eligible at each escalation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Plus,
    Pro,
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(Tier::Basic),
            "plus" => Ok(Tier::Plus),
            "pro" => Ok(Tier::Pro),
            _ => Err(format!("unknown tier: {s}")),
        }
    }
}

/// Aggregate result of one dispatch across all its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every attempted side effect succeeded.
    Delivered,
    /// At least one channel/actuator succeeded and at least one failed.
    PartiallyDelivered,
    /// Every attempted side effect failed or timed out.
    DeliveryFailed,
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Delivered => write!(f, "delivered"),
            DispatchOutcome::PartiallyDelivered => write!(f, "partially_delivered"),
            DispatchOutcome::DeliveryFailed => write!(f, "delivery_failed"),
        }
    }
}

/// A formatted notification, ready to hand to a delivery channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub sensor: SensorKind,
    pub severity: Severity,
    pub subject: String,
    pub body: String,
    pub value: f64,
    pub threshold: f64,
    pub level: Option<AlertLevel>,
    pub timestamp: DateTime<Utc>,
}

/// A command destined for the device command queue, picked up
/// asynchronously by polling firmware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub id: String,
    pub rule_id: String,
    pub command: String,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Advisory);
        assert!(Severity::Advisory > Severity::Info);
    }

    #[test]
    fn alert_level_ladder() {
        assert_eq!(AlertLevel::Preventive.next(), Some(AlertLevel::Warning));
        assert_eq!(AlertLevel::Warning.next(), Some(AlertLevel::Critical));
        assert_eq!(AlertLevel::Critical.next(), Some(AlertLevel::Urgent));
        assert_eq!(AlertLevel::Urgent.next(), None);
    }

    #[test]
    fn sensor_kind_round_trips_through_str() {
        for name in [
            "temperature",
            "humidity",
            "ph",
            "ec",
            "water_level",
            "light",
            "co2",
            "pressure",
        ] {
            let kind: SensorKind = name.parse().unwrap();
            assert_eq!(kind.to_string(), name);
        }
        assert!("vibration".parse::<SensorKind>().is_err());
    }

    #[test]
    fn phase_level_extraction() {
        assert_eq!(
            AlertPhase::Active(AlertLevel::Warning).level(),
            Some(AlertLevel::Warning)
        );
        assert_eq!(
            AlertPhase::Acknowledged(AlertLevel::Urgent).level(),
            Some(AlertLevel::Urgent)
        );
        assert_eq!(AlertPhase::Resolved.level(), None);
    }
}
