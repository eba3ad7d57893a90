use crate::config::{ConfigError, MonitorConfig};
use crate::runner::Monitor;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use verdant_common::types::{
    AlertMessage, ChannelKind, DeviceCommand, Reading, ReadingBatch, SensorKind, Severity, Tier,
};
use verdant_dispatch::plugin::ChannelRegistry;
use verdant_dispatch::{ActuatorControl, CommandQueue, NotificationChannel};
use verdant_rules::{Condition, Rule, RuleAction};

struct RecordingChannel {
    sent: Mutex<Vec<AlertMessage>>,
}

impl RecordingChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Console
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

struct NoopActuator;

#[async_trait]
impl ActuatorControl for NoopActuator {
    async fn apply(&self, _command: &str, _target_value: f64) -> Result<()> {
        Ok(())
    }
}

struct NoopQueue;

#[async_trait]
impl CommandQueue for NoopQueue {
    async fn enqueue(&self, _command: DeviceCommand) {}
}

fn temp_rule() -> Rule {
    Rule {
        id: "temp-high".into(),
        name: "Greenhouse temperature high".into(),
        sensor: SensorKind::Temperature,
        condition: Condition::Above { threshold: 30.0 },
        warning_margin: Some(2.0),
        actions: vec![RuleAction::Notify {
            severity: Severity::Critical,
            message: "temperature above safe limit".into(),
            advisory: None,
        }],
        enabled: true,
    }
}

fn batch(value: f64) -> ReadingBatch {
    let now = Utc::now();
    ReadingBatch {
        zone_id: "greenhouse-1".into(),
        timestamp: now,
        readings: vec![Reading {
            sensor: SensorKind::Temperature,
            value,
            timestamp: now,
        }],
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

#[test]
fn config_defaults() {
    let config: MonitorConfig = toml::from_str("").unwrap();
    assert_eq!(config.tick_secs, 5);
    assert_eq!(config.channel_timeout_secs, 5);
    assert_eq!(config.actuator_timeout_secs, 5);
    assert_eq!(config.tier, Tier::Basic);
    assert_eq!(config.escalation.cooldown_secs, 900);
    assert!(config.channels.is_empty());
}

#[test]
fn config_loads_overrides_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
tick_secs = 2
tier = "pro"

[escalation]
cooldown_secs = 60

[[channels]]
name = "console-main"
channel_type = "console"
"#
    )
    .unwrap();

    let config = MonitorConfig::load(file.path()).unwrap();
    assert_eq!(config.tick_secs, 2);
    assert_eq!(config.tier, Tier::Pro);
    assert_eq!(config.escalation.cooldown_secs, 60);
    assert_eq!(config.channels.len(), 1);
    assert_eq!(config.channels[0].channel_type, "console");
}

#[test]
fn config_rejects_zero_tick() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "tick_secs = 0").unwrap();
    let err = MonitorConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "tick_secs"));
}

#[test]
fn config_surfaces_parse_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "tick_secs = \"soon\"").unwrap();
    assert!(matches!(
        MonitorConfig::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn seed_channels_build_through_the_registry() {
    let config: MonitorConfig = toml::from_str(
        r#"
[[channels]]
name = "console-main"
channel_type = "console"

[[channels]]
name = "disabled-one"
channel_type = "console"
enabled = false
"#,
    )
    .unwrap();

    let channels = Monitor::build_channels(&config, &ChannelRegistry::default()).unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].channel_name(), "console-main");
}

#[test]
fn unknown_seed_channel_type_fails_fast() {
    let config: MonitorConfig = toml::from_str(
        r#"
[[channels]]
name = "pager-main"
channel_type = "pager"
"#,
    )
    .unwrap();
    assert!(Monitor::build_channels(&config, &ChannelRegistry::default()).is_err());
}

#[tokio::test]
async fn monitor_triggers_and_resolves_end_to_end() {
    let recording = RecordingChannel::new();
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![recording.clone()];
    let monitor = Monitor::spawn(
        MonitorConfig::default(),
        channels,
        Arc::new(NoopActuator),
        Arc::new(NoopQueue),
    );
    monitor.rules().insert(temp_rule()).unwrap();

    // Violating reading: one critical trigger dispatch
    monitor.ingest(batch(31.0)).await.unwrap();
    wait_until(|| !recording.sent().is_empty()).await;
    assert_eq!(monitor.engine().active_count(), 1);
    let sent = recording.sent();
    assert_eq!(sent[0].rule_id, "temp-high");
    assert_eq!(sent[0].severity, Severity::Critical);

    // Safe reading: resolution notice and the alert is gone
    monitor.ingest(batch(20.0)).await.unwrap();
    wait_until(|| recording.sent().len() >= 2).await;
    assert_eq!(monitor.engine().active_count(), 0);
    let sent = recording.sent();
    assert_eq!(sent[1].severity, Severity::Info);
    assert!(sent[1].subject.starts_with("[resolved]"));

    monitor.shutdown().await;
}

#[tokio::test]
async fn safe_readings_do_not_dispatch() {
    let recording = RecordingChannel::new();
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![recording.clone()];
    let monitor = Monitor::spawn(
        MonitorConfig::default(),
        channels,
        Arc::new(NoopActuator),
        Arc::new(NoopQueue),
    );
    monitor.rules().insert(temp_rule()).unwrap();

    monitor.ingest(batch(25.0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(recording.sent().is_empty());
    assert_eq!(monitor.engine().active_count(), 0);

    monitor.shutdown().await;
}
