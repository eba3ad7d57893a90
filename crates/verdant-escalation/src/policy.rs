use chrono::Duration;
use serde::{Deserialize, Serialize};
use verdant_common::types::{AlertLevel, ChannelKind, Tier};

/// Per-tier escalation configuration, consumed read-only by the engine
/// and the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Wait at `preventive` before advancing to `warning`.
    #[serde(default = "default_preventive_to_warning_secs")]
    pub preventive_to_warning_secs: u64,
    /// Wait at `warning` before advancing to `critical`.
    #[serde(default = "default_warning_to_critical_secs")]
    pub warning_to_critical_secs: u64,
    /// Wait at `critical` before advancing to `urgent`.
    #[serde(default = "default_critical_to_urgent_secs")]
    pub critical_to_urgent_secs: u64,
    /// Minimum interval between repeated dispatches at the same level.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub routes: RouteTable,
}

fn default_preventive_to_warning_secs() -> u64 {
    300
}

fn default_warning_to_critical_secs() -> u64 {
    600
}

fn default_critical_to_urgent_secs() -> u64 {
    900
}

fn default_cooldown_secs() -> u64 {
    900
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            preventive_to_warning_secs: default_preventive_to_warning_secs(),
            warning_to_critical_secs: default_warning_to_critical_secs(),
            critical_to_urgent_secs: default_critical_to_urgent_secs(),
            cooldown_secs: default_cooldown_secs(),
            routes: RouteTable::default(),
        }
    }
}

impl EscalationPolicy {
    /// How long an alert must sit at `level` before the tick advances it,
    /// or `None` at the top of the ladder.
    pub fn wait_at(&self, level: AlertLevel) -> Option<Duration> {
        let secs = match level {
            AlertLevel::Preventive => self.preventive_to_warning_secs,
            AlertLevel::Warning => self.warning_to_critical_secs,
            AlertLevel::Critical => self.critical_to_urgent_secs,
            AlertLevel::Urgent => return None,
        };
        Some(Duration::seconds(secs as i64))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs as i64)
    }

    /// Channels eligible for a dispatch at `level` for a client of the
    /// given tier.
    pub fn channels_for(&self, level: AlertLevel, tier: Tier) -> Vec<ChannelKind> {
        self.routes
            .at(level)
            .iter()
            .copied()
            .filter(|kind| tier_allows(tier, *kind))
            .collect()
    }
}

fn tier_allows(tier: Tier, kind: ChannelKind) -> bool {
    match tier {
        Tier::Pro => true,
        Tier::Plus => kind != ChannelKind::Chat,
        Tier::Basic => !matches!(kind, ChannelKind::Sms | ChannelKind::Chat),
    }
}

/// Which channel families each escalation level maps to, before tier
/// gating is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default = "default_preventive_channels")]
    pub preventive: Vec<ChannelKind>,
    #[serde(default = "default_warning_channels")]
    pub warning: Vec<ChannelKind>,
    #[serde(default = "default_critical_channels")]
    pub critical: Vec<ChannelKind>,
    #[serde(default = "default_urgent_channels")]
    pub urgent: Vec<ChannelKind>,
}

fn default_preventive_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Console]
}

fn default_warning_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Console, ChannelKind::Push]
}

fn default_critical_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Console, ChannelKind::Push, ChannelKind::Sms]
}

fn default_urgent_channels() -> Vec<ChannelKind> {
    vec![
        ChannelKind::Console,
        ChannelKind::Push,
        ChannelKind::Sms,
        ChannelKind::Email,
        ChannelKind::Chat,
    ]
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            preventive: default_preventive_channels(),
            warning: default_warning_channels(),
            critical: default_critical_channels(),
            urgent: default_urgent_channels(),
        }
    }
}

impl RouteTable {
    pub fn at(&self, level: AlertLevel) -> &[ChannelKind] {
        match level {
            AlertLevel::Preventive => &self.preventive,
            AlertLevel::Warning => &self.warning,
            AlertLevel::Critical => &self.critical,
            AlertLevel::Urgent => &self.urgent,
        }
    }
}
