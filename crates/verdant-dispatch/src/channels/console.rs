use crate::error::Result as DispatchResult;
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use verdant_common::types::{AlertMessage, ChannelKind};

/// Tracing-backed sink. Always succeeds; the default channel for the
/// preventive tier and the one tests lean on.
pub struct ConsoleChannel {
    name: String,
}

impl ConsoleChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        tracing::info!(
            channel = %self.name,
            rule_id = %message.rule_id,
            severity = %message.severity,
            subject = %message.subject,
            body = %message.body,
            "Alert notification"
        );
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Console
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

pub struct ConsolePlugin;

impl ChannelPlugin for ConsolePlugin {
    fn name(&self) -> &str {
        "console"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Console
    }

    fn validate_config(&self, _config: &Value) -> DispatchResult<()> {
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        _config: &Value,
    ) -> DispatchResult<Box<dyn NotificationChannel>> {
        Ok(Box::new(ConsoleChannel::new(instance_name)))
    }
}
