use crate::error::{DispatchError, Result as DispatchResult};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use verdant_common::types::{AlertMessage, ChannelKind};

#[derive(Debug, Deserialize)]
struct ChatConfig {
    webhook_url: String,
    #[serde(default)]
    body_template: Option<String>,
}

/// Incoming-webhook chat channel (Slack/Mattermost style). An optional
/// body template substitutes `{{...}}` placeholders; without one a
/// structured JSON payload is posted.
pub struct ChatChannel {
    name: String,
    client: reqwest::Client,
    webhook_url: String,
    body_template: Option<String>,
}

impl ChatChannel {
    pub fn new(name: &str, webhook_url: &str, body_template: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
            body_template,
        }
    }

    pub fn render_body(&self, message: &AlertMessage) -> String {
        if let Some(template) = &self.body_template {
            template
                .replace("{{rule_id}}", &message.rule_id)
                .replace("{{rule_name}}", &message.rule_name)
                .replace("{{sensor}}", &message.sensor.to_string())
                .replace("{{severity}}", &message.severity.to_string())
                .replace("{{subject}}", &message.subject)
                .replace("{{message}}", &message.body)
                .replace("{{value}}", &format!("{:.2}", message.value))
                .replace("{{threshold}}", &format!("{:.2}", message.threshold))
                .replace("{{timestamp}}", &message.timestamp.to_rfc3339())
        } else {
            serde_json::json!({
                "text": format!("{}\n{}", message.subject, message.body),
                "rule_id": message.rule_id,
                "sensor": message.sensor.to_string(),
                "severity": message.severity.to_string(),
                "value": message.value,
                "threshold": message.threshold,
                "timestamp": message.timestamp.to_rfc3339(),
            })
            .to_string()
        }
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let body = self.render_body(message);
        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .context("chat webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat webhook returned {status}: {body}");
        }
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

pub struct ChatPlugin;

impl ChannelPlugin for ChatPlugin {
    fn name(&self) -> &str {
        "chat"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    fn validate_config(&self, config: &Value) -> DispatchResult<()> {
        let parsed: ChatConfig = serde_json::from_value(config.clone())
            .map_err(|e| DispatchError::InvalidConfig(format!("chat: {e}")))?;
        if !parsed.webhook_url.starts_with("http") {
            return Err(DispatchError::InvalidConfig(
                "chat: field 'webhook_url' must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> DispatchResult<Box<dyn NotificationChannel>> {
        let parsed: ChatConfig = serde_json::from_value(config.clone())?;
        Ok(Box::new(ChatChannel::new(
            instance_name,
            &parsed.webhook_url,
            parsed.body_template,
        )))
    }
}
