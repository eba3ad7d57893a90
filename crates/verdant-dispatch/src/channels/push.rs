use crate::error::{DispatchError, Result as DispatchResult};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use verdant_common::types::{AlertMessage, ChannelKind};

#[derive(Debug, Deserialize)]
struct PushConfig {
    endpoint: String,
    app_token: String,
    device_tokens: Vec<String>,
}

/// Mobile push service client. A single POST carries every device token;
/// the push service fans out to devices on its side.
pub struct PushChannel {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    app_token: String,
    device_tokens: Vec<String>,
}

#[async_trait]
impl NotificationChannel for PushChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.app_token)
            .json(&serde_json::json!({
                "tokens": self.device_tokens,
                "title": message.subject,
                "body": message.body,
                "severity": message.severity.to_string(),
                "rule_id": message.rule_id,
            }))
            .send()
            .await
            .context("push service request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("push service returned {status}: {body}");
        }
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

pub struct PushPlugin;

impl ChannelPlugin for PushPlugin {
    fn name(&self) -> &str {
        "push"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn validate_config(&self, config: &Value) -> DispatchResult<()> {
        let parsed: PushConfig = serde_json::from_value(config.clone())
            .map_err(|e| DispatchError::InvalidConfig(format!("push: {e}")))?;
        if parsed.device_tokens.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "push: field 'device_tokens' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> DispatchResult<Box<dyn NotificationChannel>> {
        let parsed: PushConfig = serde_json::from_value(config.clone())?;
        Ok(Box::new(PushChannel {
            name: instance_name.to_string(),
            client: reqwest::Client::new(),
            endpoint: parsed.endpoint,
            app_token: parsed.app_token,
            device_tokens: parsed.device_tokens,
        }))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("app_token") {
                obj.insert("app_token".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
