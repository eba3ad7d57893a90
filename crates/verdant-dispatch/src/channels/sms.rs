use crate::error::{DispatchError, Result as DispatchResult};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use verdant_common::types::{AlertMessage, ChannelKind};

#[derive(Debug, Deserialize)]
struct SmsConfig {
    endpoint: String,
    api_key: String,
    phones: Vec<String>,
}

/// HTTP SMS gateway. One POST per phone number; the gateway's JSON
/// contract is `{to, text}` with the API key in a bearer header.
pub struct SmsChannel {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    phones: Vec<String>,
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        // SMS is short-form: subject only, body is for richer channels
        let text = format!("{} ({:.2})", message.subject, message.value);

        for phone in &self.phones {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({ "to": phone, "text": text }))
                .send()
                .await
                .with_context(|| format!("SMS gateway request for {phone} failed"))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("SMS gateway returned {status} for {phone}: {body}");
            }
        }
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

pub struct SmsPlugin;

impl ChannelPlugin for SmsPlugin {
    fn name(&self) -> &str {
        "sms"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn validate_config(&self, config: &Value) -> DispatchResult<()> {
        let parsed: SmsConfig = serde_json::from_value(config.clone())
            .map_err(|e| DispatchError::InvalidConfig(format!("sms: {e}")))?;
        if parsed.phones.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "sms: field 'phones' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> DispatchResult<Box<dyn NotificationChannel>> {
        let parsed: SmsConfig = serde_json::from_value(config.clone())?;
        Ok(Box::new(SmsChannel {
            name: instance_name.to_string(),
            client: reqwest::Client::new(),
            endpoint: parsed.endpoint,
            api_key: parsed.api_key,
            phones: parsed.phones,
        }))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("api_key") {
                obj.insert("api_key".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
