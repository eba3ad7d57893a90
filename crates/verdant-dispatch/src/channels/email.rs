use crate::error::{DispatchError, Result as DispatchResult};
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;
use verdant_common::types::{AlertMessage, ChannelKind};

#[derive(Debug, Deserialize)]
struct EmailConfig {
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    username: String,
    password: String,
    from: String,
    to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

pub struct EmailChannel {
    name: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: Vec<String>,
}

impl EmailChannel {
    fn from_config(name: &str, config: EmailConfig) -> DispatchResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DispatchError::InvalidConfig(format!("email: bad SMTP host: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username, config.password))
            .build();
        Ok(Self {
            name: name.to_string(),
            transport,
            from: config.from,
            to: config.to,
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        for recipient in &self.to {
            let email = Message::builder()
                .from(self.from.parse().context("invalid from address")?)
                .to(recipient.parse().context("invalid recipient address")?)
                .subject(&message.subject)
                .header(ContentType::TEXT_PLAIN)
                .body(message.body.clone())
                .context("failed to build email")?;

            self.transport
                .send(email)
                .await
                .with_context(|| format!("SMTP send to {recipient} failed"))?;
        }
        Ok(())
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn channel_name(&self) -> &str {
        &self.name
    }
}

pub struct EmailPlugin;

impl ChannelPlugin for EmailPlugin {
    fn name(&self) -> &str {
        "email"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn validate_config(&self, config: &Value) -> DispatchResult<()> {
        let parsed: EmailConfig = serde_json::from_value(config.clone())
            .map_err(|e| DispatchError::InvalidConfig(format!("email: {e}")))?;
        if parsed.to.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "email: field 'to' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn create_channel(
        &self,
        instance_name: &str,
        config: &Value,
    ) -> DispatchResult<Box<dyn NotificationChannel>> {
        let parsed: EmailConfig = serde_json::from_value(config.clone())?;
        Ok(Box::new(EmailChannel::from_config(instance_name, parsed)?))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(obj) = redacted.as_object_mut() {
            if obj.contains_key("password") {
                obj.insert("password".to_string(), Value::String("***".to_string()));
            }
        }
        redacted
    }
}
