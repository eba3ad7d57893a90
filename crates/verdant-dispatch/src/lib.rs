//! Action dispatcher and its external collaborators.
//!
//! The [`dispatcher::ActionDispatcher`] turns a
//! [`DispatchPlan`](verdant_escalation::DispatchPlan) plus the
//! triggering rule's actions into calls on external collaborators:
//! notification channels (fan-out, independent failures), the actuator
//! control, and the fire-and-forget device command queue. Built-in
//! channels include console, email (SMTP), SMS, push, and chat webhook.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod plugin;


use anyhow::Result;
use async_trait::async_trait;
use verdant_common::types::{AlertMessage, ChannelKind, DeviceCommand};

pub use dispatcher::{ActionDispatcher, DispatchReport};
pub use error::DispatchError;

/// A notification delivery channel (push service, SMS gateway, email
/// relay, console log). The dispatcher only needs a success/failure
/// result per call; each channel call is independent.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the message through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails. The dispatcher never retries
    /// automatically.
    async fn send(&self, message: &AlertMessage) -> Result<()>;

    /// The channel family used for route matching.
    fn kind(&self) -> ChannelKind;

    /// Instance name for logs (e.g. `"smtp-main"`).
    fn channel_name(&self) -> &str;
}

impl std::fmt::Debug for dyn NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("name", &self.channel_name())
            .finish()
    }
}

/// External actuator that can attempt to change a device's state
/// (e.g. request climate control on/off).
#[async_trait]
pub trait ActuatorControl: Send + Sync {
    /// Applies the command with a target value.
    ///
    /// # Errors
    ///
    /// Returns an error if the actuator rejected or failed the request.
    /// Calls are wrapped in a bounded timeout by the dispatcher.
    async fn apply(&self, command: &str, target_value: f64) -> Result<()>;
}

/// Queue of commands polled asynchronously by downstream firmware.
/// Enqueue is fire-and-forget; no delivery confirmation flows back.
#[async_trait]
pub trait CommandQueue: Send + Sync {
    async fn enqueue(&self, command: DeviceCommand);
}
