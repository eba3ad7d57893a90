use crate::message::format_message;
use crate::{ActuatorControl, CommandQueue, DispatchError, NotificationChannel};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use verdant_common::types::{DeviceCommand, DispatchOutcome, Tier};
use verdant_escalation::{DispatchKind, DispatchPlan, EscalationPolicy};
use verdant_rules::{Rule, RuleAction};

/// One failed side effect within a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    /// Channel instance name or actuator command.
    pub target: String,
    pub reason: String,
}

/// Aggregate result of executing one dispatch plan. Fed back to the
/// escalation engine (`record_outcome`, `record_mitigation`).
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub rule_id: String,
    pub outcome: DispatchOutcome,
    /// True when this rule's own actuator action reported success.
    pub mitigated: bool,
    pub failures: Vec<DispatchFailure>,
}

/// Executes the side effects a triggered rule specifies.
///
/// Notify actions fan out concurrently to every channel the policy maps
/// for the plan's level and the caller's tier; each call is wrapped in a
/// bounded timeout and failures are independent (fan-out, not a
/// pipeline). Actuator calls are bounded and never retried. Composite
/// actions execute independently with no rollback on partial failure.
pub struct ActionDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    actuator: Arc<dyn ActuatorControl>,
    queue: Arc<dyn CommandQueue>,
    policy: EscalationPolicy,
    tier: Tier,
    channel_timeout: Duration,
    actuator_timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(
        channels: Vec<Arc<dyn NotificationChannel>>,
        actuator: Arc<dyn ActuatorControl>,
        queue: Arc<dyn CommandQueue>,
        policy: EscalationPolicy,
        tier: Tier,
    ) -> Self {
        Self {
            channels,
            actuator,
            queue,
            policy,
            tier,
            channel_timeout: Duration::from_secs(5),
            actuator_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeouts(mut self, channel: Duration, actuator: Duration) -> Self {
        self.channel_timeout = channel;
        self.actuator_timeout = actuator;
        self
    }

    /// Execute every action of `rule` for the given plan.
    ///
    /// Resolution plans deliver the recovery notice only; automated
    /// actions (actuator, device command) are not fired again for a
    /// condition that has already cleared.
    pub async fn dispatch(&self, rule: &Rule, plan: &DispatchPlan) -> DispatchReport {
        let mut attempted = 0usize;
        let mut mitigated = false;
        let mut failures = Vec::new();

        for action in &rule.actions {
            match action {
                RuleAction::Notify { .. } => {
                    let (sent, mut failed) = self.fan_out(rule, action, plan).await;
                    attempted += sent + failed.len();
                    failures.append(&mut failed);
                }
                RuleAction::DeviceCommand { command } => {
                    if plan.kind == DispatchKind::Resolution {
                        continue;
                    }
                    // Fire-and-forget: always succeeds at this layer; the
                    // queue may expire unclaimed entries downstream.
                    self.queue
                        .enqueue(DeviceCommand {
                            id: verdant_common::id::next_id(),
                            rule_id: rule.id.clone(),
                            command: command.clone(),
                            issued_at: plan.timestamp,
                        })
                        .await;
                    attempted += 1;
                    tracing::debug!(rule_id = %rule.id, command, "Device command enqueued");
                }
                RuleAction::Actuator {
                    command,
                    target_value,
                } => {
                    if plan.kind == DispatchKind::Resolution {
                        continue;
                    }
                    attempted += 1;
                    match timeout(
                        self.actuator_timeout,
                        self.actuator.apply(command, *target_value),
                    )
                    .await
                    {
                        Ok(Ok(())) => {
                            mitigated = true;
                            tracing::info!(
                                rule_id = %rule.id,
                                command,
                                target_value,
                                "Actuator applied"
                            );
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(rule_id = %rule.id, command, error = %e, "Actuator failed");
                            failures.push(DispatchFailure {
                                target: command.clone(),
                                reason: e.to_string(),
                            });
                        }
                        Err(_) => {
                            tracing::warn!(rule_id = %rule.id, command, "Actuator timed out");
                            failures.push(DispatchFailure {
                                target: command.clone(),
                                reason: DispatchError::Timeout {
                                    target: command.clone(),
                                    secs: self.actuator_timeout.as_secs(),
                                }
                                .to_string(),
                            });
                        }
                    }
                }
            }
        }

        let outcome = if failures.is_empty() {
            DispatchOutcome::Delivered
        } else if failures.len() < attempted {
            DispatchOutcome::PartiallyDelivered
        } else {
            DispatchOutcome::DeliveryFailed
        };

        DispatchReport {
            rule_id: rule.id.clone(),
            outcome,
            mitigated,
            failures,
        }
    }

    /// Concurrently send one formatted message through every eligible
    /// channel. Returns (successes, failures).
    async fn fan_out(
        &self,
        rule: &Rule,
        action: &RuleAction,
        plan: &DispatchPlan,
    ) -> (usize, Vec<DispatchFailure>) {
        let eligible = self.policy.channels_for(plan.level, self.tier);
        let message = format_message(rule, action, plan);

        let sends = self
            .channels
            .iter()
            .filter(|channel| eligible.contains(&channel.kind()))
            .map(|channel| {
                let message = &message;
                async move {
                    let name = channel.channel_name().to_string();
                    match timeout(self.channel_timeout, channel.send(message)).await {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => {
                            tracing::error!(
                                channel = %name,
                                rule_id = %message.rule_id,
                                error = %e,
                                "Failed to send notification"
                            );
                            Some(DispatchFailure {
                                target: name,
                                reason: e.to_string(),
                            })
                        }
                        Err(_) => {
                            tracing::error!(
                                channel = %name,
                                rule_id = %message.rule_id,
                                "Notification send timed out"
                            );
                            let reason = DispatchError::Timeout {
                                target: name.clone(),
                                secs: self.channel_timeout.as_secs(),
                            }
                            .to_string();
                            Some(DispatchFailure {
                                target: name,
                                reason,
                            })
                        }
                    }
                }
            });

        let results = join_all(sends).await;
        let total = results.len();
        let failures: Vec<DispatchFailure> = results.into_iter().flatten().collect();
        (total - failures.len(), failures)
    }
}
