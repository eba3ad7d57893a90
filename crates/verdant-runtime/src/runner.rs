use crate::config::MonitorConfig;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use verdant_common::types::ReadingBatch;
use verdant_dispatch::plugin::ChannelRegistry;
use verdant_dispatch::{ActionDispatcher, ActuatorControl, CommandQueue, NotificationChannel};
use verdant_escalation::{DispatchPlan, EscalationEngine};
use verdant_rules::{evaluator, RuleStore};

/// Running instance of the alerting core.
///
/// Owns the ingestion loop and the escalation tick. Both feed dispatch
/// plans into the action dispatcher on freshly spawned tasks, so a slow
/// or unreachable collaborator never delays ingestion of the next
/// reading. Dropping the last ingestion sender (via [`shutdown`](Self::shutdown))
/// stops the ingestion loop; the tick task is aborted.
pub struct Monitor {
    rules: Arc<RuleStore>,
    engine: Arc<EscalationEngine>,
    readings_tx: mpsc::Sender<ReadingBatch>,
    ingest_task: JoinHandle<()>,
    tick_task: JoinHandle<()>,
}

impl Monitor {
    /// Build the channel instances a config's seed list describes.
    ///
    /// # Errors
    ///
    /// Returns the first plugin validation error; a monitor is never
    /// started with a partially valid channel set.
    pub fn build_channels(
        config: &MonitorConfig,
        registry: &ChannelRegistry,
    ) -> anyhow::Result<Vec<Arc<dyn NotificationChannel>>> {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
        for seed in config.channels.iter().filter(|seed| seed.enabled) {
            let channel =
                registry.create_channel(&seed.channel_type, &seed.name, &seed.config)?;
            tracing::info!(name = %seed.name, channel_type = %seed.channel_type, "Channel ready");
            channels.push(Arc::from(channel));
        }
        Ok(channels)
    }

    /// Spawn the ingestion and tick loops.
    pub fn spawn(
        config: MonitorConfig,
        channels: Vec<Arc<dyn NotificationChannel>>,
        actuator: Arc<dyn ActuatorControl>,
        queue: Arc<dyn CommandQueue>,
    ) -> Self {
        let rules = Arc::new(RuleStore::new());
        let engine = Arc::new(EscalationEngine::new(config.escalation.clone()));
        let dispatcher = Arc::new(
            ActionDispatcher::new(
                channels,
                actuator,
                queue,
                config.escalation.clone(),
                config.tier,
            )
            .with_timeouts(
                Duration::from_secs(config.channel_timeout_secs),
                Duration::from_secs(config.actuator_timeout_secs),
            ),
        );

        let (readings_tx, mut readings_rx) = mpsc::channel::<ReadingBatch>(256);

        let ingest_task = {
            let rules = rules.clone();
            let engine = engine.clone();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                while let Some(batch) = readings_rx.recv().await {
                    let active_rules = rules.list();
                    let verdicts = evaluator::evaluate_batch(&batch, &active_rules);
                    for verdict in verdicts {
                        let now = Utc::now();
                        if let Some(plan) = engine.process_verdict(&verdict, now).await {
                            spawn_dispatch(&rules, &engine, &dispatcher, plan);
                        }
                    }
                }
                tracing::info!("Reading ingestion stopped");
            })
        };

        let tick_task = {
            let rules = rules.clone();
            let engine = engine.clone();
            let dispatcher = dispatcher.clone();
            let tick = Duration::from_secs(config.tick_secs);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    let now = Utc::now();
                    for plan in engine.tick(now).await {
                        spawn_dispatch(&rules, &engine, &dispatcher, plan);
                    }
                }
            })
        };

        Self {
            rules,
            engine,
            readings_tx,
            ingest_task,
            tick_task,
        }
    }

    /// Sender for feeding reading batches into the monitor.
    pub fn sender(&self) -> mpsc::Sender<ReadingBatch> {
        self.readings_tx.clone()
    }

    /// Ingest one reading batch.
    ///
    /// # Errors
    ///
    /// Fails only after [`shutdown`](Self::shutdown) closed the channel.
    pub async fn ingest(&self, batch: ReadingBatch) -> anyhow::Result<()> {
        self.readings_tx
            .send(batch)
            .await
            .map_err(|_| anyhow::anyhow!("monitor is shut down"))
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn engine(&self) -> &Arc<EscalationEngine> {
        &self.engine
    }

    /// Stop both loops. In-flight dispatch tasks run to completion.
    pub async fn shutdown(self) {
        self.tick_task.abort();
        drop(self.readings_tx);
        let _ = self.ingest_task.await;
    }
}

/// Run one dispatch off the hot path and feed the report back into the
/// engine.
fn spawn_dispatch(
    rules: &Arc<RuleStore>,
    engine: &Arc<EscalationEngine>,
    dispatcher: &Arc<ActionDispatcher>,
    plan: DispatchPlan,
) {
    let rules = rules.clone();
    let engine = engine.clone();
    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        // The rule may have been deleted between planning and dispatch
        let Some(rule) = rules.get(&plan.rule_id) else {
            tracing::debug!(rule_id = %plan.rule_id, "Rule gone before dispatch");
            return;
        };
        let report = dispatcher.dispatch(&rule, &plan).await;
        if report.mitigated {
            engine.record_mitigation(&plan.rule_id, Utc::now()).await;
        }
        engine.record_outcome(&plan.rule_id, report.outcome).await;
    });
}
