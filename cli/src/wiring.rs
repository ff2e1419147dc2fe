//! Builds the application services from the loaded configuration

use anyhow::Result;
use consilium_application::{
    DecisionCoordinator, EventSink, NoEventSink, ResourceScheduler, VoteTransport,
};
use consilium_infrastructure::{
    ConfigIssue, FanoutEventSink, FileConfig, InMemoryParticipantDirectory,
    InMemoryResourceDirectory, JsonlEventSink, Severity, StaticWeightTable, TracingEventSink,
};
use std::sync::Arc;
use tracing::warn;

/// Shared services built once per invocation
pub struct Services {
    pub config: FileConfig,
    pub weights: Arc<StaticWeightTable>,
    pub events: Arc<dyn EventSink>,
    pub participants: Arc<InMemoryParticipantDirectory>,
    pub resources: Arc<InMemoryResourceDirectory>,
}

impl Services {
    /// Validate `config` and build the shared adapters. Warnings are logged,
    /// errors abort.
    pub fn build(config: FileConfig) -> Result<Self> {
        let issues = config.validate();
        log_warnings(&issues);
        consilium_infrastructure::ConfigValidationError::check(&issues)?;

        let (decision_weights, _) = config.decision.parse_weights();
        let (resource_weights, _) = config.scheduler.parse_weights();
        let weights = StaticWeightTable::with_defaults()
            .with_decision_overrides(decision_weights)
            .with_resource_weights(resource_weights);

        Ok(Self {
            weights: Arc::new(weights),
            events: event_sink(&config),
            participants: Arc::new(InMemoryParticipantDirectory::from_config(&config.participants)),
            resources: Arc::new(InMemoryResourceDirectory::from_resources(
                config.resources.iter().cloned(),
            )),
            config,
        })
    }

    pub fn coordinator<T: VoteTransport + 'static>(&self, transport: Arc<T>) -> DecisionCoordinator<T> {
        let (coordinator_config, _) = self.config.decision.to_coordinator_config();
        DecisionCoordinator::new(
            transport,
            self.participants.clone(),
            self.weights.clone(),
            self.events.clone(),
            coordinator_config,
        )
    }

    pub fn scheduler(&self) -> ResourceScheduler {
        let (scheduler_config, _) = self.config.scheduler.to_scheduler_config();
        ResourceScheduler::new(
            self.resources.clone(),
            self.weights.clone(),
            self.events.clone(),
            scheduler_config,
        )
    }
}

fn log_warnings(issues: &[ConfigIssue]) {
    for issue in issues.iter().filter(|i| i.severity == Severity::Warning) {
        warn!("{}", issue.message);
    }
}

fn event_sink(config: &FileConfig) -> Arc<dyn EventSink> {
    let mut fanout = FanoutEventSink::new(Vec::new());
    if let Some(path) = &config.events.jsonl_path
        && let Some(sink) = JsonlEventSink::new(path)
    {
        fanout = fanout.with_sink(Arc::new(sink));
    }
    if config.events.log {
        fanout = fanout.with_sink(Arc::new(TracingEventSink));
    }

    if fanout.is_empty() {
        Arc::new(NoEventSink)
    } else {
        Arc::new(fanout)
    }
}
