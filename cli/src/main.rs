//! CLI entrypoint for consilium
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod input;
mod logging;
mod wiring;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use commands::{Cli, Command};
use consilium_application::{LoadStatistics, SchedulingMetrics, VoteTransport};
use consilium_domain::{
    Allocation, DecisionRequest, ParticipantId, ScheduleState, SchedulingStrategy, VotingPolicy,
};
use consilium_infrastructure::{ConfigLoader, FileConfig, StaticVoteTransport};
use input::{DecideInput, ScheduleInput};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wiring::Services;

/// Slack on top of the decision deadline before the CLI stops waiting
const WAIT_MARGIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref());

    info!("Starting consilium");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    match cli.command {
        Command::Decide {
            ref input,
            ref policy,
            timeout,
        } => {
            let decide_input: DecideInput = input::read_json(input)?;
            let services = Services::build(config)?;
            decide(&services, decide_input, policy.as_deref(), timeout, cli.pretty).await
        }
        Command::Schedule {
            ref input,
            ref strategy,
            rebalance,
        } => {
            let schedule_input: ScheduleInput = input::read_json(input)?;
            let config = with_strategy_override(config, strategy.as_deref())?;
            let services = Services::build(config)?;
            schedule(&services, schedule_input, rebalance, cli.pretty).await
        }
        Command::ShowConfig => show_config(&cli, &config),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}

// ==================== decide ====================

async fn decide(
    services: &Services,
    input: DecideInput,
    policy_override: Option<&str>,
    timeout_override: Option<u64>,
    pretty: bool,
) -> Result<()> {
    if !input.votes.is_empty() {
        for participant in input.votes.keys() {
            services.participants.register(participant.clone(), "static");
        }
        let transport = Arc::new(StaticVoteTransport::new(input.votes.clone()));
        return run_decision(services, transport, input, policy_override, timeout_override, pretty)
            .await;
    }

    #[cfg(feature = "http-transport")]
    {
        let transport = Arc::new(consilium_infrastructure::HttpVoteTransport::new());
        run_decision(services, transport, input, policy_override, timeout_override, pretty).await
    }

    #[cfg(not(feature = "http-transport"))]
    {
        let _ = (services, input, policy_override, timeout_override, pretty);
        bail!("No canned votes in the input and HTTP transport is not compiled in")
    }
}

/// How long the CLI waits for a result: the deadline plus one monitor sweep
fn wait_budget(timeout: Duration, monitor_interval: Duration) -> Duration {
    timeout
        .saturating_add(monitor_interval)
        .saturating_add(WAIT_MARGIN)
}

async fn run_decision<T: VoteTransport + 'static>(
    services: &Services,
    transport: Arc<T>,
    input: DecideInput,
    policy_override: Option<&str>,
    timeout_override: Option<u64>,
    pretty: bool,
) -> Result<()> {
    let coordinator = services.coordinator(transport);
    let config = coordinator.config().clone();

    let policy = match policy_override.or(input.policy.as_deref()) {
        Some(raw) => Some(raw.parse::<VotingPolicy>().map_err(anyhow::Error::msg)?),
        None => None,
    };
    let timeout = timeout_override
        .or(input.timeout_secs)
        .map(Duration::from_secs);

    let mut panel = input.participants.clone();
    if panel.is_none() && !input.votes.is_empty() {
        let mut keys: Vec<ParticipantId> = input.votes.keys().cloned().collect();
        keys.sort();
        panel = Some(keys);
    }

    let token = CancellationToken::new();
    let monitor = coordinator.start_timeout_monitor(token.clone());

    let submitted = if panel.is_none() && policy.is_none() && timeout.is_none() {
        coordinator
            .submit_collaborative_decision(input.category, input.context, input.priority)
            .await
    } else {
        let participants = panel.unwrap_or_else(|| config.participants_for(input.category).to_vec());
        let request = DecisionRequest::new(input.category, participants)
            .with_context(input.context)
            .with_priority(input.priority)
            .with_policy(policy.unwrap_or(config.default_policy))
            .with_timeout(timeout.unwrap_or(config.default_timeout));
        coordinator.submit_decision(request).await
    };

    let outcome = match submitted {
        Ok(id) => {
            let wait = wait_budget(timeout.unwrap_or(config.default_timeout), config.monitor_interval);
            coordinator.wait_for_result(&id, wait).await.map_err(anyhow::Error::from)
        }
        Err(e) => Err(anyhow::Error::from(e).context("Decision request rejected")),
    };

    token.cancel();
    if let Err(e) = monitor.await {
        debug!("Timeout monitor ended abnormally: {}", e);
    }

    let result = outcome?;
    info!(
        "Decision {} finished with status {} (consensus {:.2})",
        result.request_id, result.status, result.consensus_score
    );
    print_json(&result, pretty)
}

// ==================== schedule ====================

fn with_strategy_override(mut config: FileConfig, strategy: Option<&str>) -> Result<FileConfig> {
    if let Some(raw) = strategy {
        let parsed: SchedulingStrategy = raw.parse().map_err(anyhow::Error::msg)?;
        config.scheduler.strategy = parsed.as_str().to_string();
    }
    Ok(config)
}

#[derive(Serialize)]
struct ScheduleReport {
    allocations: Vec<Allocation>,
    states: BTreeMap<String, ScheduleState>,
    rejected: BTreeMap<String, String>,
    rebalanced: usize,
    metrics: SchedulingMetrics,
    load_statistics: LoadStatistics,
}

async fn schedule(services: &Services, input: ScheduleInput, rebalance: bool, pretty: bool) -> Result<()> {
    for resource in &input.resources {
        if services.resources.add(resource.clone()).is_some() {
            debug!("Resource {} from input replaces the configured entry", resource.id);
        }
    }

    let scheduler = services.scheduler();
    let requests = input
        .scheduling_requests(services.config.scheduler.default_duration_minutes)
        .context("Invalid scheduling input")?;

    let mut accepted = Vec::with_capacity(requests.len());
    let mut rejected = BTreeMap::new();
    for request in requests {
        let id = request.id.clone();
        match scheduler.submit_schedule(request).await {
            Ok(id) => accepted.push(id),
            Err(e) => {
                rejected.insert(id.to_string(), e.to_string());
            }
        }
    }

    let now = Utc::now();
    let matched_later = scheduler.process_pending(now).await;
    debug!("{} pending requests matched on the retry pass", matched_later);

    let rebalanced = if rebalance {
        scheduler.rebalance(now).await
    } else {
        0
    };

    let report = ScheduleReport {
        allocations: accepted
            .iter()
            .filter_map(|id| scheduler.get_allocation(id))
            .collect(),
        states: accepted
            .iter()
            .filter_map(|id| scheduler.schedule_state(id).map(|s| (id.to_string(), s)))
            .collect(),
        rejected,
        rebalanced,
        metrics: scheduler.metrics(),
        load_statistics: scheduler.load_statistics(),
    };
    print_json(&report, pretty)
}

// ==================== show-config ====================

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("Configuration sources:");
    if cli.no_config {
        println!("  (disabled with --no-config, using built-in defaults)");
    } else {
        for line in ConfigLoader::describe_sources(cli.config.as_ref()) {
            println!("  {}", line);
        }
    }

    let issues = config.validate();
    if issues.is_empty() {
        println!("\nNo configuration issues.");
    } else {
        println!("\nIssues:");
        for issue in &issues {
            let marker = if issue.is_error() { "error" } else { "warning" };
            println!("  [{}] {}", marker, issue.message);
        }
    }

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("\nEffective configuration:\n\n{}", rendered);

    if issues.iter().any(|i| i.is_error()) {
        bail!("Configuration has errors");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_budget_adds_monitor_sweep() {
        assert_eq!(
            wait_budget(Duration::from_secs(60), Duration::from_secs(5)),
            Duration::from_secs(67)
        );
    }

    #[test]
    fn test_wait_budget_saturates() {
        assert_eq!(
            wait_budget(Duration::from_secs(u64::MAX), Duration::from_secs(5)),
            Duration::MAX
        );
    }
}
