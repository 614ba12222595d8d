//! Quotawatch CLI
//!
//! Command-line interface for the quotawatch usage alerting engine.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use quotawatch::alerting::store::{MemoryEventStore, MemoryLogStore};
use quotawatch::alerting::{ThresholdEvaluator, ThresholdRegistry, WebhookDispatcher};
use quotawatch::models::{UsageMetrics, WebhookConfig, WebhookProvider};
use quotawatch::monitor::UsageMonitor;
use quotawatch::usage::{HttpUsageProvider, StaticUsageProvider, UsageProvider};
use quotawatch::Config;

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Quotawatch - usage threshold alerting
#[derive(Parser)]
#[command(name = "quotawatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "QUOTAWATCH_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (for commands that support it)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a usage endpoint and dispatch alerts continuously
    Watch {
        /// Usage endpoint returning a snapshot as JSON
        #[arg(long, env = "QUOTAWATCH_USAGE_ENDPOINT")]
        endpoint: Option<String>,

        /// Bearer token for the usage endpoint
        #[arg(long, env = "QUOTAWATCH_USAGE_TOKEN")]
        token: Option<String>,

        /// Seconds between snapshots (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Evaluate one snapshot and print the resulting alerts
    Evaluate {
        /// Billed cost in currency units
        #[arg(long, default_value = "0")]
        cost: f64,

        /// Storage consumption in GB
        #[arg(long, default_value = "0")]
        storage_gb: f64,

        /// Bandwidth consumption in GB
        #[arg(long, default_value = "0")]
        bandwidth_gb: f64,

        /// Monthly active users
        #[arg(long, default_value = "0")]
        mau: u64,

        /// Concurrent database connections
        #[arg(long, default_value = "0")]
        connections: u64,

        /// Edge function invocations
        #[arg(long, default_value = "0")]
        functions: u64,
    },

    /// List the configured threshold rules
    Thresholds,

    /// Send a test event to a webhook URL
    TestChannel {
        /// Destination URL
        #[arg(long)]
        url: String,

        /// HMAC signing secret
        #[arg(long)]
        secret: Option<String>,

        /// Event type to send
        #[arg(long, default_value = "alert.test")]
        event: String,

        /// Retries after the initial attempt
        #[arg(long, default_value = "0")]
        retries: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Watch {
            endpoint,
            token,
            interval,
        } => run_watch(config, endpoint, token, interval).await,
        Commands::Evaluate {
            cost,
            storage_gb,
            bandwidth_gb,
            mau,
            connections,
            functions,
        } => {
            let metrics = UsageMetrics {
                cost,
                storage_bytes: (storage_gb * BYTES_PER_GB) as u64,
                bandwidth_bytes: (bandwidth_gb * BYTES_PER_GB) as u64,
                monthly_active_users: mau,
                connections,
                function_invocations: functions,
            };
            run_evaluate(config, metrics, cli.format).await
        }
        Commands::Thresholds => run_thresholds(cli.format),
        Commands::TestChannel {
            url,
            secret,
            event,
            retries,
        } => run_test_channel(url, secret, event, retries).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_watch(
    mut config: Config,
    endpoint: Option<String>,
    token: Option<String>,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(endpoint) = endpoint {
        config.usage.endpoint = Some(endpoint);
    }
    if let Some(token) = token {
        config.usage.token = Some(token);
    }
    if let Some(interval) = interval {
        config.monitor.poll_interval_seconds = interval;
    }

    let provider = Arc::new(HttpUsageProvider::from_config(&config.usage)?);
    let monitor = UsageMonitor::from_config(&config, provider);

    tokio::select! {
        () = monitor.start() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down...");
            monitor.shutdown();
        }
    }

    Ok(())
}

async fn run_evaluate(
    config: Config,
    metrics: UsageMetrics,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let provider = Arc::new(StaticUsageProvider::new(metrics));
    let snapshot = provider.fetch().await?;

    let evaluator = ThresholdEvaluator::new(
        ThresholdRegistry::with_defaults(),
        Arc::new(MemoryEventStore::with_cap(config.alerting.history_limit)),
    );
    let events = evaluator.evaluate(&snapshot);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        OutputFormat::Text => {
            if events.is_empty() {
                println!("Usage within all thresholds");
            }
            for event in &events {
                println!("[{:?}] {}", event.severity, event.message);
            }
        }
    }

    Ok(())
}

fn run_thresholds(format: OutputFormat) -> anyhow::Result<()> {
    let registry = ThresholdRegistry::with_defaults();
    let thresholds = registry.list();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&thresholds)?),
        OutputFormat::Text => {
            for t in &thresholds {
                let state = if t.enabled { "enabled" } else { "disabled" };
                println!(
                    "{:<22} {:?} {:?} {} {} ({state})",
                    t.id, t.metric, t.operator, t.value, t.unit
                );
            }
        }
    }

    Ok(())
}

async fn run_test_channel(
    url: String,
    secret: Option<String>,
    event: String,
    retries: u32,
) -> anyhow::Result<()> {
    let channel = WebhookConfig {
        id: "test".to_string(),
        name: "test".to_string(),
        url,
        secret,
        events: vec!["*".to_string()],
        provider: WebhookProvider::Generic,
        is_active: true,
        retry_count: retries,
        retry_delay_secs: 1,
        last_triggered: None,
        last_status: None,
        headers: None,
    };

    let dispatcher = WebhookDispatcher::new(Arc::new(MemoryLogStore::new()));
    let data = serde_json::json!({"message": "quotawatch test event"});
    let result = dispatcher.send_with_retry(&channel, &event, &data).await;

    if result.success {
        println!(
            "Delivered {} in {} ms (HTTP {})",
            event,
            result.response_time_ms,
            result.status_code.unwrap_or(0)
        );
        Ok(())
    } else {
        anyhow::bail!(
            "delivery failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
