//! zkelect - Single-Leader Election over a Coordination Service
//!
//! Companion CLI: generate and validate configuration files, and run an
//! in-process demo of the election protocol.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zkelect::client::{Coordinator, MemoryCoordinator};
use zkelect::config::ZkElectConfig;
use zkelect::election::{ElectionEngine, EngineState};
use zkelect::error::Result;
use zkelect::notify::LeadershipNotifier;

/// zkelect - Single-Leader Election over a Coordination Service
#[derive(Parser)]
#[command(name = "zkelect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "zkelect.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "zkelect.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Race in-process contenders over the election protocol
    Demo {
        /// Number of contending instances
        #[arg(short = 'n', long, default_value_t = 3)]
        contenders: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    match cli.command {
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(cli.config),
        Commands::Demo { contenders } => run_demo(cli.config, contenders).await,
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# zkelect Configuration
# Generated configuration file

[election]
# Coordination-service host and port
endpoint = "zoo1"
port = 2181
# Session timeout in milliseconds (at most 300000)
session_timeout_ms = 5000
# Election node name, created directly under the root
election_path = "master"
# Resolve multi-host connect strings in a deterministic order
host_order_deterministic = false

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("\nValidate with: zkelect validate --config {}", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match ZkElectConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Endpoint:        {}", config.election.connect_string());
            println!("  Session Timeout: {} ms", config.election.session_timeout_ms);
            println!("  Election Node:   {}", config.election.node_path());
            println!("  Host Order:      {}",
                if config.election.host_order_deterministic { "deterministic" } else { "shuffled" });
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Race contenders over the in-process backend, then fail the winner over
async fn run_demo(config_path: PathBuf, contenders: usize) -> Result<()> {
    let config = match ZkElectConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(_) => {
            tracing::warn!("No usable config at {:?}, using defaults", config_path);
            ZkElectConfig::from_str("")?
        }
    };
    let node_path = config.election.node_path();

    println!("zkelect demo: {} contenders racing for {}", contenders, node_path);
    println!();

    let coordinator = MemoryCoordinator::new();
    let mut engines = Vec::new();

    for i in 0..contenders {
        let engine = ElectionEngine::new(
            Arc::clone(&coordinator) as Arc<dyn Coordinator>,
            Arc::new(tokio::sync::RwLock::new(config.election.clone())),
            LeadershipNotifier::default(),
        );
        engine.ensure_client().await?;
        engines.push((i, engine));
    }

    wait_for_leader(&engines).await;
    let first = print_roles(&engines).await;

    if engines.len() < 2 {
        // Nobody left to fail over to
        return Ok(());
    }

    println!();
    println!("Expiring the leader's session (simulated crash)...");
    coordinator.expire_owner(&node_path).await;

    wait_for_successor(&engines, first).await;
    print_roles(&engines).await;

    Ok(())
}

async fn wait_for_leader(engines: &[(usize, ElectionEngine)]) {
    while !engines.iter().any(|(_, e)| e.is_leader()) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_for_successor(engines: &[(usize, ElectionEngine)], previous: Option<usize>) {
    loop {
        let leaders: Vec<usize> = engines
            .iter()
            .filter(|(i, e)| e.is_leader() && Some(*i) != previous)
            .map(|(i, _)| *i)
            .collect();
        if !leaders.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn print_roles(engines: &[(usize, ElectionEngine)]) -> Option<usize> {
    let mut leader = None;
    for (i, engine) in engines {
        let state = engine.state().await;
        if state == EngineState::Leader && leader.is_none() {
            leader = Some(*i);
        }
        println!("  contender-{}: {}", i, state);
    }
    leader
}
