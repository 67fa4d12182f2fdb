use agent_core::{AgentState, ExecutionContext};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use events::{Event, EventBus};
use opencode::{ModelRef, OpenCodeClient};
use orchestrator::{AgentOrchestrator, OpenCodeBackend, OrchestratorConfig, StudioPersistence};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STUDIO_DIR: &str = ".opencode-studio";
const CONFIG_FILE: &str = "agent.toml";
const DEFAULT_DB_NAME: &str = "agent.db";
const DEFAULT_OPENCODE_URL: &str = "http://localhost:4096";

#[derive(Parser)]
#[command(name = "vault-agent")]
#[command(about = "Plan, execute and validate agent turns", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .opencode-studio/agent.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    opencode_url: Option<String>,

    /// SQLite database for session records
    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one turn and print the transition log
    Run {
        #[arg(long)]
        session: String,

        /// Note the user is looking at, passed to context retrieval
        #[arg(long)]
        note: Option<String>,

        #[arg(required = true)]
        input: Vec<String>,
    },
    /// Print the stored context of a session
    Show {
        #[arg(long)]
        session: String,
    },
    /// Cancel a session and interrupt it on the server
    Cancel {
        #[arg(long)]
        session: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentConfigFile {
    orchestrator: OrchestratorConfig,
    server: ServerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerConfig {
    opencode_url: Option<String>,
    database: Option<PathBuf>,
    provider_id: Option<String>,
    model_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cwd = std::env::current_dir()?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(STUDIO_DIR).join(CONFIG_FILE));
    let file = load_config(&config_path).await?;

    let opencode_url = cli
        .opencode_url
        .or(file.server.opencode_url)
        .unwrap_or_else(|| DEFAULT_OPENCODE_URL.to_string());
    let db_path = cli
        .database
        .or(file.server.database)
        .unwrap_or_else(|| cwd.join(STUDIO_DIR).join(DEFAULT_DB_NAME));

    tracing::info!("Database: {}", db_path.display());
    tracing::info!("OpenCode URL: {}", opencode_url);

    let mut client = OpenCodeClient::new(&opencode_url);
    if let (Some(provider), Some(model)) = (file.server.provider_id, file.server.model_id) {
        client = client.with_model(ModelRef::new(provider, model));
    }

    let storage = StudioPersistence::open(&cwd, &db_path)
        .await
        .context("Failed to open session storage")?;

    let bus = EventBus::new();
    let agent = AgentOrchestrator::builder(Arc::new(OpenCodeBackend::new(client)))
        .with_config(file.orchestrator)
        .with_persistence(Arc::new(storage))
        .with_event_bus(bus.clone())
        .build();

    match cli.command {
        Commands::Run {
            session,
            note,
            input,
        } => run(&agent, &bus, &session, note, &input.join(" ")).await,
        Commands::Show { session } => show(&agent, &session).await,
        Commands::Cancel { session } => cancel(&agent, &session).await,
    }
}

async fn load_config(path: &Path) -> Result<AgentConfigFile> {
    if !path.exists() {
        return Ok(AgentConfigFile::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
}

async fn run(
    agent: &AgentOrchestrator,
    bus: &EventBus,
    session_id: &str,
    note: Option<String>,
    input: &str,
) -> Result<()> {
    agent.set_current_note_path(note);

    let mut rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(envelope) = rx.recv().await {
            match envelope.event {
                Event::StateChanged { from, to, .. } => {
                    println!("  {} -> {}", from, paint(to));
                }
                Event::TurnFinished { .. } => break,
                _ => {}
            }
        }
    });

    println!();
    println!("Session {}", session_id.bold());
    agent.run_turn(input, session_id).await;
    // Turn is over; the printer stops at TurnFinished.
    let _ = printer.await;

    let ctx = agent
        .get_context(session_id)
        .context("Turn left no context behind")?;
    print_summary(&ctx);
    Ok(())
}

async fn show(agent: &AgentOrchestrator, session_id: &str) -> Result<()> {
    match agent.hydrate(session_id).await {
        Some(ctx) => {
            println!("{}", serde_json::to_string_pretty(&ctx)?);
        }
        None => println!("No stored context for session {}", session_id),
    }
    Ok(())
}

async fn cancel(agent: &AgentOrchestrator, session_id: &str) -> Result<()> {
    if agent.hydrate(session_id).await.is_none() {
        println!("No stored context for session {}", session_id);
        return Ok(());
    }

    agent.cancel_session(session_id).await;
    if let Some(ctx) = agent.get_context(session_id) {
        print_summary(&ctx);
    }
    Ok(())
}

fn print_summary(ctx: &ExecutionContext) {
    println!();
    println!("State:   {}", paint(ctx.state));
    if let Some(plan) = &ctx.plan {
        println!("Steps:   {}", plan.len());
    }
    println!("Retries: {}", ctx.retry_count);
    println!();
    println!("Transitions ({}):", ctx.transitions.len());
    for t in &ctx.transitions {
        println!(
            "  {} {} -> {}  {}",
            t.timestamp.format("%H:%M:%S"),
            t.from,
            paint(t.to),
            t.reason.as_deref().unwrap_or_default().dimmed()
        );
    }
    println!();
}

fn paint(state: AgentState) -> colored::ColoredString {
    match state {
        AgentState::Completed => state.as_str().green(),
        AgentState::Failed => state.as_str().red(),
        AgentState::Cancelled => state.as_str().yellow(),
        _ => state.as_str().normal(),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_agent=info,orchestrator=info".into()),
        )
        .init();
}
