mod device;
mod docker;
mod server;
mod shared;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use shared::config::ManagerConfig;
use shared::models::ContainerRecord;

#[derive(Parser)]
#[command(name = "octoprint-manager")]
#[command(about = "Runs one OctoPrint container per attached 3D printer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ManagerConfig,

    /// Host for API server
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0", global = true)]
    host: String,

    /// Port for API server
    #[arg(short, long, env = "PORT", default_value_t = 3000, global = true)]
    port: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile recorded containers and serve the REST API (default command)
    Serve,

    /// Reconcile recorded containers once and exit
    Reconcile,

    /// Print the recorded containers
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.config.prepare()?;

    if let Err(e) = shared::logging::init_logging(&config.log_dir(), "octoprint-manager") {
        eprintln!("Warning: failed to initialize file logging: {e:#}");
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            server::rest::server::run_rest_server(&config, &cli.host, cli.port).await?;
        }
        Commands::Reconcile => reconcile(&config).await?,
        Commands::List => list(&config).await?,
    }

    Ok(())
}

async fn reconcile(config: &ManagerConfig) -> Result<()> {
    let state = shared::initialize_app_state(config).await?;
    state.lifecycle.ensure_image().await?;

    let report = state.lifecycle.reconcile_all().await?;
    for failure in &report.failures {
        warn!("Container {} did not converge: {}", failure.id, failure.error);
    }
    for row in &report.invalid {
        warn!("Container row {} is unreadable: {}", row.id, row.error);
    }

    let converged = report.into_result()?;
    for (id, action) in &converged {
        println!("{}  {:?}", id, action);
    }
    info!("All {} container(s) running", converged.len());
    Ok(())
}

async fn list(config: &ManagerConfig) -> Result<()> {
    let db = shared::init_database(&config.database_path())
        .await
        .context("Failed to open container database")?;
    let records = ContainerRecord::find_all(&db).await?;

    if records.is_empty() {
        println!("No containers recorded");
        return Ok(());
    }

    println!("{:<36}  {:>5}  {:<20}  DEVICE", "ID", "PORT", "NAME");
    for record in records {
        println!(
            "{:<36}  {:>5}  {:<20}  {}",
            record.id,
            record.port,
            record.name.as_deref().unwrap_or("-"),
            record.device
        );
    }
    Ok(())
}
