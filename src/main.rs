// Binary entry point: load a company, bind it, replay client scripts against it

use anyhow::{Context, Result};
use car_rental::script::{load_script, run_script, StepOutcome};
use car_rental::{logging, CarRentalCompany, CompanyRegistry, ServerConfig};
use clap::Parser;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rental_server", about = "Serve a car rental company and replay client scripts")]
struct Args {
    #[arg(long, help = "Company name to bind in the registry")]
    company: Option<String>,

    #[arg(long, help = "Inventory file, one car type per line")]
    inventory: Option<PathBuf>,

    #[arg(long = "script", help = "Client script to replay; repeat to run several concurrently")]
    scripts: Vec<PathBuf>,

    #[arg(long, help = "Runtime worker threads")]
    workers: Option<usize>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            company_name: self.company.unwrap_or(defaults.company_name),
            inventory_path: self.inventory.unwrap_or(defaults.inventory_path),
            scripts: self.scripts,
            worker_threads: self.workers.unwrap_or(defaults.worker_threads).max(1),
        }
    }
}

fn main() -> Result<()> {
    logging::init();
    let config = Args::parse().into_config();
    info!(?config, "Starting rental server");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: ServerConfig) -> Result<()> {
    let company = CarRentalCompany::from_inventory_path(&config.company_name, &config.inventory_path)
        .with_context(|| format!("failed to load inventory from {}", config.inventory_path.display()))?;

    let registry = CompanyRegistry::new();
    registry.rebind(Arc::new(company));
    println!("{} bound", config.company_name);

    let mut sessions = Vec::with_capacity(config.scripts.len());
    for path in &config.scripts {
        let steps = load_script(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        let service = registry.connect(&config.company_name)?;
        sessions.push(async move {
            let outcomes = run_script(&service, &steps).await;
            (path, outcomes)
        });
    }

    for (path, outcomes) in join_all(sessions).await {
        println!("== {}", path.display());
        for outcome in outcomes {
            print_outcome(&outcome)?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: &StepOutcome) -> Result<()> {
    match outcome {
        StepOutcome::Listing(listing) if listing.is_empty() => println!("No car types available"),
        StepOutcome::Listing(listing) => println!("{}", listing),
        StepOutcome::Quoted(quote) => println!("{}", quote),
        StepOutcome::Reserved(reservation) => println!("{}", serde_json::to_string(reservation)?),
        StepOutcome::Reservations(reservations) => {
            println!("{}", serde_json::to_string_pretty(reservations)?)
        }
        StepOutcome::Count(count) => println!("{}", count),
        StepOutcome::Failed(e) => println!("Failed: {}", e),
    }
    Ok(())
}
