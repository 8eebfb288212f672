//! Diagnostic CLI entry point
//!
//! Runs one orchestration for an occurrence given on the command line and
//! prints the resulting diagnosis as JSON. Operational smoke path for the
//! pipeline; the service layer calls [`orchestrator_rs::orchestrate`]
//! directly.

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;

use orchestrator_rs::{orchestrate, Severity};

#[derive(Parser)]
#[command(name = "fleet-diagnose")]
#[command(about = "FleetPred - diagnóstico preditivo de manutenção", long_about = None)]
struct Cli {
    /// Vehicle the occurrence was reported against
    #[arg(long)]
    veiculo_id: i64,

    /// Affected system (e.g. "Motor", "Freios", "Arrefecimento")
    #[arg(long)]
    sistema: String,

    /// Reported symptoms, comma separated
    #[arg(long, value_delimiter = ',')]
    sintomas: Vec<String>,

    /// Free-text description of the occurrence
    #[arg(long, default_value = "")]
    descricao: String,

    /// Reported severity: baixa, media, alta or critica
    #[arg(long, value_parser = parse_severity)]
    severidade: Severity,

    /// Current odometer reading in km
    #[arg(long)]
    km: f64,
}

fn parse_severity(label: &str) -> Result<Severity, String> {
    label.parse::<Severity>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let diagnosis = orchestrate(
        cli.veiculo_id,
        cli.sistema,
        cli.sintomas,
        cli.descricao,
        cli.severidade,
        cli.km,
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&diagnosis)?);
    Ok(())
}
