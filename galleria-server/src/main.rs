mod config;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use galleria_core::operations::{
    HealChainOperation, HealChainOperationOutcome, HealChainOperationRequest,
};
use galleria_core::{MetadataStore, RecordStore, Result};
use server::run_server;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "galleria")]
#[command(about = "Photo galleries with a user-defined order")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Report chain inconsistencies without changing anything
    Check {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        /// Gallery to inspect; all galleries when omitted
        #[arg(short, long)]
        gallery: Option<String>,
    },
    /// Rebuild broken chains from what is still reachable
    Repair {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        #[arg(short, long)]
        gallery: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "galleria=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (config, gallery, repair) = match cli.command {
        Commands::Server { config } => {
            tracing::info!("Starting Galleria server with config: {}", config);
            let cfg = load_config(&config);

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Commands::Check { config, gallery } => (config, gallery, false),
        Commands::Repair { config, gallery } => (config, gallery, true),
    };

    let cfg = load_config(&config);
    if let Err(e) = heal_galleries(&cfg, gallery, repair).await {
        tracing::error!("Chain {} failed: {}", if repair { "repair" } else { "check" }, e);
        std::process::exit(1);
    }
}

fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Prints one JSON document per gallery. A check that finds issues fails.
async fn heal_galleries(cfg: &Config, gallery: Option<String>, repair: bool) -> Result<()> {
    let records = Arc::new(MetadataStore::new(cfg.database_path())?);

    let names = match gallery {
        Some(name) => vec![name],
        None => records
            .list_galleries()
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect(),
    };

    let operation = HealChainOperation::new(records);
    let mut unsound = 0;
    for name in names {
        let outcome = operation
            .run(HealChainOperationRequest {
                gallery: name,
                repair,
            })
            .await?;

        let rendered = match &outcome {
            HealChainOperationOutcome::Checked(report) => {
                if !report.is_sound() {
                    unsound += 1;
                }
                serde_json::to_string_pretty(report)?
            }
            HealChainOperationOutcome::Repaired(outcome) => {
                tracing::info!(
                    "Gallery {}: rewrote {} records",
                    outcome.gallery,
                    outcome.rewritten
                );
                serde_json::to_string_pretty(outcome)?
            }
        };
        println!("{}", rendered);
    }

    if unsound > 0 {
        return Err(galleria_core::GalleryError::PreconditionFailed(format!(
            "{} galleries have broken chains",
            unsound
        )));
    }
    Ok(())
}
