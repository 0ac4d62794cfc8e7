//! VitalView CLI: upload a sensor recording for analysis and print the result.
//!
//! Set VITALVIEW_TOKEN (or pass --token) and optionally VITALVIEW_ANALYSIS_API_URL.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use vitalview_api_client::{AnalysisSlot, ApiClient, UploadFile};
use vitalview_cli::{init_tracing, load_payload, render_payload_summary};
use vitalview_core::{ClientConfig, ErrorMetadata, RetryBudget};

#[derive(Parser)]
#[command(name = "vitalview", about = "VitalView analysis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a recording and wait for its analysis
    Analyze {
        /// Path to the recording
        file: PathBuf,
        /// Bearer token (defaults to VITALVIEW_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Maximum number of result polls
        #[arg(long)]
        max_retries: Option<u32>,
        /// Delay between polls in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Print a per-metric summary instead of the raw result
        #[arg(long)]
        summary: bool,
    },
    /// Summarize a saved analysis result
    Summarize {
        /// Path to a JSON result document
        file: PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            token,
            max_retries,
            delay_ms,
            summary,
        } => {
            let config = ClientConfig::from_env().context("Invalid client configuration")?;
            let token = token
                .or_else(|| config.auth_token.clone())
                .context("No bearer token. Set VITALVIEW_TOKEN or pass --token")?;
            let budget = RetryBudget::from_millis(
                max_retries.unwrap_or(config.max_retries),
                delay_ms.unwrap_or(config.poll_delay_ms),
            )?;

            let client = ApiClient::from_config(&config).context("Failed to create API client")?;
            let upload = UploadFile::from_path(&file).await?;

            let slot = Arc::new(AnalysisSlot::new());
            let invocation = slot.supersede();

            let interrupt = Arc::clone(&slot);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, cancelling analysis");
                    interrupt.cancel_in_flight();
                }
            });

            let payload = slot
                .run_invocation(&invocation, &client, &upload, &token, budget)
                .await
                .map_err(|e| {
                    let message = e.client_message();
                    anyhow::Error::new(e).context(message)
                })?;

            if summary {
                print!("{}", render_payload_summary(&payload));
            } else {
                print_json(&payload)?;
            }
        }
        Commands::Summarize { file } => {
            let payload = load_payload(&file)?;
            print!("{}", render_payload_summary(&payload));
        }
    }

    Ok(())
}
