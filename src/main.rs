//! Admission risk - Main Entry Point
//!
//! Runs the prediction server by default, or one of the offline commands.

use clap::Parser;
use admit_risk::cli::{Cli, Commands, cmd_inspect, cmd_predict, cmd_serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admit_risk=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, host, model, feature_params }) => {
            cmd_serve(host, port, model, feature_params).await?;
        }
        Some(Commands::Predict { model, data, output, feature_params }) => {
            cmd_predict(&model, &data, &output, feature_params.as_deref())?;
        }
        Some(Commands::Inspect { data, params_out }) => {
            cmd_inspect(&data, params_out.as_deref())?;
        }
        None => {
            // Default: serve with environment configuration
            cmd_serve(None, None, None, None).await?;
        }
    }

    Ok(())
}
