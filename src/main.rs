//! Feedscope CLI entry point.

use anyhow::Result;
use clap::Parser;
use feedscope::cli::{commands, Cli, Commands};
use feedscope::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(Settings::expand_path);

    // Load configuration
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stderr keeps stdout clean for JSON output and the MCP transport
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("feedscope={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Execute command
    match cli.command {
        Commands::Agent {
            query,
            context,
            context_file,
            max_iterations,
            model,
            stream,
            json,
        } => {
            let options = commands::AgentOptions {
                context,
                context_file,
                max_iterations,
                model,
                stream,
                json,
            };
            commands::run_agent(&query, options, settings).await?;
        }

        Commands::Tools { json } => {
            commands::run_tools(json, settings)?;
        }

        Commands::Exec { tool, params } => {
            commands::run_exec(&tool, &params, settings).await?;
        }

        Commands::Summary { platform } => {
            commands::run_summary(&platform, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Mcp => {
            commands::run_mcp(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
