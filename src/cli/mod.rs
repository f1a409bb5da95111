//! CLI module for Feedscope.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Feedscope - ask questions about scraped Instagram and YouTube data
///
/// A tool-calling agent that searches, filters and aggregates JSON datasets
/// to answer natural-language questions.
#[derive(Parser, Debug)]
#[command(name = "feedscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FEEDSCOPE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the agent a question about the dataset
    Agent {
        /// The question (e.g., "Which hashtags get the most engagement?")
        query: String,

        /// Extra context as a JSON object
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read extra context from a JSON file
        #[arg(long)]
        context_file: Option<String>,

        /// Maximum number of model calls
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Stream model replies instead of waiting for each one
        #[arg(long)]
        stream: bool,

        /// Print the full run as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tools the agent can call
    Tools {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single tool directly
    Exec {
        /// Tool name (see `feedscope tools`)
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Show the consolidated media summaries
    Summary {
        /// instagram, youtube or all
        #[arg(default_value = "all")]
        platform: String,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start MCP server for AI assistant integration
    Mcp,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file if none exists
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_command() {
        let cli = Cli::try_parse_from([
            "feedscope",
            "-v",
            "agent",
            "top hashtags?",
            "--context",
            r#"{"creator": "ana"}"#,
            "-n",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Agent {
                query,
                context,
                max_iterations,
                stream,
                ..
            } => {
                assert_eq!(query, "top hashtags?");
                assert_eq!(context.as_deref(), Some(r#"{"creator": "ana"}"#));
                assert_eq!(max_iterations, Some(5));
                assert!(!stream);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_context_sources_conflict() {
        let result = Cli::try_parse_from([
            "feedscope",
            "agent",
            "q",
            "--context",
            "{}",
            "--context-file",
            "ctx.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exec_defaults_to_empty_params() {
        let cli = Cli::try_parse_from(["feedscope", "exec", "list_json_files"]).unwrap();
        match cli.command {
            Commands::Exec { tool, params } => {
                assert_eq!(tool, "list_json_files");
                assert_eq!(params, "{}");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
