use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use unitool_agent::{CancellationToken, ConversationOrchestrator, OllamaBackend};

mod app;
mod config;
mod error;
mod providers;

use config::CliConfig;
use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "unitool", version)]
#[command(about = "Unitool CLI - chat with a model that can call local and MCP tools")]
struct Cli {
    /// Configuration file (default: ./unitool.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every registered tool
    Tools,
    /// Chat with the configured model
    Chat {
        /// Answer a single query and exit
        #[arg(long)]
        prompt: Option<String>,
        /// Print the answer once it is complete instead of streaming it
        #[arg(long)]
        no_stream: bool,
        /// Override the backend model
        #[arg(long)]
        model: Option<String>,
        /// Override the backend endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Invoke a tool directly
    Call {
        /// Tool name (case-insensitive)
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

/// Install the global subscriber; fails when one is already installed.
fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Tools => {
            let registry = app::build_registry(&config).await?;
            app::print_tools(&registry, &mut std::io::stdout())?;
        }
        Commands::Call { name, args } => {
            let registry = app::build_registry(&config).await?;
            let result = app::call_tool(&registry, &name, &args).await?;
            println!("{}", result.render());
            if result.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Chat {
            prompt,
            no_stream,
            model,
            endpoint,
        } => {
            if let Some(model) = model {
                config.backend.model = model;
            }
            if let Some(endpoint) = endpoint {
                config.backend.endpoint = endpoint;
            }

            let registry = Arc::new(app::build_registry(&config).await?);
            app::print_tools(&registry, &mut std::io::stdout())?;

            let backend = Arc::new(OllamaBackend::new(&config.backend.endpoint, &config.backend.model));
            let orchestrator =
                ConversationOrchestrator::new(backend, registry, config.orchestrator_config()?)?;
            let mut stdout = std::io::stdout();

            match prompt {
                Some(prompt) => {
                    app::answer(&orchestrator, &prompt, !no_stream, CancellationToken::new(), &mut stdout)
                        .await?;
                }
                None => {
                    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                    app::chat_loop(&orchestrator, stdin, &mut stdout, !no_stream).await?;
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("Warning: logging disabled: {e}");
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "unitool failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn second_logger_install_is_reported() {
        // The first install may already have been done by another test.
        let _ = init_logging(LogFormat::Text);
        assert!(init_logging(LogFormat::Json).is_err());
    }

    #[test]
    fn chat_flags_parse() {
        let cli = Cli::try_parse_from([
            "unitool",
            "chat",
            "--prompt",
            "Add 2 3",
            "--no-stream",
            "--log-format",
            "text",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Text);
        match cli.command {
            Commands::Chat { prompt, no_stream, .. } => {
                assert_eq!(prompt.as_deref(), Some("Add 2 3"));
                assert!(no_stream);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn call_defaults_to_empty_arguments() {
        let cli = Cli::try_parse_from(["unitool", "call", "GetPopulation"]).unwrap();
        match cli.command {
            Commands::Call { name, args } => {
                assert_eq!(name, "GetPopulation");
                assert_eq!(args, "{}");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
