use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod agent;
mod config;
mod error;
mod llm;
mod models;
mod modes;
mod output;
mod prompt;
mod runner;
mod schema;
mod tools;
mod validator;

use crate::config::{Config, ServerParameters, ServerType};
use crate::modes::EvaluationMode;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Agent capability evaluation - have an agent report on its tools, or interview it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Evaluation mode: introspect or interview
    #[arg(short, long, value_enum)]
    mode: EvaluationMode,

    /// Output format: console, json, yaml or html
    #[arg(short, long, value_enum, default_value = "console")]
    output: OutputFormat,

    /// Tool server transport: stdio or sse
    #[arg(long, value_enum)]
    server_type: Option<ServerType>,

    /// Tool server command line (stdio) or URL (sse)
    #[arg(long)]
    server_params: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model override
    #[arg(long)]
    model: Option<String>,

    /// Directory for report artifacts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory holding the HTML templates
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Verbose output - log every agent step and tool call
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Load the config file, if any, and apply command-line overrides
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(template_dir) = &self.template_dir {
            config.template_dir = template_dir.clone();
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.server_type.is_some() && args.server_params.is_none() {
        Args::command()
            .error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "--server-params is required when --server-type is given",
            )
            .exit();
    }

    let config = args.load_config()?;
    let server = ServerParameters::resolve(
        args.server_type,
        args.server_params.as_deref(),
        &config.stdio_env,
    )?;

    let runner = Runner::new(config);
    let outcome = runner.run(args.mode, &server, args.output).await?;

    for path in &outcome.artifacts {
        println!("Report saved as {}", path.display());
    }
    if outcome.degraded {
        tracing::warn!("HTML output was unavailable; the report was saved as JSON instead");
    }

    Ok(())
}
