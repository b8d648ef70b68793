use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use palisade::abac::engine::Resolver;
use palisade::abac::loader::load_rules;
use palisade::abac::types::DataSource;
use palisade::abac::AbacState;
use palisade::settings::Settings;
use palisade::web;
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "palisade",
    version,
    about = "Attribute-based access control decision service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP decision API (default)
    Serve,
    /// Decide a single request and print the decision as JSON
    Check {
        /// Resource name, e.g. "task"
        #[arg(long)]
        resource: String,
        /// Action name, e.g. "data_GET"
        #[arg(long)]
        action: String,
        /// JSON file with the subject's attributes
        #[arg(long)]
        subject: PathBuf,
        /// JSON file with context attributes
        #[arg(long)]
        context: Option<PathBuf>,
        /// Rule file or directory; overrides engine.rules_path
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging; stderr so `check` output stays machine-readable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let rules = load_rules(&settings.engine.rules_path)?;
            let state = AbacState {
                rules,
                default_resolution: settings.engine.default_resolution,
                mask_mode: settings.engine.mask_mode,
            };
            web::serve(settings, state).await?;
        }
        Command::Check {
            resource,
            action,
            subject,
            context,
            rules,
        } => {
            let rules_path = rules.unwrap_or_else(|| settings.engine.rules_path.clone());
            let rules = load_rules(&rules_path)?;

            let subject = read_json(&subject)?;
            let context = match context {
                Some(path) => read_json(&path)?,
                None => Value::Object(serde_json::Map::new()),
            };

            let resolver = Resolver::with_data(
                DataSource::new(subject, context),
                &rules,
                settings.engine.default_resolution,
            );
            let decision = resolver.check(&resource, &action);
            println!(
                "{}",
                serde_json::to_string_pretty(&decision).into_diagnostic()?
            );
        }
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&contents).into_diagnostic()
}
