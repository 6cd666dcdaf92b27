mod document_commands;

use {
    chanstore_config::ChanstoreConfig,
    clap::Parser,
    std::{path::PathBuf, time::Duration},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chanstore", about = "chanstore — documents stored as Discord messages")]
struct Cli {
    #[command(subcommand)]
    command: document_commands::DocumentAction,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (skips discovery of `chanstore.toml`).
    #[arg(long, global = true, env = "CHANSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Guild id (overrides config value).
    #[arg(long, global = true)]
    guild_id: Option<u64>,

    /// Seconds to wait for the Discord session to become ready.
    #[arg(long, global = true, default_value_t = 30)]
    ready_timeout: u64,
}

/// Logs go to stderr so stdout stays parseable JSON.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ChanstoreConfig> {
    let config = match &cli.config {
        Some(path) => chanstore_config::load_config(path)?,
        None => chanstore_config::discover_and_load(),
    };
    let mut config = chanstore_config::apply_env_overrides(config)?;
    if let Some(guild_id) = cli.guild_id {
        config.discord.guild_id = guild_id;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "chanstore starting");

    let config = load_config(&cli)?;
    document_commands::handle_documents(
        cli.command,
        &config,
        Duration::from_secs(cli.ready_timeout),
    )
    .await
}
