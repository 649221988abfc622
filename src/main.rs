use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use table_truncator::metrics::render_metrics;
use table_truncator::ConnectionConfig;
use table_truncator::DynamoDbStorageClient;
use table_truncator::Result;
use table_truncator::TruncateMode;
use table_truncator::Truncator;
use table_truncator::TruncatorConfig;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Empty DynamoDB tables, in place or by recreating them.
#[derive(Debug, Parser)]
#[command(name = "truncator", version, about, long_about = None)]
struct Cli {
    #[arg(long, env = "AWS_ACCESS_KEY_ID", global = true)]
    access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", global = true, hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Named profile from the shared credentials file
    #[arg(long, env = "AWS_PROFILE", global = true)]
    profile: Option<String>,

    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Endpoint override, e.g. a local emulator
    #[arg(long, env = "AWS_ENDPOINT_URL", global = true)]
    endpoint: Option<String>,

    /// Extra configuration file layered over `CONFIG_PATH` and the defaults
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Delete every item of the given tables
    Truncate(TruncateArgs),
}

#[derive(Debug, Args)]
struct TruncateArgs {
    /// Comma separated table names
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    table_names: Vec<String>,

    /// Drop and recreate each table instead of deleting item by item
    #[arg(long)]
    recreate: bool,

    /// Print the metrics exposition after the run
    #[arg(long)]
    print_metrics: bool,
}

impl Cli {
    /// Flags win over whatever the configuration layers provide.
    fn connection(
        &self,
        base: ConnectionConfig,
    ) -> ConnectionConfig {
        ConnectionConfig {
            region: self.region.clone().or(base.region),
            endpoint: self.endpoint.clone().or(base.endpoint),
            profile: self.profile.clone().or(base.profile),
            access_key_id: self.access_key_id.clone().or(base.access_key_id),
            secret_access_key: self.secret_access_key.clone().or(base.secret_access_key),
        }
    }

    fn load_config(&self) -> Result<TruncatorConfig> {
        let mut config = TruncatorConfig::new()?;
        if let Some(path) = &self.config {
            config = config.with_override_config(path)?;
        }
        config.connection = self.connection(config.connection);
        config.validate()
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Command::Truncate(args) => truncate(args, config).await,
    }
}

async fn truncate(
    args: &TruncateArgs,
    config: TruncatorConfig,
) -> ExitCode {
    let tables: Vec<&str> = args
        .table_names
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if tables.is_empty() {
        error!("No table names were given.");
        return ExitCode::FAILURE;
    }

    let client = Arc::new(DynamoDbStorageClient::connect(&config.connection).await);
    let truncator = Truncator::new(client, config);
    let mode = TruncateMode::from_recreate_flag(args.recreate);

    info!("Truncating {} table(s) ({})...", tables.len(), mode);
    let errors = truncator.truncate(&tables, mode).await;

    if args.print_metrics {
        print!("{}", render_metrics());
    }

    if errors.is_empty() {
        return ExitCode::SUCCESS;
    }
    for e in &errors {
        eprintln!("{}: {}", e.table, e);
    }
    ExitCode::FAILURE
}
