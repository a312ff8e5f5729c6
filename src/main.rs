use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use learnserver::core::config::AppConfig;
use learnserver::core::shared::state::AppState;
use learnserver::learn::seed::seed_demo_catalog;
use learnserver::main_module::run_axum_server;
use learnserver::store;

const USAGE: &str = "Usage: learnserver [--seed] [--config <path>]

Options:
  --seed            Load the demo course catalog on startup
  --config <path>   Configuration file (default: learnserver.toml or $LEARN_CONFIG)
  -h, --help        Show this message";

struct CliArgs {
    seed: bool,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Option<CliArgs>, String> {
    let mut parsed = CliArgs {
        seed: false,
        config: None,
    };
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => parsed.seed = true,
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| "--config needs a path".to_string())?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(Some(parsed))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Run 'learnserver --help' for usage information");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("learnserver=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli).await {
        error!("Startup failed: {e:#}");
        return Err(std::io::Error::other(e.to_string()));
    }
    Ok(())
}

async fn run(cli: CliArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.seed {
        config.learn.seed_demo_catalog = true;
    }
    let addr = config.bind_addr()?;

    let store = store::open(&config.store)?;
    store.ping().await?;
    info!("Document store ready ({:?} backend)", config.store.backend);

    if config.learn.seed_demo_catalog {
        seed_demo_catalog(store.as_ref()).await?;
    }

    let state = Arc::new(AppState::from_config(config, store)?);
    run_axum_server(state, addr).await?;
    Ok(())
}
