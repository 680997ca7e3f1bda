//! respcache - fetch HTTP responses through a local TTL cache

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use respcache::cli::{Cli, Command};
use respcache::{derive_key, CacheConfig, CachedFetcher};

/// Sets up logging to stderr, filtered by RUST_LOG
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "respcache=debug"
    } else {
        "respcache=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CacheConfig::from_env();
    if let Some(dir) = cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    let fetcher = CachedFetcher::new(config);

    match cli.command {
        Command::Fetch(args) => {
            let request = args.to_request()?;
            if args.decode {
                let decoded = fetcher.fetch_decoded::<serde_json::Value>(&request).await?;
                println!("{}", serde_json::to_string_pretty(&decoded.value)?);
            } else {
                let response = fetcher.fetch(&request).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Command::Inspect(args) => {
            let inspected = fetcher.inspect(
                &args.name,
                Duration::from_secs(args.ttl),
                !args.read_only,
            )?;
            let output = json!({
                "status": inspected.data.status,
                "body": inspected.data.body,
                "modified_at": inspected.modified_at.to_rfc3339(),
                "is_stale": inspected.is_stale,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Key(args) => {
            let request = args.to_request()?;
            println!(
                "{}",
                derive_key(&request.method, &request.url, &request.headers)
            );
        }
        Command::Clear { name } => {
            if fetcher.store().remove(&name)? {
                println!("Removed {}", name);
            } else {
                println!("No cache entry for {}", name);
            }
        }
        Command::List => {
            for key in fetcher.store().keys()? {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
