//! Bitbuy partner API command-line client.

use anyhow::{Context, Result};
use bitbuy_client::config::Config;
use bitbuy_client::exchange::signer::{self, RequestSigner, SIGNATURE_HEADER};
use bitbuy_client::exchange::{BitbuyClient, Credentials, PartnerApi, Wallet};
use bitbuy_client::utils::decimal::{fiat_totals, non_zero};
use clap::{Parser, Subcommand};
use reqwest::{Method, Request, Url};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Bitbuy partner API CLI
#[derive(Parser)]
#[command(name = "bitbuy")]
#[command(version, about = "Authenticated access to the Bitbuy partner API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List wallet balances
    Wallets {
        /// Hide wallets with a zero balance
        #[arg(long)]
        non_zero: bool,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical payload and signature for a request without sending it
    Sign {
        /// Endpoint path, e.g. /api/v1/wallets
        #[arg(short, long)]
        path: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request body (ignored for GET)
        #[arg(short, long)]
        body: Option<String>,

        /// Extra query string, without the leading '?'
        #[arg(short, long)]
        query: Option<String>,

        /// Stamp in milliseconds since epoch (defaults to now)
        #[arg(short, long)]
        stamp: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging()?;

    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;
    debug!("Loaded configuration: {:?}", config);

    match cli.command {
        Commands::Wallets { non_zero, json } => run_wallets(&config, non_zero, json).await,
        Commands::Sign {
            path,
            method,
            body,
            query,
            stamp,
        } => run_sign(&config, &path, &method, body, query.as_deref(), stamp),
    }
}

/// Cancel `token` on Ctrl-C or once `deadline` elapses.
fn spawn_cancel_watcher(token: CancellationToken, deadline: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling request");
                token.cancel();
            }
            _ = tokio::time::sleep(deadline) => {
                warn!("Request deadline of {:?} reached, cancelling", deadline);
                token.cancel();
            }
        }
    });
}

async fn run_wallets(config: &Config, hide_empty: bool, json: bool) -> Result<()> {
    let client = BitbuyClient::from_config(&config.bitbuy)?;
    info!("Fetching wallets from {}", client.base_url());

    let cancel = CancellationToken::new();
    spawn_cancel_watcher(
        cancel.clone(),
        Duration::from_secs(config.http.request_timeout_secs),
    );

    let wallets = fetch_wallets(&client, &cancel).await;
    cancel.cancel();
    let wallets = wallets?;

    let shown: Vec<&Wallet> = if hide_empty {
        non_zero(&wallets)
    } else {
        wallets.iter().collect()
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&shown).context("Failed to encode wallets")?
        );
        return Ok(());
    }

    print_wallets(&shown);
    Ok(())
}

async fn fetch_wallets(api: &dyn PartnerApi, cancel: &CancellationToken) -> Result<Vec<Wallet>> {
    api.get_wallets(cancel)
        .await
        .with_context(|| format!("Failed to fetch {} wallets", api.venue_name()))
}

fn print_wallets(wallets: &[&Wallet]) {
    if wallets.is_empty() {
        println!("No wallets.");
        return;
    }

    println!(
        "{:<16} {:>24} {:>24} {:>24} {:>16}",
        "ASSET", "BALANCE", "RESERVED", "AVAILABLE", "FIAT VALUE"
    );
    for wallet in wallets {
        println!(
            "{:<16} {:>24} {:>24} {:>24} {:>12} {}",
            wallet.label(),
            wallet.balance.to_string(),
            wallet.reserved_balance.to_string(),
            wallet.available_balance.to_string(),
            wallet.fiat_balance.to_string(),
            wallet.fiat_currency_symbol
        );
    }

    println!();
    for (fiat, total) in fiat_totals(wallets.iter().copied()) {
        println!("Total {}: {}", fiat, total);
    }
}

fn run_sign(
    config: &Config,
    path: &str,
    method: &str,
    body: Option<String>,
    query: Option<&str>,
    stamp: Option<i64>,
) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))?;
    let mut url = Url::parse(&format!("{}{}", config.bitbuy.base_url, path))
        .with_context(|| format!("Invalid path: {}", path))?;
    url.set_query(query);

    let mut request = Request::new(method, url);
    if let Some(body) = body {
        *request.body_mut() = Some(body.into());
    }

    let credentials = Credentials::new(
        config.bitbuy.public_key.clone(),
        config.bitbuy.private_key.clone(),
    );
    let stamp = stamp.unwrap_or_else(signer::timestamp_ms);
    RequestSigner::new(&credentials)
        .sign_at(&mut request, stamp)
        .context("Failed to sign request")?;

    let payload = signer::canonical_payload(&request).context("Failed to build payload")?;
    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    println!("url:       {}", request.url());
    println!("payload:   {}", payload);
    println!("signature: {}", signature);
    Ok(())
}

/// Library spans at debug, the binary's own events and everything else at
/// info. Per-target `RUST_LOG` directives for other crates still apply.
fn log_filter(base: EnvFilter) -> Result<EnvFilter> {
    Ok(base
        .add_directive(Level::INFO.into())
        .add_directive("bitbuy_client=debug".parse()?)
        .add_directive("bitbuy=info".parse()?))
}

fn init_logging() -> Result<WorkerGuard> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "bitbuy.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // stdout is reserved for command output.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .with_writer(std::io::stderr.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    Ok(guard)
}
