//! x402 payment device.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p r402-ble-device --release
//!
//! # Run with a custom config path
//! r402-ble-device --config /path/to/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug r402-ble-device
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override listen address (default: `0.0.0.0`)
//! - `PORT` - Override listen port (default: `4402`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use r402_ble::Pipeline;
use r402_ble::networks::chain_id_by_name;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use r402_ble_device::DeviceConfig;
use r402_ble_device::transport::Transport;
use r402_ble_device::util::SigDown;

/// x402 payment device bridging a line transport to a remote facilitator.
#[derive(Parser, Debug)]
#[command(name = "r402-ble-device", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("Device failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = DeviceConfig::load_from(&args.config)?;
    tracing::info!(
        addr = %config.addr(),
        facilitator = %config.facilitator_url,
        network = %config.payment.network,
        price = %config.payment.price,
        "Loaded configuration"
    );

    let terms = Arc::new(config.terms()?);
    tracing::info!(
        network = %terms.network(),
        chain_id = ?chain_id_by_name(terms.network()),
        asset = %terms.asset().address,
        "Payment terms ready"
    );
    let profile = Arc::new(config.profile(Arc::clone(&terms)));
    let facilitator = config.facilitator()?;

    match facilitator.supported().await {
        Ok(supported) if supported.supports(1, terms.scheme(), terms.network()) => {
            tracing::info!(network = %terms.network(), "Facilitator supports configured network");
        }
        Ok(_) => {
            tracing::warn!(
                network = %terms.network(),
                "Facilitator does not list the configured network; payments may fail"
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not query facilitator capabilities");
        }
    }

    let pipeline = Pipeline::start(facilitator, config.queue_capacity);
    let transport = Transport::new(profile, pipeline.queue(), config.max_payload_bytes);

    let sig_down = SigDown::try_new()?;
    let listener = TcpListener::bind(config.addr()).await?;
    tracing::info!("Device listening on {}", config.addr());

    let served = transport
        .serve(listener, sig_down.cancellation_token())
        .await;
    // A failed listener still stops the signal task and drains accepted payments.
    sig_down.cancel();
    sig_down.recv().await;
    pipeline.shutdown().await;
    served?;

    tracing::info!("Device shut down gracefully");
    Ok(())
}
