//! algo-did: resolver for `did:algo` identifiers.
//!
//! Serves `GET /1.0/identifiers/:identifier` on top of an in-process
//! "custom" network, optionally seeded with documents at startup.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use algo_did::{Args, Config, LocalNetwork, ResolverServerBuilder, LOCAL_NETWORK};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Create configuration from arguments
    let config = Config::try_from(args)?;

    let network = LocalNetwork::deploy(&config)?;
    let seeded = network.seed(&config.seeds).await?;

    let server = ResolverServerBuilder::new()
        .config(config)
        .network(LOCAL_NETWORK, network.ledger.clone())
        .build();

    println!(
        r#"
DID resolver is starting at {}

Network: {}
Storage application: {}
Administrator: {}
"#,
        server.base_url(),
        LOCAL_NETWORK,
        network.app_id,
        network.admin,
    );
    for identifier in &seeded {
        println!("Seeded: {}/{}", server.base_url(), identifier);
    }
    println!("Press Ctrl+C to stop the server.");

    server.run().await
}
