use anyhow::Result;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).with_target(true).finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
