use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use k8s_sidecar::{init_tracing, KubeSource, LogConfig, SidecarConfig, Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&LogConfig::from_env()).context("failed to initialize logging")?;

    info!("Starting config map collector v{}", env!("CARGO_PKG_VERSION"));

    let config = match SidecarConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Effective configuration: {}",
        serde_json::to_string(&config).context("failed to serialize configuration")?
    );

    let source = KubeSource::connect(config.skip_tls_verify)
        .await
        .context("failed to connect to the cluster")?;

    let mut supervisor = Supervisor::new(&config, Arc::new(source))?;
    supervisor.start(config.method).await?;

    Ok(())
}
