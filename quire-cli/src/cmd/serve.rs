use anyhow::Result;
use quire_dev_server::{DevServer, DevServerConfig};

use crate::config::QuireConfig;

pub async fn execute(config: QuireConfig) -> Result<()> {
    let site = super::assemble(&config)?;
    let (registry, ctx) = site.into_parts();

    let server_config = DevServerConfig {
        host: config.serve.host.clone(),
        port: config.serve.port,
        open: config.serve.open,
    };

    DevServer::new(server_config).run(registry, ctx).await
}
