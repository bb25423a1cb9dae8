use anyhow::Result;
use tracing::info;

use crate::config::QuireConfig;

pub fn execute(config: QuireConfig) -> Result<()> {
    let site = super::assemble(&config)?;
    site.render_all()?;

    info!("Site built successfully in {}", site.output_dir().display());

    Ok(())
}
