use quire_core::{Site, SiteBuilder};

use crate::config::QuireConfig;

pub mod build;
pub mod serve;

/// Assemble the site described by `config`, with reference pages for this
/// binary's own command line.
pub fn assemble(config: &QuireConfig) -> anyhow::Result<Site> {
    let site = SiteBuilder::new(config.site.clone())
        .cli_reference(crate::cli())
        .dev(config.serve.dev)
        .build()?;

    Ok(site)
}
