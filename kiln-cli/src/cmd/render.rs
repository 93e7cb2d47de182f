use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use kiln_core::build_site;
use kiln_core::data::resolve_all;

use crate::config::KilnConfig;

pub fn make_subcommand() -> Command {
    Command::new("render").about("Fetch page data and render templates into the output directory")
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = KilnConfig::load(args)?;
    super::init_logging(config.build.quiet);

    // Every data source resolves before the first template renders
    let data = resolve_all(&config.data_sources())
        .await
        .context("Failed to fetch page data")?;

    let report = build_site(&config.site, data)
        .with_context(|| format!("Failed to render {}", config.site.input))?;

    log::info!("{report}");

    Ok(())
}
