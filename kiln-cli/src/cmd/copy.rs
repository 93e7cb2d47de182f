use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use kiln_core::{CopyTask, Task};

use crate::config::KilnConfig;

pub fn make_subcommand() -> Command {
    Command::new("copy").about("Copy the rendered site into the publish directory")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = KilnConfig::load(args)?;
    super::init_logging(config.build.quiet);

    CopyTask::new(&config.site.output, &config.build.publish)
        .run()
        .with_context(|| format!("Failed to publish {}", config.site.output))?;

    Ok(())
}
