use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use kiln_core::{CopyTask, Pipeline, RenderTask, Task};

use crate::config::KilnConfig;

pub fn make_subcommand() -> Command {
    Command::new("build").about("Render the site in a child process, then copy it to the publish directory")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = KilnConfig::load(args)?;
    super::init_logging(config.build.quiet);

    let exe = std::env::current_exe().context("Cannot locate the kiln executable")?;

    let tasks: Vec<Box<dyn Task>> = vec![
        Box::new(RenderTask::new(exe, render_args(&config))),
        Box::new(CopyTask::new(&config.site.output, &config.build.publish)),
    ];
    let mut pipeline = Pipeline::series(tasks);
    pipeline.run()?;

    log::info!("Published {} to {}", config.site.output, config.build.publish);

    Ok(())
}

/// Arguments for the child `kiln render`, pinned to the resolved paths.
fn render_args(config: &KilnConfig) -> Vec<String> {
    vec![
        "render".to_string(),
        "--quiet".to_string(),
        "--config".to_string(),
        config.build.config.clone(),
        "--input".to_string(),
        config.site.input.clone(),
        "--output".to_string(),
        config.site.output.clone(),
    ]
}
