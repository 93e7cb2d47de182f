use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use kiln_core::PipelineError;

mod cmd;
mod config;

/// Arguments shared by every subcommand, and by the bare `kiln` invocation.
pub fn add_common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./kiln.toml]")
                .global(true),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("DIR")
                .help("Directory containing templates [default: src]")
                .global(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory the site is rendered to [default: _site]")
                .global(true),
        )
        .arg(
            Arg::new("publish")
                .short('p')
                .long("publish")
                .value_name("DIR")
                .help("Directory the rendered site is copied to [default: public]")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only report warnings and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
}

pub fn make_command() -> Command {
    add_common_args(
        Command::new("kiln")
            .about("Render a template tree into a static site and publish it")
            .version(env!("CARGO_PKG_VERSION")),
    )
    .subcommand(cmd::build::make_subcommand())
    .subcommand(cmd::render::make_subcommand())
    .subcommand(cmd::copy::make_subcommand())
}

#[tokio::main]
async fn main() {
    if let Err(err) = main_result().await {
        eprintln!("Error: {err:?}");
        let code = err
            .downcast_ref::<PipelineError>()
            .map(PipelineError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn main_result() -> Result<()> {
    let matches = make_command().get_matches();

    match matches.subcommand() {
        Some(("render", args)) => cmd::render::execute(args).await,
        Some(("copy", args)) => cmd::copy::execute(args),
        Some(("build", args)) => cmd::build::execute(args),
        // Running `kiln` on its own is the default build task
        _ => cmd::build::execute(&matches),
    }
}
