pub mod build;
pub mod copy;
pub mod render;

/// Start logging at `info`, or `warn` when quiet. `RUST_LOG` takes precedence.
pub fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .try_init();
}
