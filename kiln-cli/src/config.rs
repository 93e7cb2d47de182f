use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use kiln_core::{DataSource, RemoteJsonProvider, SiteConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "./kiln.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KilnConfig {
    /// Pipeline configuration
    pub build: BuildConfig,
    /// Generator configuration (from kiln-core)
    pub site: SiteConfig,
    /// Remote page data
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Configuration file path
    pub config: String,
    /// Directory the rendered site is published to
    pub publish: String,
    /// Only log warnings and errors
    pub quiet: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            config: DEFAULT_CONFIG_FILE.to_string(),
            publish: "public".to_string(),
            quiet: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Fetch the remote value at build time
    pub enabled: bool,
    #[serde(flatten)]
    pub provider: RemoteJsonProvider,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: RemoteJsonProvider::default(),
        }
    }
}

impl KilnConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (KILN_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .get_one::<String>("config")
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        }

        // 3. Add environment variables with KILN_ prefix
        builder = builder.add_source(
            Environment::with_prefix("KILN")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .list_separator(",")
                .with_list_parse_key("site.template_formats")
                .with_list_parse_key("site.passthrough_copy")
                .try_parsing(true),
        );

        // 4. Override with CLI arguments (highest priority)
        builder = builder.set_override("build.config", config_file.as_str())?;
        if let Some(input) = args.get_one::<String>("input") {
            builder = builder.set_override("site.input", input.as_str())?;
        }
        if let Some(output) = args.get_one::<String>("output") {
            builder = builder.set_override("site.output", output.as_str())?;
        }
        if let Some(publish) = args.get_one::<String>("publish") {
            builder = builder.set_override("build.publish", publish.as_str())?;
        }
        if args.get_flag("quiet") {
            builder = builder.set_override("build.quiet", true)?;
        }

        // Build and deserialize
        let config = builder.build()?;
        let kiln_config: KilnConfig = config.try_deserialize()?;

        Ok(kiln_config)
    }

    /// Data sources for a render, in resolution order
    pub fn data_sources(&self) -> Vec<DataSource> {
        if !self.data.enabled {
            return Vec::new();
        }
        vec![DataSource::Remote(self.data.provider.clone())]
    }
}
