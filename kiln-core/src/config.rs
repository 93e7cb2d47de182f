use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown template format: {0}")]
    UnknownFormat(String),
}

/// A file extension the generator treats as a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    Html,
    Njk,
    Md,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Html => "html",
            TemplateFormat::Njk => "njk",
            TemplateFormat::Md => "md",
        }
    }
}

impl FromStr for TemplateFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(TemplateFormat::Html),
            "njk" => Ok(TemplateFormat::Njk),
            "md" => Ok(TemplateFormat::Md),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Syntax used to pre-process markdown and html bodies.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    #[default]
    Njk,
    None,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    /// Source tree root
    pub input: String,
    /// Destination tree root
    pub output: String,
    /// Layouts and partials, relative to `input`
    pub includes: String,
    /// Global data files, relative to `input`
    pub data: String,
    pub template_formats: Vec<String>,
    pub markdown_template_engine: TemplateEngine,
    pub html_template_engine: TemplateEngine,
    /// Copy non-template files from `input` to `output`
    pub passthrough_file_copy: bool,
    /// Extra paths copied straight through, relative to the working directory
    pub passthrough_copy: Vec<String>,
    /// Highlighting theme for fenced code in markdown
    pub syntax_theme: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input: "src".into(),
            output: "_site".into(),
            includes: "_includes".into(),
            data: "_data".into(),
            template_formats: vec!["html".into(), "njk".into(), "md".into()],
            markdown_template_engine: TemplateEngine::Njk,
            html_template_engine: TemplateEngine::Njk,
            passthrough_file_copy: true,
            passthrough_copy: vec!["assets".into()],
            syntax_theme: "base16-ocean.dark".into(),
        }
    }
}

impl SiteConfig {
    /// Parse `template_formats` into known formats, rejecting unknown names.
    pub fn formats(&self) -> Result<Vec<TemplateFormat>, ConfigError> {
        self.template_formats.iter().map(|f| f.parse()).collect()
    }

    pub fn includes_dir(&self) -> std::path::PathBuf {
        Path::new(&self.input).join(&self.includes)
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        Path::new(&self.input).join(&self.data)
    }

    pub fn engine_for(&self, format: TemplateFormat) -> TemplateEngine {
        match format {
            TemplateFormat::Njk => TemplateEngine::Njk,
            TemplateFormat::Html => self.html_template_engine,
            TemplateFormat::Md => self.markdown_template_engine,
        }
    }
}
