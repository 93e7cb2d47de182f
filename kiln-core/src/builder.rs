use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::{SiteConfig, TemplateEngine, TemplateFormat};
use crate::data::{DataContext, DataError, load_global_data};
use crate::frontmatter::{FrontMatter, FrontMatterError};
use crate::markdown::{first_heading, render_markdown};
use crate::publish::{PublishError, copy_file, copy_path};
use crate::renderer::LayoutChain;
use crate::scanner::{ScanError, SiteScanner};
use crate::site::{Page, SourceFile, SourceKind, default_out_path, permalink_out_path};
use crate::template::{TemplateError, TemplateRenderer, template_name};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Scan error: {0}")]
    ScanError(#[from] ScanError),
    #[error("Data error: {0}")]
    DataError(#[from] DataError),
    #[error("Template error in {}: {source}", .path.display())]
    TemplateError {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
    #[error("Front matter error in {}: {source}", .path.display())]
    FrontMatterError {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("{} and {} both write {}", .first.display(), .second.display(), .out_path.display())]
    DuplicateOutput {
        out_path: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
    #[error(transparent)]
    PublishError(#[from] PublishError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// What a render pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub pages_written: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub elapsed: Duration,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} pages and copied {} files in {:.2} seconds",
            self.pages_written,
            self.files_copied,
            self.elapsed.as_secs_f64()
        )?;
        if self.files_skipped > 0 {
            write!(f, " ({} files skipped)", self.files_skipped)?;
        }
        Ok(())
    }
}

pub struct SiteBuilder<'a> {
    config: &'a SiteConfig,
    data: DataContext,
}

impl<'a> SiteBuilder<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            data: DataContext::new(),
        }
    }

    /// Resolved provider data, visible to every template under the input directory.
    pub fn data(mut self, data: DataContext) -> Self {
        self.data.extend(data);
        self
    }

    /// Scan the input tree, load includes and global data, and prepare every page.
    pub fn build(self) -> Result<Site<'a>, BuildError> {
        let config = self.config;
        let input_dir = PathBuf::from(&config.input);

        let sources = SiteScanner::new(config)?.scan()?;

        let includes_dir = config.includes_dir();
        let mut templates = TemplateRenderer::with_includes(&includes_dir).map_err(|source| {
            BuildError::TemplateError {
                path: includes_dir.clone(),
                source,
            }
        })?;

        // Global data sits below provider data
        let mut data = load_global_data(config.data_dir())?;
        data.extend(self.data);

        let mut pages = Vec::new();
        let mut passthrough = Vec::new();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for source in sources {
            let SourceKind::Template(format) = source.kind else {
                passthrough.push(source);
                continue;
            };

            let page = prepare_page(config, &mut templates, &data, source, format)?;
            if let Some(out_path) = &page.out_path {
                if let Some(first) = claimed.insert(out_path.clone(), page.source.path.clone()) {
                    return Err(BuildError::DuplicateOutput {
                        out_path: out_path.clone(),
                        first,
                        second: page.source.path.clone(),
                    });
                }
            }
            pages.push(page);
        }

        Ok(Site {
            config,
            input_dir,
            output_dir: PathBuf::from(&config.output),
            templates,
            data,
            pages,
            passthrough,
        })
    }
}

fn prepare_page(
    config: &SiteConfig,
    templates: &mut TemplateRenderer,
    data: &DataContext,
    source: SourceFile,
    format: TemplateFormat,
) -> Result<Page, BuildError> {
    let raw = std::fs::read_to_string(&source.abs_path)?;
    let front_matter = FrontMatter::parse(&raw).map_err(|e| BuildError::FrontMatterError {
        path: source.abs_path.clone(),
        source: e,
    })?;

    if config.engine_for(format) == TemplateEngine::Njk {
        templates
            .add_template(&page_template_name(config, &source), &front_matter.body)
            .map_err(|e| BuildError::TemplateError {
                path: source.abs_path.clone(),
                source: e,
            })?;
    }

    let out_path = match front_matter.permalink() {
        None => Some(default_out_path(&source.path)),
        Some(None) => None,
        Some(Some(permalink)) => {
            let mut scope = data.clone();
            scope.extend(front_matter.data.clone());
            let rendered = TemplateRenderer::render_one_off(permalink, &scope).map_err(|e| {
                BuildError::TemplateError {
                    path: source.abs_path.clone(),
                    source: e,
                }
            })?;
            Some(permalink_out_path(&rendered))
        }
    };

    Ok(Page {
        source,
        format,
        front_matter,
        out_path,
    })
}

fn page_template_name(config: &SiteConfig, source: &SourceFile) -> String {
    template_name(&Path::new(&config.input).join(&source.path))
}

/// A prepared site: every page parsed and registered, ready to write.
pub struct Site<'a> {
    config: &'a SiteConfig,
    input_dir: PathBuf,
    output_dir: PathBuf,
    templates: TemplateRenderer,
    data: DataContext,
    pages: Vec<Page>,
    passthrough: Vec<SourceFile>,
}

impl Site<'_> {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn passthrough(&self) -> &[SourceFile] {
        &self.passthrough
    }

    /// Data visible to the given page, lowest precedence first: global and
    /// provider data, its layouts' front matter, its own front matter, `page`.
    fn page_data(&self, page: &Page, layouts: &LayoutChain) -> Result<DataContext, BuildError> {
        let mut scope = self.data.clone();
        scope.extend(layouts.data());
        scope.extend(page.front_matter.data.clone());
        scope.insert(
            "page".to_string(),
            serde_json::to_value(page.info(&self.input_dir, &self.output_dir))?,
        );
        Ok(scope)
    }

    fn render_page(&self, page: &Page) -> Result<String, BuildError> {
        let wrap = |source: TemplateError| BuildError::TemplateError {
            path: page.source.abs_path.clone(),
            source,
        };
        let layouts = LayoutChain::resolve(&self.templates, page.front_matter.layout()).map_err(wrap)?;
        let mut scope = self.page_data(page, &layouts)?;

        let body = match self.config.engine_for(page.format) {
            TemplateEngine::Njk => self
                .templates
                .render(&page_template_name(self.config, &page.source), &scope)
                .map_err(wrap)?,
            TemplateEngine::None => page.front_matter.body.clone(),
        };

        let content = match page.format {
            TemplateFormat::Md => {
                if !scope.contains_key("title") {
                    if let Some(title) = first_heading(&body) {
                        scope.insert("title".to_string(), Value::String(title));
                    }
                }
                render_markdown(&body, &self.config.syntax_theme)
            }
            TemplateFormat::Html | TemplateFormat::Njk => body,
        };

        layouts.apply(&self.templates, content, &scope).map_err(wrap)
    }

    /// Render every page, copy passthrough files and the configured
    /// passthrough paths. The output directory is not cleared first.
    pub fn render_all(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let mut report = BuildReport::default();

        std::fs::create_dir_all(&self.output_dir)?;

        for page in &self.pages {
            let Some(out_path) = &page.out_path else {
                log::debug!("Skipping {} (permalink: false)", page.source.abs_path.display());
                continue;
            };

            let html = self.render_page(page)?;

            let output_path = self.output_dir.join(out_path);
            log::info!(
                "Writing {} from {}",
                output_path.display(),
                page.source.abs_path.display()
            );
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output_path, html)?;
            report.pages_written += 1;
        }

        for file in &self.passthrough {
            if !self.config.passthrough_file_copy {
                log::info!("Skipping {} (passthrough copy disabled)", file.abs_path.display());
                report.files_skipped += 1;
                continue;
            }
            copy_file(&file.abs_path, &self.output_dir.join(&file.path))?;
            report.files_copied += 1;
        }

        for entry in &self.config.passthrough_copy {
            let from = Path::new(entry);
            if !from.exists() {
                log::warn!("Passthrough path {} does not exist, skipping", from.display());
                continue;
            }
            let target = self.output_dir.join(self.passthrough_target(from));
            log::info!("Copying {} to {}", from.display(), target.display());
            report.files_copied += copy_path(from, &target)?;
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Where a passthrough path lands under the output directory: relative to
    /// input when inside it, as given when relative, by name when absolute.
    fn passthrough_target(&self, from: &Path) -> PathBuf {
        if let Ok(inside) = from.strip_prefix(&self.input_dir) {
            return inside.to_path_buf();
        }
        if from.is_absolute() {
            return from.file_name().map(PathBuf::from).unwrap_or_default();
        }
        from.components()
            .filter(|c| matches!(c, std::path::Component::Normal(_)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config_for(root: &Path) -> SiteConfig {
        SiteConfig {
            input: root.join("src").to_string_lossy().to_string(),
            output: root.join("_site").to_string_lossy().to_string(),
            passthrough_copy: vec![root.join("assets").to_string_lossy().to_string()],
            ..SiteConfig::default()
        }
    }

    fn dog_data() -> DataContext {
        let mut data = DataContext::new();
        data.insert("dogImage".into(), json!("https://images.dog.ceo/x.jpg"));
        data
    }

    #[test]
    fn test_markdown_goes_through_template_engine_then_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/_includes/base.njk",
            "<html><title>{{ title }}</title><body>{{ content }}</body></html>",
        );
        write(
            dir.path(),
            "src/dogs.md",
            "---\nlayout: base.njk\n---\n# Today's dog\n\n![golden]({{ dogImage }})\n",
        );

        let config = config_for(dir.path());
        let site = SiteBuilder::new(&config).data(dog_data()).build().unwrap();
        let report = site.render_all().unwrap();
        assert_eq!(report.pages_written, 1);

        let html = fs::read_to_string(dir.path().join("_site/dogs/index.html")).unwrap();
        assert!(html.starts_with("<html><title>Today's dog</title><body><h1>"), "{html}");
        assert!(html.contains("<img src=\"https://images.dog.ceo/x.jpg\" alt=\"golden\""));
    }

    #[test]
    fn test_markdown_without_engine_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/raw.md", "Literal {{ dogImage }}\n");

        let config = SiteConfig {
            markdown_template_engine: TemplateEngine::None,
            ..config_for(dir.path())
        };
        SiteBuilder::new(&config).build().unwrap().render_all().unwrap();

        let html = fs::read_to_string(dir.path().join("_site/raw/index.html")).unwrap();
        assert_eq!(html, "<p>Literal {{ dogImage }}</p>\n");
    }

    #[test]
    fn test_page_variable_and_global_data() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/_data/site.json", r#"{"name":"Golden Hour"}"#);
        write(
            dir.path(),
            "src/dogs/golden.njk",
            "{{ site.name }} {{ page.url }} {{ page.file_slug }}",
        );

        let config = config_for(dir.path());
        SiteBuilder::new(&config).build().unwrap().render_all().unwrap();

        let html = fs::read_to_string(dir.path().join("_site/dogs/golden/index.html")).unwrap();
        assert_eq!(html, "Golden Hour /dogs/golden/ golden");
    }

    #[test]
    fn test_front_matter_overrides_provider_data() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.njk", "---\ndogImage: local.jpg\n---\n{{ dogImage }}");

        let config = config_for(dir.path());
        SiteBuilder::new(&config)
            .data(dog_data())
            .build()
            .unwrap()
            .render_all()
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/index.html")).unwrap(),
            "local.jpg"
        );
    }

    #[test]
    fn test_layout_front_matter_sits_between_provider_and_page_data() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "src/_includes/base.njk",
            "---\ndogImage: layout.jpg\ncaption: Good dog\n---\n{{ dogImage }}|{{ caption }}|{{ content }}",
        );
        write(dir.path(), "src/index.njk", "---\nlayout: base.njk\n---\nbody");
        write(
            dir.path(),
            "src/about.njk",
            "---\nlayout: base.njk\ncaption: Best dog\n---\n{{ dogImage }}",
        );

        let config = config_for(dir.path());
        SiteBuilder::new(&config)
            .data(dog_data())
            .build()
            .unwrap()
            .render_all()
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/index.html")).unwrap(),
            "layout.jpg|Good dog|body"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/about/index.html")).unwrap(),
            "layout.jpg|Best dog|layout.jpg"
        );
    }

    #[test]
    fn test_permalinks() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/feed.njk", "---\npermalink: \"/{{ slug }}.xml\"\nslug: feed\n---\n<rss/>");
        write(dir.path(), "src/draft.md", "---\npermalink: false\n---\nnot yet");

        let config = config_for(dir.path());
        let site = SiteBuilder::new(&config).build().unwrap();
        assert_eq!(site.pages().len(), 2);
        assert_eq!(site.pages()[0].url(), None);
        let report = site.render_all().unwrap();

        assert_eq!(report.pages_written, 1);
        assert_eq!(fs::read_to_string(dir.path().join("_site/feed.xml")).unwrap(), "<rss/>");
        assert!(!dir.path().join("_site/draft").exists());
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/about.md", "# About");
        write(dir.path(), "src/about/index.njk", "about");

        let config = config_for(dir.path());
        let result = SiteBuilder::new(&config).build();
        assert!(matches!(result, Err(BuildError::DuplicateOutput { .. })));
    }

    #[test]
    fn test_passthrough_files_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/robots.txt", "User-agent: *");
        write(dir.path(), "assets/css/site.css", "body{}");

        let config = config_for(dir.path());
        let site = SiteBuilder::new(&config).build().unwrap();
        assert_eq!(site.passthrough().len(), 1);
        let report = site.render_all().unwrap();

        assert_eq!(report.files_copied, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/robots.txt")).unwrap(),
            "User-agent: *"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/assets/css/site.css")).unwrap(),
            "body{}"
        );
    }

    #[test]
    fn test_dotfiles_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.njk", "home");
        write(dir.path(), "src/.htaccess", "Options -Indexes");

        let config = config_for(dir.path());
        let report = SiteBuilder::new(&config).build().unwrap().render_all().unwrap();
        assert_eq!(report.pages_written, 1);
        assert_eq!(report.files_copied, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("_site/.htaccess")).unwrap(),
            "Options -Indexes"
        );
    }

    #[test]
    fn test_passthrough_disabled_skips_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/robots.txt", "User-agent: *");

        let config = SiteConfig {
            passthrough_file_copy: false,
            ..config_for(dir.path())
        };
        let report = SiteBuilder::new(&config).build().unwrap().render_all().unwrap();
        assert_eq!(report.files_skipped, 1);
        assert!(!dir.path().join("_site/robots.txt").exists());
    }

    #[test]
    fn test_undefined_variable_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.njk", "{{ dogImage }}");

        let config = config_for(dir.path());
        let site = SiteBuilder::new(&config).build().unwrap();
        assert!(matches!(site.render_all(), Err(BuildError::TemplateError { .. })));
    }
}
