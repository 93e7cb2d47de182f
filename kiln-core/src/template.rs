use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::data::DataContext;
use crate::frontmatter::{FrontMatter, FrontMatterError};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    TeraError(#[from] tera::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("{name}: {source}")]
    FrontMatter {
        name: String,
        #[source]
        source: FrontMatterError,
    },
    #[error("Layout `{0}` not found")]
    MissingLayout(String),
    #[error("Layout chain loops back to `{0}`")]
    LayoutCycle(String),
    #[error("Layouts nest deeper than {0} levels")]
    LayoutTooDeep(usize),
}

/// Tera with layouts and partials from the includes directory registered by
/// their relative names.
pub struct TemplateRenderer {
    tera: Tera,
    /// Front matter declared by each include, keyed by template name
    include_data: HashMap<String, DataContext>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        // Match Nunjucks: nothing is autoescaped.
        tera.autoescape_on(vec![]);

        Self {
            tera,
            include_data: HashMap::new(),
        }
    }

    /// Register every file under `dir` as a template. A missing directory
    /// leaves the renderer empty.
    pub fn with_includes<P: AsRef<Path>>(dir: P) -> Result<Self, TemplateError> {
        let mut renderer = Self::new();
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Ok(renderer);
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let name = template_name(relative);
            let source = std::fs::read_to_string(entry.path())?;
            let front_matter = FrontMatter::parse(&source).map_err(|source| TemplateError::FrontMatter {
                name: name.clone(),
                source,
            })?;

            log::debug!("Registered include {name}");
            renderer.include_data.insert(name.clone(), front_matter.data);
            templates.push((name, front_matter.body));
        }

        renderer.tera.add_raw_templates(templates)?;
        Ok(renderer)
    }

    pub fn add_template(&mut self, name: &str, body: &str) -> Result<(), TemplateError> {
        self.tera.add_raw_template(name, body)?;
        Ok(())
    }

    /// Resolve a layout reference, allowing the extension to be left off.
    pub fn resolve_layout(&self, layout: &str) -> Option<String> {
        let names = self.tera.get_template_names().collect::<Vec<_>>();
        [layout.to_string(), format!("{layout}.njk"), format!("{layout}.html")]
            .into_iter()
            .find(|candidate| names.contains(&candidate.as_str()))
    }

    /// Front matter an include declared, if any.
    pub fn include_data(&self, name: &str) -> Option<&DataContext> {
        self.include_data.get(name)
    }

    pub fn render(&self, template: &str, data: &DataContext) -> Result<String, TemplateError> {
        let context = Context::from_value(Value::Object(data.clone()))?;
        Ok(self.tera.render(template, &context)?)
    }

    /// Render a string that is not registered, without access to includes.
    pub fn render_one_off(source: &str, data: &DataContext) -> Result<String, TemplateError> {
        let context = Context::from_value(Value::Object(data.clone()))?;
        Ok(Tera::one_off(source, &context, false)?)
    }
}

/// Forward-slash template name for a relative path.
pub fn template_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
