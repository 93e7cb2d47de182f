pub mod builder;
pub mod config;
pub mod data;
pub mod frontmatter;
pub mod markdown;
pub mod pipeline;
pub mod publish;
pub mod renderer;
pub mod scanner;
pub mod site;
pub mod template;

// Re-export main types
pub use builder::{BuildError, BuildReport, Site, SiteBuilder};
pub use config::{SiteConfig, TemplateEngine, TemplateFormat};
pub use data::{DataContext, DataError, DataSource, RemoteJsonProvider};
pub use pipeline::{CopyTask, Pipeline, PipelineError, PipelineState, RenderTask, Task};
pub use site::{Page, SourceFile, SourceKind};
pub use template::{TemplateError, TemplateRenderer};

/// Render the site under `config` with already-resolved `data`.
pub fn build_site(config: &SiteConfig, data: DataContext) -> Result<BuildReport, BuildError> {
    let site = SiteBuilder::new(config).data(data).build()?;
    site.render_all()
}
