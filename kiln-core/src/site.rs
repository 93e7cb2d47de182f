use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::TemplateFormat;
use crate::frontmatter::FrontMatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Template(TemplateFormat),
    Passthrough,
}

/// A file discovered under the input directory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the input directory
    pub path: PathBuf,
    /// Path as found on disk
    pub abs_path: PathBuf,
    pub kind: SourceKind,
}

/// A template source ready to render.
#[derive(Debug)]
pub struct Page {
    pub source: SourceFile,
    pub format: TemplateFormat,
    pub front_matter: FrontMatter,
    /// Output path relative to the output directory, `None` when suppressed
    pub out_path: Option<PathBuf>,
}

impl Page {
    /// Slug derived from the file name, as seen by templates.
    pub fn file_slug(&self) -> String {
        file_slug(&self.source.path)
    }

    pub fn url(&self) -> Option<String> {
        self.out_path.as_deref().map(url_for)
    }

    pub fn info(&self, input_dir: &Path, output_dir: &Path) -> PageInfo {
        PageInfo {
            url: self.url(),
            input_path: input_dir.join(&self.source.path).to_string_lossy().to_string(),
            output_path: self
                .out_path
                .as_ref()
                .map(|p| output_dir.join(p).to_string_lossy().to_string()),
            file_slug: self.file_slug(),
        }
    }
}

/// The `page` variable templates see.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub url: Option<String>,
    pub input_path: String,
    pub output_path: Option<String>,
    pub file_slug: String,
}

/// Default output path: `dir/index.*` becomes `dir/index.html`, any other
/// `dir/name.*` becomes `dir/name/index.html`.
pub fn default_out_path(relative: &Path) -> PathBuf {
    let parent = relative.parent().unwrap_or(Path::new(""));
    match relative.file_stem() {
        Some(stem) if stem != "index" => parent.join(stem).join("index.html"),
        _ => parent.join("index.html"),
    }
}

/// Output path for a rendered permalink. Leading slashes are dropped and a
/// trailing slash gets `index.html`.
pub fn permalink_out_path(permalink: &str) -> PathBuf {
    let trimmed = permalink.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        PathBuf::from(trimmed).join("index.html")
    } else {
        PathBuf::from(trimmed)
    }
}

/// Public URL for an output path.
pub fn url_for(out_path: &Path) -> String {
    let parts: Vec<String> = out_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    match parts.split_last() {
        Some((last, dirs)) if last == "index.html" => {
            if dirs.is_empty() {
                "/".to_string()
            } else {
                format!("/{}/", dirs.join("/"))
            }
        }
        _ => format!("/{}", parts.join("/")),
    }
}

fn file_slug(relative: &Path) -> String {
    match relative.file_stem() {
        Some(stem) if stem != "index" => stem.to_string_lossy().to_string(),
        _ => relative
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    }
}
