use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::{ConfigError, SiteConfig, TemplateFormat};
use crate::site::{SourceFile, SourceKind};

/// Version control metadata directories, never part of a site.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("Input directory does not exist: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Walks the input directory and classifies every file as a template or a
/// passthrough asset.
pub struct SiteScanner {
    source_dir: PathBuf,
    formats: Vec<TemplateFormat>,
    /// Directories under `source_dir` that are never scanned
    excluded: Vec<PathBuf>,
}

impl SiteScanner {
    pub fn new(config: &SiteConfig) -> Result<Self, ScanError> {
        let source_dir = PathBuf::from(&config.input);
        let excluded = vec![
            config.includes_dir(),
            config.data_dir(),
            PathBuf::from(&config.output),
        ];

        Ok(Self {
            source_dir,
            formats: config.formats()?,
            excluded,
        })
    }

    pub fn scan(&self) -> Result<Vec<SourceFile>, ScanError> {
        log::debug!("Scanning: {}", self.source_dir.display());
        if !self.source_dir.is_dir() {
            return Err(ScanError::MissingInput(self.source_dir.clone()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let abs_path = entry.path().to_path_buf();
            let path = abs_path
                .strip_prefix(&self.source_dir)
                .map_err(|_| ScanError::InvalidPath(abs_path.clone()))?
                .to_path_buf();

            let kind = match self.template_format(&path) {
                Some(format) => SourceKind::Template(format),
                None => SourceKind::Passthrough,
            };

            files.push(SourceFile { path, abs_path, kind });
        }

        Ok(files)
    }

    fn template_format(&self, path: &Path) -> Option<TemplateFormat> {
        let ext = get_extension(path)?;
        self.formats.iter().copied().find(|f| f.extension() == ext)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        // The root itself is never skipped, even when it is `.`
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if VCS_DIRS.contains(&name.as_ref()) {
            log::info!("Skipping {}", entry.path().display());
            return true;
        }
        self.excluded.iter().any(|ex| same_path(entry.path(), ex))
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn get_extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
}
