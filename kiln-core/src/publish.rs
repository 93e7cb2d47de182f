//! Copying trees between directories.
//!
//! Copies are additive: files already at the destination are overwritten,
//! anything else there is left untouched.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Nothing to copy at {}", .0.display())]
    MissingSource(PathBuf),
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Copy every file under `from` into `to`, keeping relative paths.
/// Returns the number of files copied.
pub fn copy_tree<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<usize, PublishError> {
    let from = from.as_ref();
    let to = to.as_ref();
    if !from.is_dir() {
        return Err(PublishError::MissingSource(from.to_path_buf()));
    }

    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        copy_file(entry.path(), &to.join(relative))?;
        copied += 1;
    }

    log::debug!("Copied {copied} files from {} to {}", from.display(), to.display());
    Ok(copied)
}

/// Copy a single file or a whole directory to `to`.
pub fn copy_path<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<usize, PublishError> {
    let from = from.as_ref();
    if from.is_dir() {
        copy_tree(from, to)
    } else if from.is_file() {
        copy_file(from, to.as_ref())?;
        Ok(1)
    } else {
        Err(PublishError::MissingSource(from.to_path_buf()))
    }
}

pub fn copy_file(from: &Path, to: &Path) -> Result<(), PublishError> {
    let wrap = |source: std::io::Error| PublishError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::copy(from, to).map_err(wrap)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_copy_tree_preserves_layout_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("_site");
        fs::create_dir_all(site.join("about")).unwrap();
        fs::write(site.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(site.join("about/index.html"), "<h1>about</h1>").unwrap();
        fs::write(site.join("dog.bin"), [0u8, 159, 146, 150]).unwrap();

        let public = dir.path().join("public");
        assert_eq!(copy_tree(&site, &public).unwrap(), 3);
        assert_eq!(fs::read(public.join("about/index.html")).unwrap(), b"<h1>about</h1>");
        assert_eq!(fs::read(public.join("dog.bin")).unwrap(), vec![0u8, 159, 146, 150]);
    }

    #[test]
    fn test_copy_tree_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("_site");
        let public = dir.path().join("public");
        fs::create_dir_all(&site).unwrap();
        fs::create_dir_all(&public).unwrap();
        fs::write(site.join("index.html"), "new").unwrap();
        fs::write(public.join("index.html"), "old").unwrap();
        fs::write(public.join("CNAME"), "dogs.example").unwrap();

        copy_tree(&site, &public).unwrap();
        assert_eq!(fs::read_to_string(public.join("index.html")).unwrap(), "new");
        assert_eq!(fs::read_to_string(public.join("CNAME")).unwrap(), "dogs.example");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            copy_tree(dir.path().join("_site"), dir.path().join("public")),
            Err(PublishError::MissingSource(_))
        ));
        assert!(matches!(
            copy_path(dir.path().join("assets"), dir.path().join("_site/assets")),
            Err(PublishError::MissingSource(_))
        ));
    }

    #[test]
    fn test_copy_path_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("favicon.ico"), "ico").unwrap();
        let target = dir.path().join("_site/favicon.ico");
        assert_eq!(copy_path(dir.path().join("favicon.ico"), &target).unwrap(), 1);
        assert_eq!(fs::read_to_string(target).unwrap(), "ico");
    }
}
