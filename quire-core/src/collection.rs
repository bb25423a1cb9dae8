//! Helpers shared by the blog and docs collections.

use std::path::{Path, PathBuf};

use crate::template::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },
    #[error("failed to generate reference page {name}: {source}")]
    Reference {
        name: String,
        #[source]
        source: TemplateError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Files directly inside `dir` with extension `ext`, in path order.
pub fn glob_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, CollectionError> {
    let pattern = format!("{}/*.{ext}", glob::Pattern::escape(&dir.to_string_lossy()));

    glob::glob(&pattern)?
        .map(|entry| {
            entry.map_err(|source| CollectionError::Glob {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Identifier derived from a file name: the extension is dropped, and so is
/// a short ordering prefix such as `04-`.
pub fn slug_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.find('-') {
        Some(idx) if (1..=2).contains(&idx) => stem[idx + 1..].to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_prefix_is_dropped() {
        assert_eq!(slug_from_filename(Path::new("_posts/04-why-ocuroot.md")), "why-ocuroot");
        assert_eq!(slug_from_filename(Path::new("1-intro.md")), "intro");
    }

    #[test]
    fn plain_names_are_kept() {
        assert_eq!(slug_from_filename(Path::new("why-ocuroot.md")), "why-ocuroot");
        // Prefix too long to be an ordering number
        assert_eq!(slug_from_filename(Path::new("2024-recap.md")), "2024-recap");
        // Leading dash is not a prefix
        assert_eq!(slug_from_filename(Path::new("-draft.md")), "-draft");
    }

    #[test]
    fn glob_is_non_recursive_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.md"), "").unwrap();
        std::fs::write(dir.path().join("a.md"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("nested/c.md"), "").unwrap();

        let files = glob_files(dir.path(), "md").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_the_listing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("a.md"), "").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read straight through the mode bits
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = glob_files(&locked, "md");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        assert!(matches!(result, Err(CollectionError::Glob { .. })));
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(glob_files(Path::new("/no/such/dir"), "md").unwrap().is_empty());
    }
}
