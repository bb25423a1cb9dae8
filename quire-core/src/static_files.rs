use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::renderer::{Registry, RenderContext, RenderError, Renderable};

/// Bytes held in memory (bundles, embedded assets, literal strings).
#[derive(Debug, Clone)]
pub struct StaticBytes(pub Vec<u8>);

impl From<&str> for StaticBytes {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for StaticBytes {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<Vec<u8>> for StaticBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Renderable for StaticBytes {
    fn render(&self, _ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError> {
        out.write_all(&self.0)?;
        Ok(())
    }
}

/// A file read from disk every time it is rendered.
#[derive(Debug, Clone)]
pub struct StaticFile(pub PathBuf);

impl Renderable for StaticFile {
    fn render(&self, _ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError> {
        let data = std::fs::read(&self.0)?;
        out.write_all(&data)?;
        Ok(())
    }
}

/// Register every file under `dir` at its path relative to `dir`.
///
/// Returns the number of files registered.
pub fn register_static<P: AsRef<Path>>(registry: &mut Registry, dir: P) -> Result<usize, walkdir::Error> {
    let dir = dir.as_ref();
    let mut count = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let web_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        registry.register(&web_path, StaticFile(entry.path().to_path_buf()));
        count += 1;
    }

    Ok(count)
}
