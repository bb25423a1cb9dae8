//! The path registry: logical output path → renderable unit.
//!
//! Both output modes read from the same [`Registry`]. The batch writer
//! streams every entry to disk, the dev server renders single entries on
//! request. Once built the registry is never mutated again, which is what
//! makes sharing it across request handlers sound.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::template::TemplateError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The requested path was never registered.
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Values every render can see (site title, bundle URLs, dev flag, ...).
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    globals: tera::Context,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the global context
    pub fn set_global<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.globals.insert(key, value);
    }

    pub fn globals(&self) -> &tera::Context {
        &self.globals
    }
}

/// Anything that can render itself into a byte sink.
pub trait Renderable: Send + Sync {
    fn render(&self, ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError>;
}

impl<R: Renderable + ?Sized> Renderable for Arc<R> {
    fn render(&self, ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError> {
        (**self).render(ctx, out)
    }
}

#[derive(Default)]
pub struct Registry {
    paths: BTreeMap<String, Arc<dyn Renderable>>,
}

fn normalize(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `renderable` under `path`. A later registration for the same
    /// path replaces the earlier one.
    pub fn register<R: Renderable + 'static>(&mut self, path: &str, renderable: R) {
        self.register_shared(path, Arc::new(renderable));
    }

    pub fn register_shared(&mut self, path: &str, renderable: Arc<dyn Renderable>) {
        let path = normalize(path).to_string();
        debug!(%path, "registered path");
        self.paths.insert(path, renderable);
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.contains_key(normalize(path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Render a single path into memory.
    pub fn render_path(&self, ctx: &RenderContext, path: &str) -> Result<Vec<u8>, RenderError> {
        let path = normalize(path);
        let renderable = self
            .paths
            .get(path)
            .ok_or_else(|| RenderError::PathNotFound(path.to_string()))?;

        let mut buf = Vec::new();
        renderable.render(ctx, &mut buf)?;

        Ok(buf)
    }

    /// Wipe `output_dir` and write every registered path beneath it.
    ///
    /// The first failure aborts the batch; files already written stay.
    pub fn render_all(&self, ctx: &RenderContext, output_dir: &Path) -> Result<(), RenderError> {
        match std::fs::remove_dir_all(output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(output_dir)?;

        for (path, renderable) in &self.paths {
            let full_path = output_dir.join(path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Each file is closed as soon as its render finishes
            let mut writer = BufWriter::new(File::create(&full_path)?);
            if let Err(e) = renderable.render(ctx, &mut writer) {
                error!(%path, error = %e, "render failed");
                return Err(e);
            }
            writer.flush()?;
        }

        info!(count = self.paths.len(), dir = %output_dir.display(), "rendered site");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Text(&'static str);

    impl Renderable for Text {
        fn render(&self, _ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError> {
            out.write_all(self.0.as_bytes())?;
            Ok(())
        }
    }

    struct Failing;

    impl Renderable for Failing {
        fn render(&self, _ctx: &RenderContext, _out: &mut dyn Write) -> Result<(), RenderError> {
            Err(std::io::Error::other("boom").into())
        }
    }

    #[test]
    fn leading_slash_is_normalized() {
        let mut registry = Registry::new();
        registry.register("/about/index.html", Text("about"));

        assert!(registry.has_path("about/index.html"));
        assert_eq!(registry.paths().collect::<Vec<_>>(), vec!["about/index.html"]);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        registry.register("index.html", Text("first"));
        registry.register("index.html", Text("second"));

        let ctx = RenderContext::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.render_path(&ctx, "index.html").unwrap(), b"second");
    }

    #[test]
    fn unknown_path_is_not_found() {
        let registry = Registry::new();
        let ctx = RenderContext::new();

        assert!(!registry.has_path("missing.html"));
        assert!(matches!(
            registry.render_path(&ctx, "missing.html"),
            Err(RenderError::PathNotFound(p)) if p == "missing.html"
        ));
    }

    #[test]
    fn render_errors_propagate_unchanged() {
        let mut registry = Registry::new();
        registry.register("bad.html", Failing);

        let ctx = RenderContext::new();
        assert!(matches!(registry.render_path(&ctx, "bad.html"), Err(RenderError::Io(_))));
    }

    #[test]
    fn render_all_recreates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("stale.txt"), "old").unwrap();

        let mut registry = Registry::new();
        registry.register("index.html", Text("home"));
        registry.register("blog/first/index.html", Text("post"));

        registry.render_all(&RenderContext::new(), &out).unwrap();

        assert!(!out.join("stale.txt").exists());
        assert_eq!(std::fs::read_to_string(out.join("index.html")).unwrap(), "home");
        assert_eq!(
            std::fs::read_to_string(out.join("blog/first/index.html")).unwrap(),
            "post"
        );
    }

    #[test]
    fn render_all_aborts_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");

        let mut registry = Registry::new();
        registry.register("a.html", Text("a"));
        registry.register("b.html", Failing);

        assert!(registry.render_all(&RenderContext::new(), &out).is_err());
        // Already written files are left in place
        assert!(out.join("a.html").exists());
    }
}
