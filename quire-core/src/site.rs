use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Command;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::assets::{AssetBundle, AssetKind};
use crate::blog::{BlogManager, PostView};
use crate::config::Config;
use crate::docs::{DocsManager, doc_link};
use crate::highlight::{self, HighlightError};
use crate::inject::{Components, TemplInjector};
use crate::markdown::Markdown;
use crate::pages;
use crate::parser::Parser;
use crate::reference;
use crate::renderer::{Registry, RenderContext, RenderError};
use crate::static_files::register_static;
use crate::template::{TemplateError, TemplatePage, TemplateRenderer};

const BLOG_CSS: &str = include_str!("../assets/blog.css");

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid base URL {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Highlight error: {0}")]
    Highlight(#[from] HighlightError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Absolute URL for a page: `segments` joined onto `base`, with a trailing
/// slash unless the last segment looks like a file name.
pub fn canonical(base: &Url, segments: &[&str]) -> String {
    let parts: Vec<&str> = segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    let is_file = parts.last().is_some_and(|last| last.contains('.'));

    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(&parts);
        if !is_file {
            path.push("");
        }
    }

    url.to_string()
}

pub struct SiteBuilder {
    config: Config,
    cli: Option<Command>,
    dev: bool,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cli: None,
            dev: false,
        }
    }

    // Custom context data
    pub fn add_custom<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, BuildError> {
        let json_value = serde_json::to_value(value)?;
        self.config.extra.insert(key.to_string(), json_value);
        Ok(self)
    }

    /// Generate reference pages for this command tree
    pub fn cli_reference(mut self, cmd: Command) -> Self {
        self.cli = Some(cmd);
        self
    }

    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    pub fn build(self) -> Result<Site, BuildError> {
        let Self { config, cli, dev } = self;
        let paths = &config.paths;

        let base_url = Url::parse(&config.site.base_url).map_err(|source| BuildError::BaseUrl {
            url: config.site.base_url.clone(),
            source,
        })?;

        let mut templates = TemplateRenderer::with_theme(&paths.theme)?;
        let page_sources = pages::load_pages(&mut templates, &paths.pages)?;
        let templates = Arc::new(templates);

        let mut components = Components::new();
        components.register(
            "ArchitectureDiagram",
            TemplatePage::new(Arc::clone(&templates), "components/architecture_diagram.html"),
        );

        let markdown = Arc::new(
            Markdown::builder()
                .extension(TemplInjector::new(Arc::new(components)))
                .build(),
        );

        let mut registry = Registry::new();

        let mut blog = BlogManager::new(Parser::new(Arc::clone(&markdown)));
        if let Err(e) = blog.load_posts(&paths.blog) {
            warn!(error = %e, "failed to load blog posts");
        }
        blog.register_with_renderer(&mut registry, &templates, &base_url);

        let mut docs = DocsManager::new(Parser::new(Arc::clone(&markdown)));
        if let Err(e) = docs.load_pages(&paths.docs) {
            warn!(error = %e, "failed to load documentation");
        }
        if let Some(cmd) = &cli {
            match reference::cli_pages(&templates, cmd) {
                Ok(cli_pages) => {
                    docs.set_cli_nav(reference::nav(&cli_pages));
                    cli_pages.into_iter().for_each(|page| docs.insert(page));
                }
                Err(e) => warn!(error = %e, "failed to generate CLI reference"),
            }
        }
        match reference::script_pages(&paths.reference) {
            Ok(script_pages) => {
                docs.set_sdk_nav(reference::nav(&script_pages));
                script_pages.into_iter().for_each(|page| docs.insert(page));
            }
            Err(e) => warn!(error = %e, "failed to generate SDK reference"),
        }
        docs.register_with_renderer(&mut registry, &templates, &base_url);
        debug!(pages = docs.len(), "registered documentation");

        register_static_dir(&mut registry, &paths.static_dir)?;

        let posts: Vec<_> = blog.get_all_posts().iter().map(|p| PostView::new(p)).collect();
        for page in &page_sources {
            registry.register(
                &page.path,
                TemplatePage::new(Arc::clone(&templates), &page.template)
                    .with("posts", &posts)
                    .with("canonical", &canonical(&base_url, &page.url_segments())),
            );
        }
        if !registry.has_path("index.html") {
            registry.register(
                "index.html",
                TemplatePage::new(Arc::clone(&templates), "index.html")
                    .with("posts", &posts)
                    .with("canonical", &canonical(&base_url, &[])),
            );
        }

        let (css, js) = bundles(&config)?;
        registry.register(&css.versioned_url(), css.to_static());
        registry.register(&js.versioned_url(), js.to_static());

        let mut ctx = RenderContext::new();
        ctx.set_global("site", &config.site);
        ctx.set_global("css_url", &css.versioned_url());
        ctx.set_global("js_url", &js.versioned_url());
        ctx.set_global("dev", &dev);
        for (key, value) in &config.extra {
            ctx.set_global(key, value);
        }
        if let Some(home) = docs.get_page("index") {
            ctx.set_global("docs_home", &doc_link(&home.front_matter.path));
        }

        info!(paths = registry.len(), "site assembled");

        Ok(Site {
            registry,
            ctx,
            output_dir: paths.output.clone(),
        })
    }
}

fn register_static_dir(registry: &mut Registry, dir: &Path) -> Result<(), BuildError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "static directory not found, skipping");
        return Ok(());
    }

    let count = register_static(registry, dir).map_err(std::io::Error::from)?;
    debug!(count, dir = %dir.display(), "registered static files");
    Ok(())
}

fn bundles(config: &Config) -> Result<(AssetBundle, AssetBundle), BuildError> {
    let mut css = AssetBundle::new(AssetKind::Css);
    let mut js = AssetBundle::new(AssetKind::Js);

    css.add(BLOG_CSS);
    match highlight::theme_css(&config.site.syntax_theme) {
        Ok(theme) => css.add(theme),
        Err(e) => warn!(error = %e, "no stylesheet for syntax theme"),
    }

    let assets = &config.paths.assets;
    if assets.is_dir() {
        css.add_dir(assets)?;
        js.add_dir(assets)?;
    }

    Ok((css, js))
}

/// An assembled site, ready to be written out or served.
pub struct Site {
    registry: Registry,
    ctx: RenderContext,
    output_dir: PathBuf,
}

impl Site {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every page to the output directory.
    pub fn render_all(&self) -> Result<(), RenderError> {
        self.registry.render_all(&self.ctx, &self.output_dir)
    }

    /// Freeze the registry for sharing between request handlers.
    pub fn into_parts(self) -> (Arc<Registry>, RenderContext) {
        (Arc::new(self.registry), self.ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_urls() {
        let base = Url::parse("https://www.ocuroot.com/").unwrap();

        assert_eq!(canonical(&base, &[]), "https://www.ocuroot.com/");
        assert_eq!(canonical(&base, &["blog", "why-ocuroot"]), "https://www.ocuroot.com/blog/why-ocuroot/");
        assert_eq!(canonical(&base, &["docs", "reference/cli/build"]), "https://www.ocuroot.com/docs/reference/cli/build/");
        assert_eq!(canonical(&base, &["static/css/site.css"]), "https://www.ocuroot.com/static/css/site.css");
    }

    #[test]
    fn canonical_keeps_base_path() {
        let base = Url::parse("https://example.com/project/").unwrap();
        assert_eq!(canonical(&base, &["blog"]), "https://example.com/project/blog/");
    }

    fn fixture(root: &Path) -> Config {
        let mut config = Config::default();
        config.site.base_url = "https://example.com/".into();
        config.paths.blog = root.join("_posts");
        config.paths.docs = root.join("_docs");
        config.paths.reference = root.join("sdk");
        config.paths.static_dir = root.join("static");
        config.paths.assets = root.join("site");
        config.paths.pages = root.join("pages");
        config.paths.theme = root.join("theme");
        config.paths.output = root.join("dist");

        std::fs::create_dir_all(root.join("_posts")).unwrap();
        std::fs::create_dir_all(root.join("_docs")).unwrap();
        std::fs::create_dir_all(root.join("static/images")).unwrap();
        std::fs::create_dir_all(root.join("pages")).unwrap();

        std::fs::write(
            root.join("_posts/04-why-quire.md"),
            "---\ntitle: Why quire\ndate: 2024-06-01\n---\nHow it fits together:\n\n@ArchitectureDiagram\n\n@Mystery\n",
        )
        .unwrap();
        std::fs::write(root.join("_docs/index.md"), "---\ntitle: Overview\npath: index\n---\nStart here\n").unwrap();
        std::fs::write(root.join("static/images/logo.svg"), "<svg></svg>").unwrap();
        std::fs::write(
            root.join("pages/about.html"),
            "{% extends \"layout.html\" %}{% block content %}About us{% endblock content %}",
        )
        .unwrap();

        config
    }

    #[test]
    fn builds_every_source_into_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        let site = SiteBuilder::new(config)
            .cli_reference(Command::new("quire").subcommand(Command::new("serve")))
            .build()
            .unwrap();
        let registry = site.registry();

        for path in [
            "index.html",
            "about/index.html",
            "blog/index.html",
            "blog/why-quire/index.html",
            "docs/index/index.html",
            "docs/reference/cli/quire/index.html",
            "docs/reference/cli/serve/index.html",
            "images/logo.svg",
        ] {
            assert!(registry.has_path(path), "missing {path}");
        }
        assert!(registry.paths().any(|p| p.starts_with("static/css/bundle-")));
        assert!(registry.paths().any(|p| p.starts_with("static/js/bundle-")));

        let post = String::from_utf8(registry.render_path(site.context(), "blog/why-quire/index.html").unwrap()).unwrap();
        assert!(post.contains("architecture-diagram"));
        assert!(post.contains("Unknown template: Mystery"));
    }

    #[test]
    fn render_all_writes_the_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());

        let site = SiteBuilder::new(config).build().unwrap();
        site.render_all().unwrap();

        let out = site.output_dir();
        assert!(out.join("index.html").is_file());
        assert!(out.join("blog/why-quire/index.html").is_file());
        assert_eq!(std::fs::read_to_string(out.join("images/logo.svg")).unwrap(), "<svg></svg>");

        let about = std::fs::read_to_string(out.join("about/index.html")).unwrap();
        assert!(about.contains("About us"));
        assert!(about.contains("https://example.com/about/"));
    }

    #[test]
    fn hand_written_index_wins_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        std::fs::write(dir.path().join("pages/index.html"), "custom home").unwrap();

        let site = SiteBuilder::new(config).build().unwrap();
        let home = site.registry().render_path(site.context(), "index.html").unwrap();
        assert_eq!(home, b"custom home");
    }

    #[test]
    fn custom_values_reach_templates() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        std::fs::write(dir.path().join("pages/contact.html"), "{{ discord }} {{ team | length }}").unwrap();

        let site = SiteBuilder::new(config)
            .add_custom("discord", "ocuroot")
            .unwrap()
            .add_custom("team", vec!["ana", "ben"])
            .unwrap()
            .build()
            .unwrap();

        let page = site.registry().render_path(site.context(), "contact/index.html").unwrap();
        assert_eq!(page, b"ocuroot 2");
    }

    #[test]
    fn bad_base_url_fails_the_build() {
        let mut config = Config::default();
        config.site.base_url = "not a url".into();

        assert!(matches!(SiteBuilder::new(config).build(), Err(BuildError::BaseUrl { .. })));
    }
}
