use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::collection::{CollectionError, glob_files, slug_from_filename};
use crate::parser::{Content, Parser};
use crate::renderer::Registry;
use crate::site::canonical;
use crate::template::{TemplatePage, TemplateRenderer};

/// Front matter of a documentation page.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DocPage {
    pub title: String,
    /// Location under `/docs/`; derived from the file name when left empty
    pub path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavItem {
    pub text: String,
    pub link: String,
}

/// Public URL of the doc page at `path`.
pub fn doc_link(path: &str) -> String {
    format!("/docs/{}/", path.trim_matches('/'))
}

#[derive(Serialize)]
struct DocView<'a> {
    #[serde(flatten)]
    front_matter: &'a DocPage,
    content: &'a str,
}

pub struct DocsManager {
    parser: Parser<DocPage>,
    pages: HashMap<String, Arc<Content<DocPage>>>,
    cli_nav: Vec<NavItem>,
    sdk_nav: Vec<NavItem>,
}

fn page_key(path: &str) -> String {
    path.trim_matches('/').to_string()
}

impl DocsManager {
    pub fn new(parser: Parser<DocPage>) -> Self {
        Self {
            parser,
            pages: HashMap::new(),
            cli_nav: Vec::new(),
            sdk_nav: Vec::new(),
        }
    }

    /// Load every `*.md` file directly inside `dir`. Files that fail to
    /// parse are skipped.
    pub fn load_pages<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, CollectionError> {
        let mut count = 0;

        for file in glob_files(dir.as_ref(), "md")? {
            debug!(path = %file.display(), "loading documentation page");
            let mut page = match self.parser.parse_file(&file) {
                Ok(page) => page,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "failed to parse documentation page");
                    continue;
                }
            };

            if page.front_matter.path.trim_matches('/').is_empty() {
                page.front_matter.path = slug_from_filename(&file);
            }
            self.insert(page);
            count += 1;
        }

        info!(count, "loaded documentation pages");
        Ok(count)
    }

    /// Add a page built somewhere other than the docs directory, keyed by
    /// its own path.
    pub fn insert(&mut self, page: Content<DocPage>) {
        self.pages.insert(page_key(&page.front_matter.path), Arc::new(page));
    }

    pub fn get_page(&self, path: &str) -> Option<&Arc<Content<DocPage>>> {
        self.pages.get(&page_key(path))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn set_cli_nav(&mut self, nav: Vec<NavItem>) {
        self.cli_nav = nav;
    }

    pub fn set_sdk_nav(&mut self, nav: Vec<NavItem>) {
        self.sdk_nav = nav;
    }

    /// Register every page at `docs/{path}/index.html`.
    pub fn register_with_renderer(&self, registry: &mut Registry, templates: &Arc<TemplateRenderer>, base_url: &Url) {
        for (key, page) in &self.pages {
            let view = DocView {
                front_matter: &page.front_matter,
                content: &page.content,
            };
            registry.register(
                &format!("docs/{key}/index.html"),
                TemplatePage::new(Arc::clone(templates), "doc.html")
                    .with("page", &view)
                    .with("cli_nav", &self.cli_nav)
                    .with("sdk_nav", &self.sdk_nav)
                    .with("canonical", &canonical(base_url, &["docs", key])),
            );
        }
    }
}
