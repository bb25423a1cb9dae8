//! Hand-written pages: every `*.html` file in the pages directory is a tera
//! template published at a clean URL.

use std::path::Path;

use walkdir::WalkDir;

use crate::template::{TemplateError, TemplateRenderer};

/// A page template and the registry path it renders to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub template: String,
    pub path: String,
}

impl PageSource {
    /// Path segments of the page's public URL.
    pub fn url_segments(&self) -> Vec<&str> {
        self.path
            .strip_suffix("index.html")
            .unwrap_or(&self.path)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// `index.html` stays where it is, anything else gets its own directory:
/// `about.html` becomes `about/index.html`.
pub fn output_path(relative: &str) -> String {
    let stem = relative.strip_suffix(".html").unwrap_or(relative);
    if stem == "index" || stem.ends_with("/index") {
        format!("{stem}.html")
    } else {
        format!("{stem}/index.html")
    }
}

/// Add every page template under `dir` to `templates` as `pages/{relative}`.
///
/// A missing directory yields no pages.
pub fn load_pages<P: AsRef<Path>>(templates: &mut TemplateRenderer, dir: P) -> Result<Vec<PageSource>, TemplateError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    let mut pages = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|e| e != "html") {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let template = format!("pages/{relative}");
        sources.push((template.clone(), std::fs::read_to_string(entry.path())?));
        pages.push(PageSource {
            template,
            path: output_path(&relative),
        });
    }

    templates.add_templates(sources)?;
    tracing::debug!(count = pages.len(), "loaded hand-written pages");

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_output_paths() {
        assert_eq!(output_path("index.html"), "index.html");
        assert_eq!(output_path("about.html"), "about/index.html");
        assert_eq!(output_path("solutions/cost.html"), "solutions/cost/index.html");
        assert_eq!(output_path("solutions/index.html"), "solutions/index.html");
    }

    #[test]
    fn url_segments_drop_index() {
        let page = PageSource {
            template: "pages/solutions/cost.html".into(),
            path: "solutions/cost/index.html".into(),
        };
        assert_eq!(page.url_segments(), vec!["solutions", "cost"]);

        let home = PageSource {
            template: "pages/index.html".into(),
            path: "index.html".into(),
        };
        assert!(home.url_segments().is_empty());
    }

    #[test]
    fn page_templates_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("solutions")).unwrap();
        std::fs::write(dir.path().join("about.html"), "About {{ site_name }}").unwrap();
        std::fs::write(dir.path().join("solutions/cost.html"), "Cost").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut templates = TemplateRenderer::new().unwrap();
        let pages = load_pages(&mut templates, dir.path()).unwrap();

        assert_eq!(
            pages,
            vec![
                PageSource {
                    template: "pages/about.html".into(),
                    path: "about/index.html".into(),
                },
                PageSource {
                    template: "pages/solutions/cost.html".into(),
                    path: "solutions/cost/index.html".into(),
                },
            ]
        );
        assert!(templates.has_template("pages/about.html"));
    }

    #[test]
    fn missing_pages_dir_is_empty() {
        let mut templates = TemplateRenderer::new().unwrap();
        assert!(load_pages(&mut templates, "/no/such/pages").unwrap().is_empty());
    }
}
