//! Reference pages generated from outside the docs directory: one page per
//! CLI command, and one per `.star` script.

use std::path::Path;

use clap::{Arg, Command};
use serde::Serialize;
use tera::Context;
use walkdir::WalkDir;

use crate::collection::CollectionError;
use crate::docs::{DocPage, NavItem, doc_link};
use crate::highlight;
use crate::parser::Content;
use crate::template::TemplateRenderer;

pub fn cli_path(name: &str) -> String {
    format!("/reference/cli/{name}")
}

pub fn sdk_path(name: &str) -> String {
    format!("/reference/sdk/{name}")
}

#[derive(Debug, Serialize)]
struct ArgView {
    flag: String,
    help: String,
    default: String,
}

impl ArgView {
    fn new(arg: &Arg) -> Self {
        let flag = match (arg.get_short(), arg.get_long()) {
            (Some(short), Some(long)) => format!("-{short}, --{long}"),
            (Some(short), None) => format!("-{short}"),
            (None, Some(long)) => format!("--{long}"),
            (None, None) => format!("<{}>", arg.get_id()),
        };

        Self {
            flag,
            help: arg.get_help().map(ToString::to_string).unwrap_or_default(),
            default: arg
                .get_default_values()
                .iter()
                .map(|v| v.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn cli_page(
    templates: &TemplateRenderer,
    cmd: &Command,
    name: &str,
    bin_name: String,
) -> Result<Content<DocPage>, CollectionError> {
    let usage = cmd.clone().bin_name(bin_name).render_usage().to_string();
    let args: Vec<_> = cmd
        .get_arguments()
        .filter(|arg| !arg.is_hide_set())
        .map(ArgView::new)
        .collect();

    let mut context = Context::new();
    context.insert("name", name);
    context.insert("usage", &usage);
    context.insert("about", &cmd.get_about().map(ToString::to_string));
    context.insert("args", &args);

    let content = templates
        .render_with_context("cli.html", &context)
        .map_err(|source| CollectionError::Reference {
            name: name.to_string(),
            source,
        })?;

    Ok(Content {
        front_matter: DocPage {
            title: name.to_string(),
            path: cli_path(name),
        },
        date: None,
        content,
        raw: usage,
    })
}

/// A page for `root` and each of its direct subcommands.
pub fn cli_pages(templates: &TemplateRenderer, root: &Command) -> Result<Vec<Content<DocPage>>, CollectionError> {
    let root_name = root.get_name();
    let mut pages = vec![cli_page(templates, root, root_name, root_name.to_string())?];

    for cmd in root.get_subcommands().filter(|c| !c.is_hide_set()) {
        let name = cmd.get_name();
        pages.push(cli_page(templates, cmd, name, format!("{root_name} {name}"))?);
    }

    Ok(pages)
}

fn is_script(relative: &Path) -> bool {
    let name = relative.to_string_lossy();
    relative.extension().is_some_and(|e| e == "star") && !name.contains("readme") && !name.contains("after")
}

/// A highlighted page for every `.star` script under `dir`.
///
/// A missing directory yields no pages.
pub fn script_pages<P: AsRef<Path>>(dir: P) -> Result<Vec<Content<DocPage>>, CollectionError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if !entry.file_type().is_file() || !is_script(relative) {
            continue;
        }

        let name = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = std::fs::read_to_string(entry.path())?;

        pages.push(Content {
            front_matter: DocPage {
                title: name.clone(),
                path: sdk_path(&name),
            },
            date: None,
            content: highlight::code_block(&source, "python"),
            raw: source,
        });
    }

    Ok(pages)
}

/// Navigation entries linking to `pages`, in order.
pub fn nav(pages: &[Content<DocPage>]) -> Vec<NavItem> {
    pages
        .iter()
        .map(|page| NavItem {
            text: page.front_matter.title.clone(),
            link: doc_link(&page.front_matter.path),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn command() -> Command {
        Command::new("ocu")
            .about("Release orchestration")
            .subcommand(
                Command::new("release")
                    .about("Start a release")
                    .arg(
                        Arg::new("environment")
                            .long("env")
                            .short('e')
                            .help("Target environment")
                            .default_value("staging"),
                    ),
            )
            .subcommand(Command::new("secret").hide(true))
    }

    #[test]
    fn one_page_per_visible_command() {
        let templates = TemplateRenderer::new().unwrap();
        let pages = cli_pages(&templates, &command()).unwrap();

        let paths: Vec<_> = pages.iter().map(|p| p.front_matter.path.as_str()).collect();
        assert_eq!(paths, vec!["/reference/cli/ocu", "/reference/cli/release"]);

        let release = &pages[1];
        assert!(release.raw.contains("release"));
        assert!(release.content.contains("Start a release"));
        assert!(release.content.contains("-e, --env"));
        assert!(release.content.contains("staging"));
    }

    #[test]
    fn scripts_are_highlighted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/host.star"), "def host():\n    return 1\n").unwrap();
        std::fs::write(dir.path().join("readme.star"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("after_all.star"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# notes\n").unwrap();

        let pages = script_pages(dir.path()).unwrap();
        assert_eq!(pages.len(), 1);

        let host = &pages[0];
        assert_eq!(host.front_matter.path, "/reference/sdk/host");
        assert!(host.content.starts_with("<pre class=\"code\">"));
        assert_eq!(host.raw, "def host():\n    return 1\n");

        assert_eq!(
            nav(&pages),
            vec![NavItem {
                text: "host".into(),
                link: "/docs/reference/sdk/host/".into(),
            }]
        );
    }

    #[test]
    fn missing_script_dir_is_empty() {
        assert!(script_pages("/no/such/sdk").unwrap().is_empty());
    }
}
