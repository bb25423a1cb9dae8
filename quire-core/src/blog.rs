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

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Author {
    pub name: String,
    pub picture: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CoverImage {
    pub src: String,
    pub alt: String,
    pub credit: String,
    #[serde(rename(deserialize = "creditURL"))]
    pub credit_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OgImage {
    pub url: String,
}

/// Front matter of a blog post.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BlogPost {
    pub title: String,
    /// Derived from the file name when left empty
    pub slug: String,
    pub excerpt: String,
    pub author: Author,
    #[serde(rename(deserialize = "coverImage"))]
    pub cover_image: CoverImage,
    #[serde(rename(deserialize = "ogImage"))]
    pub og_image: OgImage,
    pub tags: Vec<String>,
}

/// What the blog templates see for one post.
#[derive(Serialize)]
pub(crate) struct PostView<'a> {
    #[serde(flatten)]
    front_matter: &'a BlogPost,
    date: Option<String>,
    content: &'a str,
}

impl<'a> PostView<'a> {
    pub(crate) fn new(post: &'a Content<BlogPost>) -> Self {
        Self {
            front_matter: &post.front_matter,
            date: post.date.map(|d| d.format("%B %-d, %Y").to_string()),
            content: &post.content,
        }
    }
}

pub struct BlogManager {
    parser: Parser<BlogPost>,
    posts: HashMap<String, Arc<Content<BlogPost>>>,
    /// Newest first
    sorted: Vec<Arc<Content<BlogPost>>>,
}

impl BlogManager {
    pub fn new(parser: Parser<BlogPost>) -> Self {
        Self {
            parser,
            posts: HashMap::new(),
            sorted: Vec::new(),
        }
    }

    /// Load every `*.md` file directly inside `dir`, replacing anything
    /// loaded before. Files that fail to parse are skipped.
    pub fn load_posts<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, CollectionError> {
        let files = glob_files(dir.as_ref(), "md")?;
        let mut posts = Vec::with_capacity(files.len());

        for file in &files {
            debug!(path = %file.display(), "loading blog post");
            let mut post = match self.parser.parse_file(file) {
                Ok(post) => post,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "failed to parse blog post");
                    continue;
                }
            };

            if post.front_matter.slug.is_empty() {
                post.front_matter.slug = slug_from_filename(file);
            }
            posts.push(Arc::new(post));
        }

        // Stable, so equal dates keep file order; undated posts sort last
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        self.posts = posts
            .iter()
            .map(|post| (post.front_matter.slug.clone(), Arc::clone(post)))
            .collect();
        self.sorted = posts;

        info!(count = self.sorted.len(), "loaded blog posts");
        Ok(self.sorted.len())
    }

    pub fn get_post(&self, slug: &str) -> Option<&Arc<Content<BlogPost>>> {
        self.posts.get(slug)
    }

    /// All posts, newest first.
    pub fn get_all_posts(&self) -> &[Arc<Content<BlogPost>>] {
        &self.sorted
    }

    /// Register the post list at `blog/index.html` and each post at
    /// `blog/{slug}/index.html`.
    pub fn register_with_renderer(&self, registry: &mut Registry, templates: &Arc<TemplateRenderer>, base_url: &Url) {
        let views: Vec<_> = self.sorted.iter().map(|p| PostView::new(p)).collect();
        registry.register(
            "blog/index.html",
            TemplatePage::new(Arc::clone(templates), "blog_list.html")
                .with("posts", &views)
                .with("canonical", &canonical(base_url, &["blog"])),
        );

        for (slug, post) in &self.posts {
            registry.register(
                &format!("blog/{slug}/index.html"),
                TemplatePage::new(Arc::clone(templates), "blog_post.html")
                    .with("post", &PostView::new(post))
                    .with("canonical", &canonical(base_url, &["blog", slug])),
            );
        }
    }
}
