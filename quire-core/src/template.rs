use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};

use crate::renderer::{RenderContext, RenderError, Renderable};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Templates compiled into the binary. A theme directory may override any
/// of them by name.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("blog_list.html", include_str!("../templates/blog_list.html")),
    ("blog_post.html", include_str!("../templates/blog_post.html")),
    ("doc.html", include_str!("../templates/doc.html")),
    ("cli.html", include_str!("../templates/cli.html")),
    (
        "components/architecture_diagram.html",
        include_str!("../templates/components/architecture_diagram.html"),
    ),
];

pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Built-in templates only.
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())?;

        Ok(Self { tera })
    }

    /// Built-in templates, overridden by any `*.html` found under `theme_dir`.
    pub fn with_theme(theme_dir: &Path) -> Result<Self, TemplateError> {
        let builtin = Self::new()?;
        if !theme_dir.is_dir() {
            return Ok(builtin);
        }

        let glob = format!("{}/**/*.html", theme_dir.display());
        let mut tera = Tera::parse(&glob)?;
        // Keeps theme templates, fills in the rest from the built-ins
        tera.extend(&builtin.tera)?;
        tera.build_inheritance_chains()?;

        Ok(Self { tera })
    }

    /// Register extra templates from source (hand-written pages). They may
    /// extend or include each other.
    pub fn add_templates<I, N, S>(&mut self, templates: I) -> Result<(), TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsRef<str>,
    {
        self.tera.add_raw_templates(templates)?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template with an external context
    pub fn render_with_context(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        Ok(self.tera.render(template, context)?)
    }

    /// Render a template straight into a sink
    pub fn render_to(&self, template: &str, context: &Context, out: &mut dyn Write) -> Result<(), TemplateError> {
        self.tera.render_to(template, context, out)?;
        Ok(())
    }
}

/// A registry entry backed by a template and its page-specific context.
pub struct TemplatePage {
    templates: Arc<TemplateRenderer>,
    template: String,
    context: Context,
}

impl TemplatePage {
    pub fn new(templates: Arc<TemplateRenderer>, template: impl Into<String>) -> Self {
        Self {
            templates,
            template: template.into(),
            context: Context::new(),
        }
    }

    /// Add a value to the page context
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.context.insert(key, value);
        self
    }
}

impl Renderable for TemplatePage {
    fn render(&self, ctx: &RenderContext, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut context = ctx.globals().clone();
        context.extend(self.context.clone());

        self.templates.render_to(&self.template, &context, out)?;
        Ok(())
    }
}
