//! Component injection: a line starting with `@Name` in Markdown renders the
//! named component in place.
//!
//! The set of components is fixed by the application when the parser is
//! built. Unknown names render a visible `Unknown template: <name>` so one
//! bad directive never blocks a document from publishing.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::markdown::{
    Extension, ExtensionNode, InlineParser, MarkdownBuilder, MarkdownError, NodeKind, NodeRenderer, prioritized,
};
use crate::renderer::{RenderContext, Renderable};

pub const DIRECTIVE_TRIGGER: u8 = b'@';

const PRIORITY: i32 = 500;

pub const KIND_TEMPL_ITEM: NodeKind = NodeKind::new("TemplItem");

/// Named components that directives may refer to.
#[derive(Default, Clone)]
pub struct Components {
    entries: HashMap<String, Arc<dyn Renderable>>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R: Renderable + 'static>(&mut self, name: &str, component: R) {
        self.entries.insert(name.to_string(), Arc::new(component));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Renderable>> {
        self.entries.get(name)
    }
}

/// A directive found in the source, carrying everything after the `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplItem {
    pub name: String,
}

impl ExtensionNode for TemplItem {
    fn kind(&self) -> NodeKind {
        KIND_TEMPL_ITEM
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TemplParser;

impl InlineParser for TemplParser {
    fn trigger(&self) -> u8 {
        DIRECTIVE_TRIGGER
    }

    fn parse(&self, line: &str) -> Option<Box<dyn ExtensionNode>> {
        let name = line.strip_prefix(DIRECTIVE_TRIGGER as char)?;
        if name.is_empty() {
            return None;
        }

        Some(Box::new(TemplItem { name: name.to_string() }))
    }
}

pub struct TemplHtmlRenderer {
    components: Arc<Components>,
}

impl NodeRenderer for TemplHtmlRenderer {
    fn kind(&self) -> NodeKind {
        KIND_TEMPL_ITEM
    }

    fn render(&self, node: &dyn ExtensionNode, entering: bool, out: &mut String) -> Result<(), MarkdownError> {
        if !entering {
            return Ok(());
        }
        let Some(item) = node.as_any().downcast_ref::<TemplItem>() else {
            return Ok(());
        };

        match self.components.get(&item.name) {
            Some(component) => {
                let mut buf = Vec::new();
                component
                    .render(&RenderContext::default(), &mut buf)
                    .map_err(|source| MarkdownError::Node {
                        kind: KIND_TEMPL_ITEM.name(),
                        source,
                    })?;
                out.push_str(&String::from_utf8_lossy(&buf));
            }
            None => {
                tracing::warn!(name = %item.name, "unknown template in markdown");
                out.push_str("Unknown template: ");
                out.push_str(&html_escape::encode_text(&item.name));
            }
        }

        Ok(())
    }
}

/// Markdown extension wiring [`TemplParser`] and [`TemplHtmlRenderer`] in.
pub struct TemplInjector {
    components: Arc<Components>,
}

impl TemplInjector {
    pub fn new(components: Arc<Components>) -> Self {
        Self { components }
    }
}

impl Extension for TemplInjector {
    fn extend(&self, builder: &mut MarkdownBuilder) {
        builder.add_inline_parser(prioritized(Arc::new(TemplParser), PRIORITY));
        builder.add_node_renderer(prioritized(
            Arc::new(TemplHtmlRenderer {
                components: Arc::clone(&self.components),
            }),
            PRIORITY,
        ));
    }
}
