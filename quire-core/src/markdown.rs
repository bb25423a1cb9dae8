//! Markdown → HTML engine built on `pulldown-cmark`.
//!
//! Conversion runs in three steps:
//!
//! 1. **parse**: the CommonMark event stream is scanned, and wherever inline
//!    content starts a line with a registered trigger byte, an
//!    [`InlineParser`] may replace the rest of that line with an
//!    [`ExtensionNode`].
//! 2. **extend**: each extension node is handed to the [`NodeRenderer`]
//!    registered for its [`NodeKind`] and becomes raw inline HTML.
//! 3. **render**: heading ids are assigned, fenced code is highlighted and
//!    the stream is written out by `pulldown_cmark::html`.
//!
//! Extensions plug into steps 1 and 2 through [`Extension`]; standard
//! Markdown parsing is left untouched.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::iter::Peekable;
use std::ops::Range;
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

use crate::highlight;
use crate::renderer::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    #[error("no renderer registered for {0} nodes")]
    NoRenderer(&'static str),
    #[error("failed to render {kind} node: {source}")]
    Node {
        kind: &'static str,
        #[source]
        source: RenderError,
    },
}

/// Identifies a kind of extension node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKind(&'static str);

impl NodeKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// A node contributed by an extension. Created once while parsing, read
/// once while rendering.
pub trait ExtensionNode: Debug + Send {
    fn kind(&self) -> NodeKind;
    fn as_any(&self) -> &dyn Any;
}

/// Parse-time hook.
pub trait InlineParser: Send + Sync {
    /// Byte that must start the line for [`parse`](Self::parse) to be tried.
    fn trigger(&self) -> u8;

    /// `line` begins with the trigger byte and runs to the end of the line,
    /// without the line terminator. Returning a node consumes the whole line.
    fn parse(&self, line: &str) -> Option<Box<dyn ExtensionNode>>;
}

/// Render-time hook, visited once entering and once leaving a node.
pub trait NodeRenderer: Send + Sync {
    fn kind(&self) -> NodeKind;

    fn render(&self, node: &dyn ExtensionNode, entering: bool, out: &mut String) -> Result<(), MarkdownError>;
}

/// A hook with its priority; higher priorities are consulted first.
pub struct Prioritized<T> {
    pub value: T,
    pub priority: i32,
}

pub fn prioritized<T>(value: T, priority: i32) -> Prioritized<T> {
    Prioritized { value, priority }
}

pub trait Extension {
    fn extend(&self, builder: &mut MarkdownBuilder);
}

pub struct MarkdownBuilder {
    options: Options,
    inline_parsers: Vec<Prioritized<Arc<dyn InlineParser>>>,
    node_renderers: Vec<Prioritized<Arc<dyn NodeRenderer>>>,
    auto_heading_id: bool,
    highlight: bool,
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_HEADING_ATTRIBUTES
                | Options::ENABLE_GFM,
            inline_parsers: Vec::new(),
            node_renderers: Vec::new(),
            auto_heading_id: true,
            highlight: true,
        }
    }

    pub fn extension<E: Extension>(mut self, extension: E) -> Self {
        extension.extend(&mut self);
        self
    }

    pub fn add_inline_parser(&mut self, parser: Prioritized<Arc<dyn InlineParser>>) {
        self.inline_parsers.push(parser);
    }

    pub fn add_node_renderer(&mut self, renderer: Prioritized<Arc<dyn NodeRenderer>>) {
        self.node_renderers.push(renderer);
    }

    pub fn auto_heading_id(mut self, enabled: bool) -> Self {
        self.auto_heading_id = enabled;
        self
    }

    pub fn highlight_code(mut self, enabled: bool) -> Self {
        self.highlight = enabled;
        self
    }

    pub fn build(mut self) -> Markdown {
        self.inline_parsers.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.node_renderers.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut renderers: HashMap<NodeKind, Arc<dyn NodeRenderer>> = HashMap::new();
        for renderer in self.node_renderers {
            renderers.entry(renderer.value.kind()).or_insert(renderer.value);
        }

        Markdown {
            options: self.options,
            inline_parsers: self.inline_parsers.into_iter().map(|p| p.value).collect(),
            renderers,
            auto_heading_id: self.auto_heading_id,
            highlight: self.highlight,
        }
    }
}

pub struct Markdown {
    options: Options,
    inline_parsers: Vec<Arc<dyn InlineParser>>,
    renderers: HashMap<NodeKind, Arc<dyn NodeRenderer>>,
    auto_heading_id: bool,
    highlight: bool,
}

enum Node<'a> {
    Event(Event<'a>),
    Extension(Box<dyn ExtensionNode>),
}

impl Markdown {
    pub fn builder() -> MarkdownBuilder {
        MarkdownBuilder::new()
    }

    pub fn to_html(&self, source: &str) -> Result<String, MarkdownError> {
        let mut out = String::with_capacity(source.len() * 3 / 2);
        self.convert(source, &mut out)?;
        Ok(out)
    }

    pub fn convert(&self, source: &str, out: &mut String) -> Result<(), MarkdownError> {
        let nodes = self.parse(source);
        let mut events = self.render_nodes(nodes)?;

        if self.auto_heading_id {
            events = add_heading_ids(events);
        }
        if self.highlight {
            events = highlight_code_blocks(events);
        }

        html::push_html(out, events.into_iter());
        Ok(())
    }

    fn parse<'a>(&self, source: &'a str) -> Vec<Node<'a>> {
        let mut nodes = Vec::new();
        let mut events = Parser::new_ext(source, self.options)
            .into_offset_iter()
            .peekable();
        let mut at_line_start = false;
        let mut open = OpenTags::default();

        while let Some((event, range)) = events.next() {
            let line_start = at_line_start;
            at_line_start = starts_line(&event);

            if line_start && matches!(event, Event::Text(_)) {
                if let Some((node, line_end)) = self.parse_inline(source, range.start) {
                    nodes.push(Node::Extension(node));
                    skip_rest_of_line(&mut events, line_end, &mut open, &mut nodes);
                    continue;
                }
            }

            if open.keep(&event) {
                nodes.push(Node::Event(event));
            }
        }

        nodes
    }

    fn parse_inline(&self, source: &str, start: usize) -> Option<(Box<dyn ExtensionNode>, usize)> {
        let rest = source.get(start..)?;
        let trigger = *rest.as_bytes().first()?;
        let line_len = rest.find('\n').unwrap_or(rest.len());
        let line = rest[..line_len].trim_end();

        self.inline_parsers
            .iter()
            .filter(|p| p.trigger() == trigger)
            .find_map(|p| p.parse(line))
            .map(|node| (node, start + line_len))
    }

    fn render_nodes<'a>(&self, nodes: Vec<Node<'a>>) -> Result<Vec<Event<'a>>, MarkdownError> {
        nodes
            .into_iter()
            .map(|node| match node {
                Node::Event(event) => Ok(event),
                Node::Extension(node) => {
                    let kind = node.kind();
                    let renderer = self
                        .renderers
                        .get(&kind)
                        .ok_or(MarkdownError::NoRenderer(kind.name()))?;

                    let mut html = String::new();
                    renderer.render(node.as_ref(), true, &mut html)?;
                    renderer.render(node.as_ref(), false, &mut html)?;
                    Ok(Event::InlineHtml(html.into()))
                }
            })
            .collect()
    }
}

fn starts_line(event: &Event<'_>) -> bool {
    matches!(
        event,
        Event::Start(Tag::Paragraph) | Event::Start(Tag::Item) | Event::SoftBreak | Event::HardBreak
    )
}

fn is_inline(event: &Event<'_>) -> bool {
    match event {
        Event::Text(_) | Event::Code(_) | Event::InlineHtml(_) | Event::FootnoteReference(_) => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
        ),
        Event::End(tag) => matches!(
            tag,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
        ),
        _ => false,
    }
}

/// Inline tags whose `Start` was consumed along with a directive line while
/// their `End` is still ahead in the paragraph.
#[derive(Default)]
struct OpenTags {
    orphaned: usize,
    /// Tags opened after the consumed line, while orphans are pending
    nested: usize,
}

impl OpenTags {
    /// Whether `event` stays in the stream. Drops the `End` of orphaned tags.
    fn keep(&mut self, event: &Event<'_>) -> bool {
        if self.orphaned == 0 || !is_inline(event) {
            return true;
        }
        match event {
            Event::Start(_) => self.nested += 1,
            Event::End(_) if self.nested > 0 => self.nested -= 1,
            Event::End(_) => {
                self.orphaned -= 1;
                return false;
            }
            _ => {}
        }
        true
    }
}

/// Drop the inline events that belong to a consumed line. Tags opened on the
/// line and still unclosed at its end are recorded in `open`.
fn skip_rest_of_line<'a, I>(events: &mut Peekable<I>, line_end: usize, open: &mut OpenTags, nodes: &mut Vec<Node<'a>>)
where
    I: Iterator<Item = (Event<'a>, Range<usize>)>,
{
    let mut depth = 0usize;
    while let Some((event, _)) = events.next_if(|(event, range)| range.start < line_end && is_inline(event)) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            // Closes a tag opened before the consumed line
            Event::End(_) => {
                if open.keep(&event) {
                    nodes.push(Node::Event(event));
                }
            }
            _ => {}
        }
    }
    open.orphaned += depth;
}

/// Anchor id for a heading's text.
pub fn heading_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            slug.push('-');
        } else if c == '_' {
            slug.push('_');
        }
    }

    if slug.is_empty() { "heading".to_string() } else { slug }
}

fn unique_id(seen: &mut HashMap<String, usize>, base: String) -> String {
    let Some(&count) = seen.get(&base) else {
        seen.insert(base.clone(), 0);
        return base;
    };

    let mut n = count;
    loop {
        n += 1;
        let candidate = format!("{base}-{n}");
        if !seen.contains_key(&candidate) {
            seen.insert(base, n);
            seen.insert(candidate.clone(), 0);
            return candidate;
        }
    }
}

fn add_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut seen = HashMap::new();
    let mut out = Vec::with_capacity(events.len());
    let mut pending: Option<usize> = None;
    let mut text = String::new();

    for event in events {
        match &event {
            Event::Start(Tag::Heading { id: None, .. }) => {
                pending = Some(out.len());
                text.clear();
            }
            Event::Start(Tag::Heading { id: Some(id), .. }) => {
                seen.entry(id.to_string()).or_insert(0);
            }
            Event::Text(t) | Event::Code(t) if pending.is_some() => text.push_str(t),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(idx) = pending.take() {
                    let id = unique_id(&mut seen, heading_slug(&text));
                    if let Some(Event::Start(Tag::Heading { id: slot, .. })) = out.get_mut(idx) {
                        *slot = Some(id.into());
                    }
                }
            }
            _ => {}
        }
        out.push(event);
    }

    out
}

fn highlight_code_blocks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut fence: Option<(String, String)> = None;

    for event in events {
        if let Some((lang, code)) = fence.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    out.push(Event::Html(highlight::code_block(code, lang).into()));
                    fence = None;
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                fence = Some((lang.to_string(), String::new()));
            }
            other => out.push(other),
        }
    }

    out
}
