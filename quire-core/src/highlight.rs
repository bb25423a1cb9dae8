//! Class-based syntax highlighting for fenced code blocks and reference pages.
//!
//! Output carries CSS classes only, never inline styles. The matching
//! stylesheet comes from [`theme_css`] and is shipped in the CSS bundle.

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    #[error("unknown syntax theme: {0}")]
    UnknownTheme(String),
    #[error("syntax highlighting failed: {0}")]
    Syntect(#[from] syntect::Error),
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    SYNTAX_SET.find_syntax_by_token(lang).or_else(|| {
        // Fallback mappings for languages the default set lacks
        match lang {
            "nix" => SYNTAX_SET.find_syntax_by_name("JavaScript"),
            "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
            "star" | "starlark" => SYNTAX_SET.find_syntax_by_name("Python"),
            _ => None,
        }
    })
}

/// Highlight `code` as `lang`, returning the inner HTML of a code element.
///
/// Returns `Ok(None)` when no syntax is known for `lang`.
pub fn highlight_spans(code: &str, lang: &str) -> Result<Option<String>, HighlightError> {
    let Some(syntax) = find_syntax(lang) else {
        return Ok(None);
    };

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    Ok(Some(generator.finalize()))
}

/// Render a complete `<pre><code>` block, highlighted when possible.
///
/// Never fails: a highlighting error degrades to an escaped plain block.
pub fn code_block(code: &str, lang: &str) -> String {
    let lang = lang.split_whitespace().next().unwrap_or_default();

    match highlight_spans(code, lang) {
        Ok(Some(spans)) => format!(
            "<pre class=\"code\"><code class=\"language-{}\">{}</code></pre>\n",
            html_escape::encode_double_quoted_attribute(lang),
            spans
        ),
        Ok(None) => plain_block(code),
        Err(e) => {
            tracing::warn!(lang, error = %e, "falling back to plain code block");
            plain_block(code)
        }
    }
}

fn plain_block(code: &str) -> String {
    format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(code))
}

/// Stylesheet for a syntect theme, matching the classes emitted above.
pub fn theme_css(theme: &str) -> Result<String, HighlightError> {
    let theme = THEME_SET
        .themes
        .get(theme)
        .ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;

    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_known_language_with_classes() {
        let html = code_block("fn main() {}\n", "rust");
        assert!(html.starts_with("<pre class=\"code\"><code class=\"language-rust\">"));
        assert!(html.contains("<span class=\""));
        assert!(!html.contains("style="));
    }

    #[test]
    fn unknown_language_is_escaped_plain_text() {
        let html = code_block("<b>hi</b>\n", "no-such-language");
        assert_eq!(html, "<pre><code>&lt;b&gt;hi&lt;/b&gt;\n</code></pre>\n");
    }

    #[test]
    fn info_string_attributes_are_ignored() {
        let html = code_block("x = 1\n", "python title=\"demo\"");
        assert!(html.contains("language-python"));
    }

    #[test]
    fn theme_css_for_known_and_unknown_themes() {
        let css = theme_css("InspiredGitHub").unwrap();
        assert!(css.contains('{'));
        assert!(matches!(theme_css("nope"), Err(HighlightError::UnknownTheme(_))));
    }
}
