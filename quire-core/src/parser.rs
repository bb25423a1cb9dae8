//! Documents made of a YAML front-matter block and a Markdown body.
//!
//! ```text
//! ---
//! title: Why quire
//! date: 2024-06-01
//! ---
//! # Markdown body
//! ```
//!
//! The input is split on the first two `---` markers only; any later marker
//! belongs to the body.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::markdown::{Markdown, MarkdownError};

pub const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid frontmatter format")]
    InvalidFrontMatter,
    #[error("failed to parse frontmatter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
    #[error("failed to convert markdown: {0}")]
    Markdown(#[from] MarkdownError),
}

/// A parsed document.
#[derive(Debug, Clone)]
pub struct Content<F> {
    /// Caller schema, deserialized from the front matter.
    pub front_matter: F,
    /// `None` when the front matter has no usable date.
    pub date: Option<DateTime<FixedOffset>>,
    /// Rendered HTML body.
    pub content: String,
    /// Markdown body as written.
    pub raw: String,
}

/// Fields the document itself reads out of the front matter.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "native_date")]
    date: Option<DateTime<FixedOffset>>,
}

/// Accepts anything under `date`, keeping only RFC 3339 timestamps. Other
/// spellings are handled by [`fallback_date`].
fn native_date<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_yaml::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok()))
}

/// Parses documents whose front matter follows the schema `F`.
pub struct Parser<F> {
    markdown: Arc<Markdown>,
    _schema: PhantomData<fn() -> F>,
}

impl<F> Clone for Parser<F> {
    fn clone(&self) -> Self {
        Self {
            markdown: Arc::clone(&self.markdown),
            _schema: PhantomData,
        }
    }
}

impl<F: DeserializeOwned> Parser<F> {
    pub fn new(markdown: Arc<Markdown>) -> Self {
        Self {
            markdown,
            _schema: PhantomData,
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Content<F>, ParseError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse(&data)
    }

    pub fn parse(&self, data: &[u8]) -> Result<Content<F>, ParseError> {
        let text = std::str::from_utf8(data)?;

        let parts: Vec<&str> = text.splitn(3, FRONT_MATTER_DELIMITER).collect();
        let &[_, front_matter, body] = parts.as_slice() else {
            return Err(ParseError::InvalidFrontMatter);
        };

        let value = match serde_yaml::from_str::<serde_yaml::Value>(front_matter)? {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
            value => value,
        };
        let envelope: Envelope = serde_yaml::from_value(value.clone())?;
        let schema: F = serde_yaml::from_value(value)?;

        let content = self.markdown.to_html(body)?;

        Ok(Content {
            front_matter: schema,
            date: envelope.date.or_else(|| fallback_date(front_matter)),
            content,
            raw: body.to_string(),
        })
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%+", "%Y-%m-%d %H:%M:%S"];

fn parse_date(value: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let utc = |naive: NaiveDateTime| naive.and_utc().fixed_offset();

    match format {
        "%Y-%m-%d" => NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(utc),
        "%+" => DateTime::parse_from_rfc3339(value).ok(),
        _ => NaiveDateTime::parse_from_str(value, format).ok().map(utc),
    }
}

/// Scan the raw front matter for the first `date:` line and try each known
/// format in turn.
fn fallback_date(front_matter: &str) -> Option<DateTime<FixedOffset>> {
    let line = front_matter
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("date:"))?;

    let value = line["date:".len()..].trim().trim_matches(['"', '\'']);

    DATE_FORMATS.iter().find_map(|format| parse_date(value, format))
}
