use std::path::Path;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};

/// Elements whose text never reaches the reader.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Why a single file could not be turned into a document.
///
/// These are recoverable: the harvester reports them and moves on to the
/// next file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("cannot read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("document is empty")]
    Empty,

    #[error("document contains NUL bytes and is not HTML")]
    Binary,
}

/// Searchable fields pulled out of one HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub body: String,
}

/// Parses HTML pages into title and visible body text.
///
/// Parsing is as forgiving as a browser: unclosed or stray tags never fail
/// extraction, they only change what text ends up in the body.
#[derive(Debug)]
pub struct Extractor {
    title: Selector,
    body: Selector,
    content: Option<Selector>,
}

impl Extractor {
    /// Build an extractor, optionally restricted to the elements matching
    /// `content_selector` (CSS syntax).
    pub fn new(content_selector: Option<&str>) -> Result<Self> {
        let content = content_selector.map(parse_selector).transpose()?;
        Ok(Self {
            title: parse_selector("title")?,
            body: parse_selector("body")?,
            content,
        })
    }

    /// Read and extract the file at `path`.
    pub fn extract_file(
        &self,
        path: &Path,
    ) -> std::result::Result<Extracted, ExtractionError> {
        let raw = std::fs::read(path)?;
        self.extract(&raw)
    }

    /// Extract title and body from raw page bytes.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn extract(
        &self,
        raw: &[u8],
    ) -> std::result::Result<Extracted, ExtractionError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractionError::Empty);
        }
        if raw.contains(&0) {
            return Err(ExtractionError::Binary);
        }

        let text = String::from_utf8_lossy(raw);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        let html = Html::parse_document(text);

        let title = html
            .select(&self.title)
            .next()
            .map(|t| collapse_whitespace(t.text()))
            .unwrap_or_default();

        let body = self
            .content
            .as_ref()
            .map(|sel| {
                html.select(sel)
                    .map(visible_text)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|t| !t.is_empty())
            .or_else(|| html.select(&self.body).next().map(visible_text))
            .unwrap_or_else(|| visible_text(html.root_element()));

        Ok(Extracted { title, body })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| {
        Error::Config(format!("invalid CSS selector '{css}': {e}"))
    })
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
