//! Just enough wikitext to read firmware tables.
//!
//! This is not a general MediaWiki parser. It understands tables, wiki-links,
//! and external links, and it knows to leave `|` characters alone when they
//! appear inside `{{templates}}` or `[[links]]`. Everything else is treated as
//! opaque text.

mod links;
mod table;

pub use self::links::{ExternalLink, WikiLink, external_links, wikilinks};
pub use self::table::{Cell, Table};
use tracing::instrument;

/// A parsed wiki page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    tables: Vec<Table>,
}
impl Document {
    /// Parses every top-level `{| ... |}` table out of the page source.
    ///
    /// Nested tables stay part of the cell that contains them. A table that
    /// is never closed runs to the end of the page.
    #[instrument(level = "debug", skip(wikitext), fields(wikitext_size = wikitext.len(), tables))]
    pub fn parse(wikitext: &str) -> Self {
        let mut tables = Vec::new();
        let mut nesting = Nesting::default();
        let mut current: Option<(usize, String)> = None;
        for line in wikitext.lines() {
            let trimmed = line.trim_start();
            match current.as_mut() {
                None => {
                    if nesting.is_top_level() && trimmed.starts_with("{|") {
                        current = Some((1, String::new()));
                    }
                },
                Some((depth, body)) => {
                    let mut closed = false;
                    if nesting.is_top_level() {
                        if trimmed.starts_with("{|") {
                            *depth += 1;
                        } else if trimmed.starts_with("|}") {
                            *depth -= 1;
                            closed = *depth == 0;
                        }
                    }
                    if closed {
                        tables.push(Table::parse(body));
                        current = None;
                    } else {
                        body.push_str(line);
                        body.push('\n');
                    }
                },
            }
            nesting.feed(line);
        }
        if let Some((_, body)) = current {
            tables.push(Table::parse(&body));
        }
        tracing::Span::current().record("tables", tables.len());
        Self { tables }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}
impl From<&str> for Document {
    fn from(wikitext: &str) -> Self {
        Self::parse(wikitext)
    }
}

/// Tracks how deep inside `{{ }}` and `[[ ]]` pairs a scan currently is.
///
/// Table structure only counts at depth zero.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Nesting {
    depth: usize,
}
impl Nesting {
    pub(crate) fn is_top_level(&self) -> bool {
        self.depth == 0
    }

    pub(crate) fn feed(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i + 1 < bytes.len() {
            match &bytes[i..i + 2] {
                b"{{" | b"[[" => {
                    self.depth += 1;
                    i += 2;
                },
                b"}}" | b"]]" => {
                    self.depth = self.depth.saturating_sub(1);
                    i += 2;
                },
                _ => i += 1,
            }
        }
    }
}

/// Finds the first separator that isn't inside a template or a link,
/// returning its byte offset and length.
pub(crate) fn next_top_level(text: &str, separators: &[&str]) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"{{") || rest.starts_with(b"[[") {
            depth += 1;
            i += 2;
            continue;
        }
        if rest.starts_with(b"}}") || rest.starts_with(b"]]") {
            depth = depth.saturating_sub(1);
            i += 2;
            continue;
        }
        // Separators are all ASCII, so a match can never land inside a
        // multi-byte character.
        if depth == 0
            && let Some(separator) = separators.iter().find(|s| rest.starts_with(s.as_bytes()))
        {
            return Some((i, separator.len()));
        }
        i += 1;
    }
    None
}

/// Splits `text` on any of `separators`, ignoring those nested in templates or links.
pub(crate) fn split_top_level<'a>(text: &'a str, separators: &[&str]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some((position, length)) = next_top_level(rest, separators) {
        parts.push(&rest[..position]);
        rest = &rest[position + length..];
    }
    parts.push(rest);
    parts
}
