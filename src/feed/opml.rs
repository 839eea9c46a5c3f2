use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

/// Maximum nesting depth for `<outline>` elements.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// Outline nesting exceeds [`MAX_OPML_DEPTH`].
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),
}

/// A feed subscription listed in an OPML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpmlFeed {
    /// `title` attribute, else `text`, else the feed URL.
    pub title: String,
    /// The `xmlUrl` attribute, unvalidated. The aggregator validates it so a
    /// bad entry still shows up as a "Not Found" section.
    pub xml_url: String,
}

/// Reads an OPML subscription file and returns its feeds in document order.
///
/// # Errors
///
/// Fails if the file cannot be read, is not well-formed XML, or nests
/// outlines deeper than 50 levels.
pub async fn load(path: &Path) -> Result<Vec<OpmlFeed>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read OPML file: {}", path.display()))?;
    Ok(parse_opml_content(&content)?)
}

/// Extracts every `<outline>` carrying an `xmlUrl`, at any depth.
///
/// Folder outlines (no `xmlUrl`) are traversed but not returned. quick-xml
/// does not process `<!ENTITY>` declarations, so custom entities are never
/// expanded.
pub fn parse_opml_content(content: &str) -> Result<Vec<OpmlFeed>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut buf = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH));
                }
                if let Some(feed) = outline_feed(&e, &reader) {
                    feeds.push(feed);
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                if let Some(feed) = outline_feed(&e, &reader) {
                    feeds.push(feed);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(feeds)
}

fn outline_feed(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Option<OpmlFeed> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;

    for attr in e.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => value.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable OPML attribute");
                continue;
            }
        };
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(value),
            b"title" => title = Some(value),
            b"text" => text = Some(value),
            _ => {}
        }
    }

    let xml_url = xml_url.filter(|u| !u.is_empty())?;
    let title = title
        .filter(|t| !t.is_empty())
        .or(text.filter(|t| !t.is_empty()))
        .unwrap_or_else(|| xml_url.clone());

    Some(OpmlFeed { title, xml_url })
}
