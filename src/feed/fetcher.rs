//! RSS feed fetcher.
//!
//! Downloads a feed over HTTP with timeouts, a redirect limit and a size cap,
//! then decodes the `<rss><channel>` document with a streaming XML reader.
//! Channel and item titles and descriptions are HTML-unescaped once after
//! XML decoding.

use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::types::{FeedDocument, FeedItem};
use crate::config::FetcherConfig;
use crate::{GatorError, Result};

/// HTTP fetcher for RSS documents.
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse the feed at `url`.
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        debug!(url, "fetching feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatorError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(GatorError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(GatorError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_document(&bytes)
    }
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(GatorError::Validation("URL has no host".to_string()));
    }

    Ok(parsed)
}

/// Parse an RSS 2.0 document.
///
/// The root element must be `<rss>` and contain a `<channel>`. Elements are
/// matched on their qualified name, so `<atom:link>` never overwrites
/// `<link>`. Unknown elements are ignored.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument> {
    let mut reader = Reader::from_reader(bytes);

    let mut doc = FeedDocument::default();
    let mut item: Option<FeedItem> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut saw_channel = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| parse_error(&reader, e))?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.is_empty() && name != "rss" {
                    return Err(GatorError::Parse(format!(
                        "expected <rss> root element, found <{}>",
                        name
                    )));
                }
                if name == "item" && is_channel(&stack) {
                    item = Some(FeedItem::default());
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if stack.is_empty() {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(GatorError::Parse(format!(
                        "expected <rss> root element, found <{}/>",
                        name
                    )));
                }
            }
            Event::Text(e) => {
                text.push_str(&unescape_xml(&String::from_utf8_lossy(&e)));
            }
            Event::CData(e) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(_) => {
                let Some(name) = stack.pop() else {
                    return Err(GatorError::Parse("unexpected closing tag".to_string()));
                };
                let value = std::mem::take(&mut text).trim().to_string();

                if is_channel(&stack) {
                    match name.as_str() {
                        "title" => doc.title = unescape_html(&value),
                        "link" => doc.link = value,
                        "description" => doc.description = unescape_html(&value),
                        "item" => {
                            if let Some(finished) = item.take() {
                                doc.items.push(finished);
                            }
                        }
                        _ => {}
                    }
                } else if is_item(&stack) {
                    if let Some(current) = item.as_mut() {
                        match name.as_str() {
                            "title" => current.title = unescape_html(&value),
                            "link" => current.link = value,
                            "description" => current.description = unescape_html(&value),
                            "pubDate" => current.pub_date = value,
                            _ => {}
                        }
                    }
                } else if name == "channel" && stack.len() == 1 {
                    saw_channel = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(GatorError::Parse(format!(
            "unexpected end of document inside <{}>",
            stack.join("><")
        )));
    }

    if !saw_channel {
        return Err(GatorError::Parse("document has no <channel>".to_string()));
    }

    Ok(doc)
}

fn is_channel(stack: &[String]) -> bool {
    matches!(stack, [rss, channel] if rss == "rss" && channel == "channel")
}

fn is_item(stack: &[String]) -> bool {
    matches!(stack, [rss, channel, item] if rss == "rss" && channel == "channel" && item == "item")
}

/// Decode XML character and predefined entity references.
///
/// Entities XML does not define (`&nbsp;`, `&eacute;`) are kept verbatim for
/// the HTML pass. A `&` that does not start a reference is kept as is.
fn unescape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .map(|i| i + 1);

        match end {
            Some(end) if tail[end..].starts_with(';') => {
                let reference = &tail[..=end];
                match quick_xml::escape::unescape(reference) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(_) => out.push_str(reference),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn unescape_html(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

fn parse_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> GatorError {
    GatorError::Parse(format!(
        "invalid XML at byte {}: {}",
        reader.error_position(),
        e
    ))
}
