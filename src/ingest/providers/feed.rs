// src/ingest/providers/feed.rs
//! Syndication feed reader: RSS 2.0 `<item>` and Atom `<entry>` in one pass.

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::extract::{EntryFields, FieldSource};
use crate::ingest::normalize_text;
use crate::ingest::providers::{get_text, http_client, parse_timestamp};
use crate::ingest::types::{NormalizedItem, SourceAdapter, SourceKind};

/// Items taken from the top of each feed per poll.
pub const FEED_MAX_ITEMS: usize = 3;

const TITLE: &[FieldSource] = &[FieldSource::Text("title")];
const BODY: &[FieldSource] = &[
    FieldSource::Text("description"),
    FieldSource::Text("summary"),
    FieldSource::Text("content"),
    FieldSource::Text("encoded"),
];
const LINK: &[FieldSource] = &[
    FieldSource::Text("link"),
    FieldSource::Attr("link", "href"),
    FieldSource::Text("guid"),
    FieldSource::Text("id"),
];
const PUBLISHED: &[FieldSource] = &[
    FieldSource::Text("pubdate"),
    FieldSource::Text("published"),
    FieldSource::Text("updated"),
    FieldSource::Text("date"),
];

pub struct FeedAdapter {
    label: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl FeedAdapter {
    pub fn from_fixture(label: &str, xml: &str) -> Self {
        Self {
            label: label.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Label defaults to the feed host, e.g. "cointelegraph.com".
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = reqwest::Url::parse(url).with_context(|| format!("invalid feed url {url}"))?;
        let label = parsed.host_str().unwrap_or("RSS Feed").trim_start_matches("www.").to_string();
        Ok(Self {
            label,
            mode: Mode::Http {
                url: url.to_string(),
                client: http_client(10)?,
            },
        })
    }

    pub fn parse_items(&self, xml: &str) -> Result<Vec<NormalizedItem>> {
        let entries = parse_entries(xml)?;
        let items = entries
            .iter()
            .take(FEED_MAX_ITEMS)
            .map(|e| {
                let title = e.first(TITLE).map(|t| normalize_text(&t)).unwrap_or_default();
                let body = e.first(BODY).map(|b| normalize_text(&b)).unwrap_or_default();
                let link = e.first(LINK).unwrap_or_default();
                NormalizedItem::new(SourceKind::FeedReader, self.label.clone(), title, link)
                    .with_body(&body)
                    .published(e.first(PUBLISHED).as_deref().and_then(parse_timestamp))
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    async fn fetch_latest(&self) -> Result<Vec<NormalizedItem>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s),
            Mode::Http { url, client } => {
                let body = get_text(client, url, "feed").await?;
                self.parse_items(&body)
                    .with_context(|| format!("parsing feed {url}"))
            }
        }
    }

    fn name(&self) -> &'static str {
        "feed"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::FeedReader
    }

    fn max_items(&self) -> usize {
        FEED_MAX_ITEMS
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn record_attrs(fields: &mut EntryFields, el: &str, e: &BytesStart<'_>) {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
        if let Ok(v) = attr.unescape_value() {
            fields
                .attrs
                .entry((el.to_string(), key))
                .or_insert_with(|| v.into_owned());
        }
    }
}

fn push_text(buf: &mut String, piece: &str) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(piece);
}

/// Collect the direct children of every `<item>`/`<entry>`, keyed by lowercase
/// local name (namespace prefixes dropped, so `dc:date` becomes `date`).
pub fn parse_entries(xml: &str) -> Result<Vec<EntryFields>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryFields> = None;
    let mut depth = 0usize;
    let mut field: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().context("reading feed xml")? {
            Event::Start(e) => {
                let name = local_name(&e);
                if current.is_none() {
                    if name == "item" || name == "entry" {
                        current = Some(EntryFields::default());
                        depth = 0;
                    }
                } else if let Some(cur) = current.as_mut() {
                    depth += 1;
                    if depth == 1 {
                        record_attrs(cur, &name, &e);
                        field = Some(name);
                        text.clear();
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(cur) = current.as_mut() {
                    if depth == 0 {
                        let name = local_name(&e);
                        record_attrs(cur, &name, &e);
                    }
                }
            }
            Event::Text(t) => {
                if current.is_some() && depth >= 1 {
                    match t.unescape() {
                        Ok(s) => push_text(&mut text, &s),
                        Err(_) => push_text(&mut text, &String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if current.is_some() && depth >= 1 {
                    push_text(&mut text, &String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        entries.extend(current.take());
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            if let (Some(cur), Some(name)) = (current.as_mut(), field.take()) {
                                cur.text.entry(name).or_insert_with(|| text.clone());
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
