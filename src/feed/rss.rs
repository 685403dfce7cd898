// src/feed/rss.rs
//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing on top of quick-xml's serde support.

use anyhow::{Context, Result};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::types::RawEntry;
use crate::error::FeedError;

/// A parsed feed: optional channel title plus its entries in document order.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/* ---------- RSS 2.0 ---------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<String>,
}

/* ---------- RSS 1.0 / RDF (items are siblings of the channel) ---------- */

#[derive(Debug, Deserialize)]
struct Rdf {
    channel: Option<RdfChannel>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfChannel {
    title: Option<String>,
}

/* ---------- Atom ---------- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<String>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        Self {
            title: it.title.unwrap_or_default(),
            link: it.link.or(it.guid).unwrap_or_default(),
            summary: it.description.unwrap_or_default(),
            published: it.pub_date.or(it.dc_date),
            tags: it.category,
            relevance: None,
        }
    }
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        // Prefer rel="alternate" (or no rel), then any href.
        let link = e
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.link.first())
            .and_then(|l| l.href.clone())
            .or(e.id)
            .unwrap_or_default();
        Self {
            title: e.title.unwrap_or_default(),
            link,
            summary: e.summary.unwrap_or_default(),
            published: e.published.or(e.updated),
            tags: e.category.into_iter().filter_map(|c| c.term).collect(),
            relevance: None,
        }
    }
}

/// Parse any supported feed document.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(xml);

    let parsed = match root_element(&xml) {
        Some("rss") => {
            let rss: Rss = from_str(&xml).context("parsing rss 2.0 xml")?;
            ParsedFeed {
                title: rss.channel.title,
                entries: rss.channel.item.into_iter().map(RawEntry::from).collect(),
            }
        }
        Some("feed") => {
            let feed: AtomFeed = from_str(&xml).context("parsing atom xml")?;
            ParsedFeed {
                title: feed.title,
                entries: feed.entry.into_iter().map(RawEntry::from).collect(),
            }
        }
        Some(name) if name.ends_with("RDF") => {
            let rdf: Rdf = from_str(&xml).context("parsing rss 1.0 xml")?;
            ParsedFeed {
                title: rdf.channel.and_then(|c| c.title),
                entries: rdf.item.into_iter().map(RawEntry::from).collect(),
            }
        }
        Some(other) => return Err(FeedError::UnsupportedFormat(format!("root element `{other}`")).into()),
        None => return Err(FeedError::UnsupportedFormat("no root element".into()).into()),
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(parsed)
}

/// Name of the first element, skipping the prolog, comments and doctype.
fn root_element(xml: &str) -> Option<&str> {
    let mut rest = xml;
    loop {
        let start = rest.find('<')?;
        rest = &rest[start + 1..];
        if rest.starts_with('?') || rest.starts_with('!') {
            continue;
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        return Some(&rest[..end]);
    }
}

/// HTML entities that XML parsers reject.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_element_skips_prolog() {
        let xml = "<?xml version=\"1.0\"?>\n<!-- c -->\n<rss version=\"2.0\"><channel/></rss>";
        assert_eq!(root_element(xml), Some("rss"));
        assert_eq!(root_element("<rdf:RDF xmlns:rdf=\"x\">"), Some("rdf:RDF"));
        assert_eq!(root_element("no markup"), None);
    }

    #[test]
    fn parses_rss2_items() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Demo</title>
<item><title>A &amp; B</title><link>https://a.example/1</link>
<pubDate>Tue, 10 Jun 2025 08:00:00 GMT</pubDate>
<description><![CDATA[<p>Hello&nbsp;world</p>]]></description>
<category>AI</category><category>Research</category></item>
<item><title>No link</title><guid>https://a.example/2</guid></item>
</channel></rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Demo"));
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(feed.entries[0].title, "A & B");
        assert_eq!(feed.entries[0].tags, vec!["AI", "Research"]);
        assert_eq!(feed.entries[1].link, "https://a.example/2");
    }

    #[test]
    fn parses_atom_entries() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Atom demo</title>
<entry><title type="html">Robots learn</title>
<link rel="replies" href="https://b.example/1#comments"/>
<link rel="alternate" href="https://b.example/1"/>
<id>tag:b.example,2025:1</id><updated>2025-06-10T08:00:00Z</updated>
<summary>Short</summary><category term="robotics"/></entry>
</feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.entries.len(), 1);
        let e = &feed.entries[0];
        assert_eq!(e.link, "https://b.example/1");
        assert_eq!(e.published.as_deref(), Some("2025-06-10T08:00:00Z"));
        assert_eq!(e.tags, vec!["robotics"]);
    }

    #[test]
    fn unknown_root_is_an_error() {
        assert!(parse_feed("<html><body/></html>").is_err());
    }
}
