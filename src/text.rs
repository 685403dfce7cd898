// src/text.rs
//! Small text helpers shared by the feed parsers, filters and enrichment chains.

use once_cell::sync::OnceCell;
use percent_encoding::percent_decode_str;
use regex::Regex;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[^>]*>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Strip HTML tags, decode entities and collapse whitespace.
pub fn clean(s: &str) -> String {
    // Tags first so encoded markup (`&lt;b&gt;`) survives as text.
    let out = re_tags().replace_all(s, " ");
    let out = html_escape::decode_html_entities(&out).to_string();
    let out = out.replace('\u{00A0}', " ");
    re_ws().replace_all(&out, " ").trim().to_string()
}

/// Collapse whitespace only (keeps markup untouched).
pub fn squash_ws(s: &str) -> String {
    re_ws().replace_all(s, " ").trim().to_string()
}

/// CJK unified ideographs in the basic block (U+4E00..=U+9FA5).
pub fn is_chinese_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

pub fn has_chinese(s: &str) -> bool {
    s.chars().any(is_chinese_char)
}

pub fn chinese_count(s: &str) -> usize {
    s.chars().filter(|c| is_chinese_char(*c)).count()
}

pub fn latin_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_alphabetic()).count()
}

/// Share of Chinese characters among non-whitespace characters, in `[0, 1]`.
pub fn chinese_ratio(s: &str) -> f32 {
    let total = s.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    chinese_count(s) as f32 / total as f32
}

/// Hostname of `link` without a leading `www.`; `"unknown"` when unparsable.
pub fn domain(link: &str) -> String {
    url::Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Aggregators such as scour.ing wrap outbound links as `.../redirect/<encoded target>?...`.
/// Returns the decoded target, or the input when the link is not a redirect.
pub fn resolve_redirect(link: &str) -> String {
    let Some((_, after)) = link.split_once("/redirect/") else {
        return link.to_string();
    };
    let encoded = after.split('?').next().unwrap_or_default();
    let target = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
    if target.is_empty() {
        link.to_string()
    } else {
        target
    }
}

/// Normalized source key used by the per-source cap: lowercase, punctuation to spaces,
/// whitespace collapsed.
pub fn source_key(source: &str) -> String {
    let lowered = source.trim().to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` chars, appending `…` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out = out.trim_end().to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_tags_and_collapses_ws() {
        assert_eq!(clean("  <p>Hello&nbsp;&amp;\n <b>world</b></p> "), "Hello & world");
    }

    #[test]
    fn chinese_detection() {
        assert!(has_chinese("大模型 update"));
        assert!(!has_chinese("plain ascii"));
        assert_eq!(chinese_count("人工智能AI"), 4);
        assert!((chinese_ratio("人工AB") - 0.5).abs() < 1e-6);
        assert_eq!(chinese_ratio("   "), 0.0);
    }

    #[test]
    fn domain_strips_www_and_handles_garbage() {
        assert_eq!(domain("https://www.Nature.com/articles/x"), "nature.com");
        assert_eq!(domain("not a url"), "unknown");
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        let link = "https://scour.ing/redirect/https%3A%2F%2Fexample.org%2Fpost?from=feed";
        assert_eq!(resolve_redirect(link), "https://example.org/post");
        assert_eq!(resolve_redirect("https://a.b/c"), "https://a.b/c");
        assert_eq!(
            resolve_redirect("https://scour.ing/redirect/?x=1"),
            "https://scour.ing/redirect/?x=1"
        );
    }

    #[test]
    fn redirect_decodes_trailing_and_utf8_escapes() {
        assert_eq!(
            resolve_redirect("https://scour.ing/redirect/https%3A%2F%2Fexample.org%2F%E7%A0%94%E7%A9%B6%2F"),
            "https://example.org/研究/"
        );
        assert_eq!(
            resolve_redirect("https://scour.ing/redirect/https%3A%2F%2Fexample.org%2Fa%zz"),
            "https://example.org/a%zz"
        );
    }

    #[test]
    fn source_key_normalizes() {
        assert_eq!(source_key("  arXiv  cs.AI "), "arxiv cs ai");
        assert_eq!(source_key("MIT Technology-Review"), "mit technology review");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("人工智能研究", 4), "人工智能…");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
