//! Allow-list markup sanitization.
//!
//! Regex-based and best-effort: malformed HTML never makes these functions
//! fail, they simply strip what they can recognize. Disallowed tags are
//! removed while their content is retained (the permissive strip-tags
//! semantic), then surviving tags lose every attribute outside the attribute
//! allow-list.

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?([a-z][a-z0-9]*)\b[^>]*>").unwrap());

static ATTR_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<([a-z][a-z0-9]*)(\s+[^>]*)>").unwrap());

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+([a-z][a-z0-9\-_]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]*)))?"#)
        .unwrap()
});

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static BETWEEN_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>"#).unwrap());

/// Strip tags outside `allowed_tags` (keeping their content), drop attributes
/// outside `allowed_attributes` from the survivors, collapse whitespace runs
/// to a single space, remove whitespace between adjacent tags and trim.
///
/// An empty attribute allow-list strips all attributes from all tags.
pub fn clean(html: &str, allowed_tags: &[String], allowed_attributes: &[String]) -> String {
    let tags: HashSet<String> = allowed_tags.iter().map(|t| t.to_ascii_lowercase()).collect();
    let attrs: HashSet<String> = allowed_attributes
        .iter()
        .map(|a| a.to_ascii_lowercase())
        .collect();

    let content = COMMENT_RE.replace_all(html, "");

    let content = TAG_RE.replace_all(&content, |caps: &Captures| {
        if tags.contains(&caps[1].to_ascii_lowercase()) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });

    let content = ATTR_TAG_RE.replace_all(&content, |caps: &Captures| {
        let tag = caps[1].to_string();
        if attrs.is_empty() {
            return format!("<{tag}>");
        }

        let mut kept = Vec::new();
        for attr in ATTR_RE.captures_iter(&caps[2]) {
            let name = attr[1].to_ascii_lowercase();
            if !attrs.contains(&name) {
                continue;
            }
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str());
            match value {
                Some(v) => kept.push(format!(r#"{}="{}""#, name, escape_attribute(v))),
                None => kept.push(name),
            }
        }

        if kept.is_empty() {
            format!("<{tag}>")
        } else {
            format!("<{} {}>", tag, kept.join(" "))
        }
    });

    let content = WS_RE.replace_all(&content, " ");
    let content = BETWEEN_TAGS_RE.replace_all(&content, "><");
    content.trim().to_string()
}

/// Remove every tag, keeping text content only.
pub fn strip_tags(html: &str) -> String {
    let content = COMMENT_RE.replace_all(html, "");
    TAG_RE.replace_all(&content, "").trim().to_string()
}

/// True when any anchor href points at a host other than `site_host` or one
/// of its subdomains. Fragment, relative, query-only, `mailto:` and `tel:`
/// hrefs never count.
pub fn has_external_link(html: &str, site_host: &str) -> bool {
    for caps in ANCHOR_RE.captures_iter(html) {
        let href = &caps[1];
        if href.starts_with('#') || href.starts_with('/') || href.starts_with('?') {
            continue;
        }
        if href.starts_with("mailto:") || href.starts_with("tel:") {
            continue;
        }
        let Ok(parsed) = url::Url::parse(href) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };
        if host != site_host && !host.ends_with(&format!(".{site_host}")) {
            return true;
        }
    }
    false
}

/// Escape an attribute value for re-emission. An already-escaped entity
/// passes through unchanged, so cleaning clean content is a no-op.
fn escape_attribute(value: &str) -> String {
    const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"];

    let mut out = String::with_capacity(value.len());
    for (i, ch) in value.char_indices() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '&' => {
                let rest = &value[i..];
                if ENTITIES.iter().any(|e| rest.starts_with(e)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            c => out.push(c),
        }
    }
    out
}
