//! Readable-text extraction from HTML.
//!
//! A forgiving regex pass, not a parser:
//! - drop `script`, `style`, `nav`, `footer`, `header` and `menu` blocks
//! - keep the inside of the first of `article`, `main`, `body` present
//! - strip remaining tags, decode common entities, collapse whitespace

use regex_lite::Regex;

/// Blocks removed with their contents.
const DROPPED_BLOCKS: &[&str] = &["script", "style", "nav", "footer", "header", "menu"];

/// Content roots, most specific first.
const CONTENT_ROOTS: &[&str] = &["article", "main", "body"];

const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&#x27;", "'"),
    ("&mdash;", "-"),
    ("&ndash;", "-"),
    // last, so "&amp;lt;" decodes to "&lt;" and not "<"
    ("&amp;", "&"),
];

/// Extract the readable text of a page. Returns an empty string when
/// nothing readable is found.
pub fn extract_text(html: &str) -> String {
    extract(html).unwrap_or_default()
}

fn extract(html: &str) -> Option<String> {
    let mut doc = Regex::new(r"(?s)<!--.*?-->").ok()?.replace_all(html, " ").into_owned();
    for tag in DROPPED_BLOCKS {
        let block = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok()?;
        doc = block.replace_all(&doc, " ").into_owned();
    }

    let mut root = None;
    for tag in CONTENT_ROOTS {
        if let Some(inner) = inner_html(&doc, tag)? {
            root = Some(inner);
            break;
        }
    }

    to_plain_text(root.unwrap_or(&doc))
}

/// Inside of the outermost `<tag>…</tag>` pair, if any. `None` only if the
/// pattern failed to compile.
fn inner_html<'a>(doc: &'a str, tag: &str) -> Option<Option<&'a str>> {
    let element = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>")).ok()?;
    Some(element.captures(doc).and_then(|caps| caps.get(1)).map(|m| m.as_str()))
}

/// Strip tags from an HTML fragment, decode entities and collapse
/// whitespace.
pub fn to_plain_text(fragment: &str) -> Option<String> {
    let tags = Regex::new(r"(?s)<[^>]*>").ok()?;
    let stripped = tags.replace_all(fragment, " ");
    Some(collapse_whitespace(&decode_entities(&stripped)))
}

pub fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| acc.replace(entity, replacement))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
