//! Text helpers for Telegram HTML messages.

/// Longest preview, in characters, before it is cut.
pub const PREVIEW_MAX_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Tags whose contents never reach a text preview.
const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "title"];

/// Tags that separate words when flattened to text.
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "tr", "td", "th", "table", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "blockquote", "section", "article",
];

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped excerpt of `input`, cut to [`PREVIEW_MAX_CHARS`] characters.
///
/// The cut is decided on the raw character count and made before escaping,
/// so an entity is never split in half.
pub fn excerpt(input: &str) -> String {
    if input.chars().count() <= PREVIEW_MAX_CHARS {
        return escape_html(input);
    }
    let cut: String = input.chars().take(PREVIEW_MAX_CHARS).collect();
    format!("{}{}", escape_html(&cut), ELLIPSIS)
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten an HTML document to a single line of readable text.
pub fn html_to_text(html: &str) -> String {
    // ASCII lowercasing keeps byte offsets, so positions found in `lower`
    // index `html` directly.
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        out.push_str(&html[pos..start]);
        let Some(len) = html[start + 1..].find('>') else {
            // unterminated tag, drop the remainder
            pos = html.len();
            break;
        };

        let inner = &lower[start + 1..start + 1 + len];
        let closing = inner.starts_with('/');
        let name: String = inner
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        pos = start + len + 2;

        if !closing && SKIPPED_TAGS.contains(&name.as_str()) {
            let close = format!("</{}", name);
            pos = match lower[pos..].find(&close) {
                Some(found) => pos + found,
                None => html.len(),
            };
        } else if BLOCK_TAGS.contains(&name.as_str()) {
            out.push(' ');
        }
    }
    out.push_str(&html[pos..]);

    collapse_whitespace(&decode_entities(&out))
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Raw preview text of a mail: its plain text, or the flattened HTML body
/// when the plain text is empty.
pub fn preview_source(text: Option<&str>, content: Option<&str>) -> String {
    let plain = text.map(collapse_whitespace).unwrap_or_default();
    if !plain.is_empty() {
        return plain;
    }
    content.map(html_to_text).unwrap_or_default()
}
