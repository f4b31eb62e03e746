//! Pages served to the bot's in-app browser when a preview link is opened.

use crate::link_token::to_origin;
use crate::text::escape_html;

pub const ACCESS_DENIED: &str = "Access denied";
pub const MAIL_NOT_FOUND: &str = "The email does not exist";

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>
body { margin: 0; padding: 12px; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; word-break: break-word; }
.text { white-space: pre-wrap; font-size: 14px; line-height: 1.5; }
img { max-width: 100%; height: auto; }
</style>
</head>
<body>
"#;

const TAIL: &str = "\n</body>\n</html>\n";

/// Page showing plain text verbatim.
pub fn text_page(text: &str) -> String {
    format!(
        "{}<div class=\"text\">{}</div>{}",
        HEAD,
        escape_html(text),
        TAIL
    )
}

/// Page embedding a mail's HTML body. Root-relative resource references
/// are pointed at `storage_domain` when one is configured.
pub fn html_page(content: &str, storage_domain: Option<&str>) -> String {
    let body = match storage_domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => {
            let origin = to_origin(domain);
            let content = prefix_root_relative(content, '"', &origin);
            prefix_root_relative(&content, '\'', &origin)
        }
        None => content.to_string(),
    };
    format!("{}{}{}", HEAD, body, TAIL)
}

/// Prefix `src=<quote>/...` references with `origin`. Protocol-relative
/// `//host/...` references are left alone.
fn prefix_root_relative(content: &str, quote: char, origin: &str) -> String {
    let needle = format!("src={}/", quote);
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = rest.find(&needle) {
        let path_start = pos + needle.len();
        out.push_str(&rest[..path_start - 1]);
        if !rest[path_start..].starts_with('/') {
            out.push_str(origin);
        }
        out.push('/');
        rest = &rest[path_start..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_page_escapes() {
        let page = text_page("a <b> & c");
        assert!(page.contains("<div class=\"text\">a &lt;b&gt; &amp; c</div>"));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_html_page_rewrites_relative_sources() {
        let page = html_page(
            r#"<img src="/attachments/1.png"><img src="https://cdn.example.com/2.png">"#,
            Some("r2.example.com"),
        );
        assert!(page.contains(r#"src="https://r2.example.com/attachments/1.png""#));
        assert!(page.contains(r#"src="https://cdn.example.com/2.png""#));
    }

    #[test]
    fn test_html_page_keeps_protocol_relative_sources() {
        let page = html_page(
            r#"<img src="//cdn.example.com/a.png"><img src='//cdn.example.com/b.png'><img src='/c.png'>"#,
            Some("r2.example.com"),
        );
        assert!(page.contains(r#"src="//cdn.example.com/a.png""#));
        assert!(page.contains(r#"src='//cdn.example.com/b.png'"#));
        assert!(page.contains(r#"src='https://r2.example.com/c.png'"#));
        assert!(!page.contains("r2.example.com//"));
    }

    #[test]
    fn test_html_page_without_storage_domain() {
        let page = html_page(r#"<p>hi</p><img src="/a.png">"#, None);
        assert!(page.contains(r#"<p>hi</p><img src="/a.png">"#));
    }
}
