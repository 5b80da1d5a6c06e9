//! HTML escaping, markup sanitizing and tag stripping.
//!
//! Bot replies may contain HTML. Before such a reply reaches the page it is
//! rewritten against a tag allowlist: allowed tags are re-emitted without
//! attributes (except a safe `href` on links), dangerous elements are dropped
//! together with their content, and any other tag is removed while its text
//! is kept.

/// Tags re-emitted by [`sanitize_markup`].
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "li", "ol", "p", "pre", "s", "span", "strong", "sub", "sup", "table", "tbody", "td",
    "th", "thead", "tr", "u", "ul",
];

/// Elements dropped together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "textarea", "select",
    "svg", "math", "head", "title",
];

const VOID_TAGS: &[&str] = &["br", "hr"];

const SAFE_URL_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

/// Escape text for use in HTML element content or a quoted attribute.
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A tag found while scanning markup.
#[derive(Debug)]
struct Tag<'a> {
    name: String,
    closing: bool,
    /// Everything between the name and the closing `>`.
    attrs: &'a str,
}

/// Outcome of looking at the text right after a `<`.
#[derive(Debug)]
enum Scan<'a> {
    /// A tag spanning `len` bytes.
    Tag(Tag<'a>, usize),
    /// A comment, doctype or processing instruction spanning `len` bytes.
    Skip(usize),
    /// Not markup; the `<` is literal text.
    Literal,
}

fn scan(input: &str) -> Scan<'_> {
    debug_assert!(input.starts_with('<'));
    let rest = &input[1..];

    if rest.starts_with("!--") {
        return match rest.find("-->") {
            Some(end) => Scan::Skip(1 + end + 3),
            None => Scan::Skip(input.len()),
        };
    }
    if rest.starts_with('!') || rest.starts_with('?') {
        return match rest.find('>') {
            Some(end) => Scan::Skip(1 + end + 1),
            None => Scan::Skip(input.len()),
        };
    }

    let (closing, body) = match rest.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, rest),
    };
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Scan::Literal;
    }
    let Some(end) = find_tag_end(body) else {
        return Scan::Literal;
    };

    let name_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len())
        .min(end);
    let name = body[..name_len].to_ascii_lowercase();
    let attrs = &body[name_len..end];
    let consumed = 1 + usize::from(closing) + end + 1;

    Scan::Tag(
        Tag {
            name,
            closing,
            attrs,
        },
        consumed,
    )
}

/// Index of the `>` closing a tag body, skipping quoted attribute values.
fn find_tag_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Byte length from the start of `input` to just past `</name ...>`, if present.
fn skip_element(input: &str, name: &str) -> Option<usize> {
    let lower = input.to_ascii_lowercase();
    let needle = format!("</{name}");
    let start = lower.find(&needle)?;
    let close = lower[start..].find('>')?;
    Some(start + close + 1)
}

/// Extract an attribute value from a tag body.
fn attr_value<'a>(attrs: &'a str, wanted: &str) -> Option<&'a str> {
    let mut rest = attrs.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let mut value = None;
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (v, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let inner = &after_eq[1..];
                    let end = inner.find(q).unwrap_or(inner.len());
                    (&inner[..end], inner.get(end + 1..).unwrap_or(""))
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            value = Some(v);
            rest = remaining;
        }

        if name.eq_ignore_ascii_case(wanted) {
            return value;
        }
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
    }
    None
}

fn is_safe_url(url: &str) -> bool {
    let lower = decode_entities(url).trim().to_ascii_lowercase();
    SAFE_URL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Rewrite untrusted HTML so only allowlisted, attribute-free markup remains.
///
/// The output is balanced: a closing tag without a matching open tag is
/// dropped, and tags still open at the end are closed. The fragment can
/// therefore never close an element it is embedded in.
#[must_use]
pub fn sanitize_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open: Vec<String> = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(lt) = rest.find('<') else {
            push_text(&mut out, rest);
            break;
        };
        push_text(&mut out, &rest[..lt]);
        pos += lt;

        match scan(&input[pos..]) {
            Scan::Literal => {
                out.push_str("&lt;");
                pos += 1;
            }
            Scan::Skip(len) => pos += len,
            Scan::Tag(tag, len) => {
                pos += len;
                if DROPPED_ELEMENTS.contains(&tag.name.as_str()) {
                    if !tag.closing && !tag.attrs.trim_end().ends_with('/') {
                        pos += skip_element(&input[pos..], &tag.name).unwrap_or(input.len() - pos);
                    }
                    continue;
                }
                if !ALLOWED_TAGS.contains(&tag.name.as_str()) {
                    continue;
                }
                if tag.closing {
                    close_tag(&mut out, &mut open, &tag.name);
                } else {
                    push_open_tag(&mut out, &tag);
                    if !VOID_TAGS.contains(&tag.name.as_str()) {
                        open.push(tag.name);
                    }
                }
            }
        }
    }

    while let Some(name) = open.pop() {
        push_close_tag(&mut out, &name);
    }
    out
}

/// Close `name` and everything opened inside it. Unmatched closers are dropped.
fn close_tag(out: &mut String, open: &mut Vec<String>, name: &str) {
    let Some(depth) = open.iter().rposition(|n| n == name) else {
        return;
    };
    for inner in open.drain(depth..).rev() {
        push_close_tag(out, &inner);
    }
}

fn push_close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_open_tag(out: &mut String, tag: &Tag<'_>) {
    out.push('<');
    out.push_str(&tag.name);
    if tag.name == "a" {
        if let Some(href) = attr_value(tag.attrs, "href").filter(|h| is_safe_url(h)) {
            out.push_str(" href=\"");
            out.push_str(&html_escape(&decode_entities(href)));
            out.push_str("\" rel=\"noopener noreferrer\" target=\"_blank\"");
        }
    }
    out.push('>');
}

/// Text between tags keeps its entities; a stray `>` is escaped.
fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '>' {
            out.push_str("&gt;");
        } else {
            out.push(c);
        }
    }
}

/// Plain text of a markup fragment: tags removed, entities decoded.
///
/// Hidden elements (scripts, styles) contribute nothing; `<br>` becomes a
/// newline.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(lt) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..lt]);
        pos += lt;

        match scan(&input[pos..]) {
            Scan::Literal => {
                text.push('<');
                pos += 1;
            }
            Scan::Skip(len) => pos += len,
            Scan::Tag(tag, len) => {
                pos += len;
                if DROPPED_ELEMENTS.contains(&tag.name.as_str()) && !tag.closing {
                    pos += skip_element(&input[pos..], &tag.name).unwrap_or(input.len() - pos);
                } else if tag.name == "br" {
                    text.push('\n');
                }
            }
        }
    }

    decode_entities(text.trim())
}

/// Decode the named entities HTML writers commonly emit plus numeric ones.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
