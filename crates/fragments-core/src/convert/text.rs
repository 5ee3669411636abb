// ABOUTME: Pure text conversions: markdown to HTML, HTML to plain text, and JSON to plain text.
// ABOUTME: Same input always yields byte-identical output; nothing here touches storage.

use bytes::Bytes;
use pulldown_cmark::{Options, Parser, html};

use crate::error::FragmentError;
use crate::media::Format;

/// Render CommonMark (plus tables, strikethrough, task lists) as HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, parser);
    out
}

/// Strip tags from HTML, keeping text content.
///
/// Comments and the bodies of `<script>` and `<style>` are dropped. Basic
/// named entities and numeric character references are decoded.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('&') {
            match decode_entity(rest) {
                Some((ch, consumed)) => {
                    out.push(ch);
                    rest = &rest[consumed..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
            continue;
        }

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        let Some(close) = rest.find('>') else {
            out.push('<');
            rest = &rest[1..];
            continue;
        };
        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        let name: String = tag
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if (name == "script" || name == "style") && !tag.ends_with('/') {
            rest = skip_raw_text(rest, &name);
        }
    }

    out.push_str(rest);
    out
}

/// Skip past the closing tag of a raw-text element such as `<script>`.
fn skip_raw_text<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let Some(start) = lower.find(&format!("</{name}")) else {
        return "";
    };
    match rest[start..].find('>') {
        Some(end) => &rest[start + end + 1..],
        None => "",
    }
}

/// Decode an entity at the start of `s`, returning the character and the
/// number of bytes consumed.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let semi = s
        .char_indices()
        .take(12)
        .find(|(_, c)| *c == ';')
        .map(|(i, _)| i)?;
    let body = &s[1..semi];

    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let digits = body.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, semi + 1))
}

/// Parse a JSON payload and re-serialize it compactly.
pub fn json_to_text(data: &[u8]) -> Result<String, FragmentError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| FragmentError::ConversionFailed(format!("invalid JSON: {e}")))?;
    serde_json::to_string(&value)
        .map_err(|e| FragmentError::ConversionFailed(format!("could not serialize JSON: {e}")))
}

fn utf8(data: &[u8], source: Format) -> Result<&str, FragmentError> {
    std::str::from_utf8(data)
        .map_err(|e| FragmentError::ConversionFailed(format!("{source} content is not UTF-8: {e}")))
}

/// Convert between text-family formats (JSON included). The caller has
/// already checked that `target` is reachable from `source`.
pub fn convert_text(source: Format, target: Format, data: &Bytes) -> Result<Bytes, FragmentError> {
    if source == target {
        return Ok(data.clone());
    }

    let converted = match (source, target) {
        (Format::TextMarkdown, Format::TextHtml) => markdown_to_html(utf8(data, source)?),
        (Format::TextMarkdown, Format::TextPlain) => {
            strip_html(&markdown_to_html(utf8(data, source)?))
        }
        (Format::TextHtml, Format::TextPlain) => strip_html(utf8(data, source)?),
        (Format::ApplicationJson, Format::TextPlain) => json_to_text(data)?,
        _ => {
            return Err(FragmentError::UnsupportedConversion {
                from: source.essence().to_string(),
                extension: target.extension().to_string(),
            });
        }
    };
    Ok(Bytes::from(converted))
}
