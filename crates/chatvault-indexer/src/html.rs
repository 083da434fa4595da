//! Lenient HTML to [`MarkupNode`] conversion
//!
//! Exported archives are rarely well-formed XML. The reader runs with end-name
//! checks off, void elements are closed as soon as they open, unmatched end
//! tags are dropped, and `script`/`style` bodies are cut out before parsing.

use std::borrow::Cow;

use chatvault_core::MarkupNode;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use tracing::debug;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse markup into a tree rooted at a synthetic `#document` element
pub fn parse_markup(html: &str) -> MarkupNode {
    let cleaned = strip_raw_text_elements(html);
    let mut reader = Reader::from_str(&cleaned);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack: Vec<Frame> = vec![Frame::new("#document".to_string(), Vec::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (tag, attributes) = element_parts(&e);
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    push_child(&mut stack, element(tag, attributes, Vec::new()));
                } else {
                    stack.push(Frame::new(tag, attributes));
                }
            }
            Ok(Event::Empty(e)) => {
                let (tag, attributes) = element_parts(&e);
                push_child(&mut stack, element(tag, attributes, Vec::new()));
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                close_until(&mut stack, &name);
            }
            Ok(Event::Text(t)) => {
                let text = decode_text(&t);
                if !text.is_empty() {
                    push_child(&mut stack, MarkupNode::Text(text));
                }
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                push_child(&mut stack, MarkupNode::Text(text));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                // Keep what was parsed so far
                debug!(position = reader.buffer_position(), error = %e, "markup parse stopped early");
                break;
            }
        }
    }

    while stack.len() > 1 {
        pop_frame(&mut stack);
    }
    match stack.pop() {
        Some(root) => root.into_node(),
        None => element("#document".to_string(), Vec::new(), Vec::new()),
    }
}

/// Visible text of the `body` element (or the whole document without one)
pub fn body_text(root: &MarkupNode) -> String {
    find_element(root, "body")
        .unwrap_or(root)
        .text_content()
}

fn find_element<'a>(node: &'a MarkupNode, tag: &str) -> Option<&'a MarkupNode> {
    if node.tag() == Some(tag) {
        return Some(node);
    }
    node.children().iter().find_map(|c| find_element(c, tag))
}

struct Frame {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

impl Frame {
    fn new(tag: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            tag,
            attributes,
            children: Vec::new(),
        }
    }

    fn into_node(self) -> MarkupNode {
        element(self.tag, self.attributes, self.children)
    }
}

fn element(tag: String, attributes: Vec<(String, String)>, children: Vec<MarkupNode>) -> MarkupNode {
    MarkupNode::Element {
        tag,
        attributes,
        children,
    }
}

fn push_child(stack: &mut [Frame], node: MarkupNode) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn pop_frame(stack: &mut Vec<Frame>) {
    if let Some(frame) = stack.pop() {
        push_child(stack, frame.into_node());
    }
}

/// Close open elements up to and including `tag`; ignore the end tag if
/// nothing by that name is open
fn close_until(stack: &mut Vec<Frame>, tag: &str) {
    let Some(pos) = stack.iter().rposition(|f| f.tag == tag) else {
        return;
    };
    if pos == 0 {
        return;
    }
    while stack.len() > pos {
        pop_frame(stack);
    }
}

fn element_parts(e: &BytesStart<'_>) -> (String, Vec<(String, String)>) {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let attributes = e
        .html_attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_ascii_lowercase();
            let value = a
                .unescape_value()
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            (key, value)
        })
        .collect();
    (tag, attributes)
}

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{00A0}"),
        "copy" => Some("©"),
        "hellip" => Some("…"),
        "mdash" => Some("—"),
        "ndash" => Some("–"),
        "rsquo" => Some("’"),
        "lsquo" => Some("‘"),
        "rdquo" => Some("”"),
        "ldquo" => Some("“"),
        _ => None,
    }
}

/// Unescape text, keeping unknown entities verbatim
fn decode_text(t: &BytesText<'_>) -> String {
    t.unescape_with(html_entity)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| decode_entities(&String::from_utf8_lossy(t)))
}

/// Resolve each `&name;` on its own so one unknown entity leaves the rest decoded
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let entity_end = tail.find(';').filter(|&semi| {
            semi > 1 && !tail[1..semi].contains(|c: char| c == '&' || c.is_whitespace())
        });
        match entity_end {
            Some(semi) => {
                let entity = &tail[..=semi];
                match unescape_with(entity, html_entity) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(_) => out.push_str(entity),
                }
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Remove `<script>` and `<style>` elements with their bodies
///
/// Their content is not markup and would derail the reader (`if (a < b)`).
pub fn strip_raw_text_elements(html: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some((start, tag)) = next_raw_open(&lower, cursor) {
        out.push_str(&html[cursor..start]);
        let close = format!("</{}", tag);
        cursor = match lower[start..].find(&close) {
            Some(rel) => {
                let close_start = start + rel;
                lower[close_start..]
                    .find('>')
                    .map(|gt| close_start + gt + 1)
                    .unwrap_or(html.len())
            }
            None => html.len(),
        };
    }
    out.push_str(&html[cursor..]);
    out
}

fn next_raw_open(lower: &str, from: usize) -> Option<(usize, &'static str)> {
    RAW_TEXT_ELEMENTS
        .iter()
        .filter_map(|tag| {
            let needle = format!("<{}", tag);
            let mut search = from;
            while let Some(rel) = lower[search..].find(&needle) {
                let pos = search + rel;
                let after = lower.as_bytes().get(pos + needle.len()).copied();
                // Require a name boundary so `<styles>` is not a style tag
                if matches!(after, None | Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')) {
                    return Some((pos, *tag));
                }
                search = pos + needle.len();
            }
            None
        })
        .min_by_key(|(pos, _)| *pos)
}
