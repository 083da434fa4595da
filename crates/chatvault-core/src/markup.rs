//! Record extraction from marked-up conversation archives
//!
//! Extraction works on a generic [`MarkupNode`] tree that any markup parser can
//! produce. Record boundaries come from the tree itself: either explicit
//! message/author markers on elements, or short speaker labels that toggle the
//! current speaker while walking the text nodes.

use crate::types::{Direction, Record, Source};

/// A node in a parsed markup document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

impl MarkupNode {
    pub fn element(tag: &str, attributes: &[(&str, &str)], children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(text: &str) -> Self {
        MarkupNode::Text(text.to_string())
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { tag, .. } => Some(tag),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            MarkupNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }

    fn has_class_containing(&self, needle: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|cls| cls.contains(needle)))
            .unwrap_or(false)
    }

    /// Whether a class token names `noun` itself, bare or as the last
    /// hyphen/underscore segment (`message`, `user-message`, not `messages-list`)
    fn has_class_naming(&self, noun: &str) -> bool {
        self.attr("class")
            .map(|c| {
                c.split_whitespace().any(|cls| {
                    let cls = cls.to_ascii_lowercase();
                    cls == noun
                        || cls
                            .strip_suffix(noun)
                            .is_some_and(|head| head.ends_with(|c: char| c == '-' || c == '_'))
                })
            })
            .unwrap_or(false)
    }

    /// Concatenated text of all descendants, whitespace-normalized per text node
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ")
    }
}

fn collect_text<'a>(node: &'a MarkupNode, out: &mut Vec<&'a str>) {
    match node {
        MarkupNode::Text(t) => {
            let t = t.trim();
            if !t.is_empty() {
                out.push(t);
            }
        }
        MarkupNode::Element { tag, children, .. } => {
            if is_ignored_tag(tag) {
                return;
            }
            for child in children {
                collect_text(child, out);
            }
        }
    }
}

fn is_ignored_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "head" | "template" | "noscript")
}

/// Per-file context for extracted records
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub conversation_id: String,
    pub title: String,
    /// Base timestamp; the n-th record gets `ingested_at + n`
    pub ingested_at: i64,
}

/// Turns a parsed markup tree into records
pub trait StructuredExtractor {
    fn extract(&self, root: &MarkupNode, ctx: &ExtractContext) -> Vec<Record>;
}

/// Sender used for text that precedes any speaker label
pub const EXTRACTED_SENDER: &str = "System/Extracted";

const MARKER_ATTRS: &[&str] = &["data-message-author-role", "data-author"];
const MESSAGE_CLASSES: &[&str] = &["message", "chat-item"];
const ASSISTANT_MARKERS: &[&str] = &["assistant", "gpt", "bot", "model"];
const SPEAKER_LABELS: &[&str] = &[
    "you", "user", "me", "chatgpt", "assistant", "gpt", "ai", "bot", "model",
];
const MAX_LABEL_LEN: usize = 40;

/// Map an author marker to a direction
pub fn direction_for_author(author: &str) -> Direction {
    let lower = author.to_lowercase();
    if ASSISTANT_MARKERS.iter().any(|m| lower.contains(m)) {
        Direction::Received
    } else {
        Direction::Sent
    }
}

/// Default extractor for exported assistant/chat conversations
#[derive(Debug, Default, Clone, Copy)]
pub struct ConversationExtractor;

impl StructuredExtractor for ConversationExtractor {
    fn extract(&self, root: &MarkupNode, ctx: &ExtractContext) -> Vec<Record> {
        let mut messages = Vec::new();
        collect_marked_messages(root, &mut messages);

        let turns: Vec<(String, String)> = if messages.is_empty() {
            speaker_toggle_turns(root)
        } else {
            messages.into_iter().filter_map(marked_turn).collect()
        };

        turns
            .into_iter()
            .enumerate()
            .map(|(i, (sender, content))| {
                let direction = if sender == EXTRACTED_SENDER {
                    Direction::Received
                } else {
                    direction_for_author(&sender)
                };
                Record::new(
                    Record::generate_id(),
                    Source::Markup,
                    &ctx.conversation_id,
                    &ctx.title,
                    ctx.ingested_at + i as i64,
                    sender,
                    direction,
                    content,
                )
            })
            .collect()
    }
}

fn is_message_node(node: &MarkupNode) -> bool {
    MARKER_ATTRS.iter().any(|a| node.attr(a).is_some())
        || MESSAGE_CLASSES.iter().any(|c| node.has_class_naming(c))
}

/// Innermost marked nodes in document order
///
/// A marked node with marked descendants is a container and yields its
/// descendants instead.
fn collect_marked_messages<'a>(node: &'a MarkupNode, out: &mut Vec<&'a MarkupNode>) {
    if let Some(tag) = node.tag() {
        if is_ignored_tag(tag) {
            return;
        }
    }
    let before = out.len();
    for child in node.children() {
        collect_marked_messages(child, out);
    }
    if out.len() == before && is_message_node(node) {
        out.push(node);
    }
}

fn is_author_node(node: &MarkupNode) -> bool {
    matches!(node.tag(), Some("b") | Some("strong")) || node.has_class_containing("author")
}

fn find_author_node(node: &MarkupNode) -> Option<&MarkupNode> {
    for child in node.children() {
        if is_author_node(child) {
            return Some(child);
        }
        if let Some(found) = find_author_node(child) {
            return Some(found);
        }
    }
    None
}

/// Text of `node` with the author node's subtree left out
fn text_without(node: &MarkupNode, skip: &MarkupNode, out: &mut Vec<String>) {
    if std::ptr::eq(node, skip) {
        return;
    }
    match node {
        MarkupNode::Text(t) => {
            let t = t.trim();
            if !t.is_empty() {
                out.push(t.to_string());
            }
        }
        MarkupNode::Element { tag, children, .. } => {
            if is_ignored_tag(tag) {
                return;
            }
            for child in children {
                text_without(child, skip, out);
            }
        }
    }
}

fn marked_turn(node: &MarkupNode) -> Option<(String, String)> {
    let marker = MARKER_ATTRS.iter().find_map(|a| node.attr(a));
    let author_node = find_author_node(node);

    let (sender, content) = match (marker, author_node) {
        (Some(role), _) => {
            let content = node.text_content();
            (role.trim().to_string(), content)
        }
        (None, Some(author)) => {
            let mut parts = Vec::new();
            text_without(node, author, &mut parts);
            let content = if parts.is_empty() {
                node.text_content()
            } else {
                parts.join(" ")
            };
            (author.text_content(), content)
        }
        (None, None) => ("User".to_string(), node.text_content()),
    };

    let content = content.trim().to_string();
    if content.is_empty() {
        return None;
    }
    let sender = if sender.is_empty() {
        "User".to_string()
    } else {
        sender
    };
    Some((sender, content))
}

/// If `text` is a short speaker label, return the speaker name
pub fn speaker_label(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_LABEL_LEN {
        return None;
    }
    let lower = trimmed.to_lowercase();
    let stem = lower.trim_end_matches(':').trim_end();
    let stem = stem.strip_suffix(" said").unwrap_or(stem).trim_end();
    if SPEAKER_LABELS.contains(&stem) {
        let name_len = trimmed
            .char_indices()
            .nth(stem.chars().count())
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        Some(trimmed[..name_len].to_string())
    } else {
        None
    }
}

fn walk_text_nodes<'a>(node: &'a MarkupNode, out: &mut Vec<&'a str>) {
    match node {
        MarkupNode::Text(t) => out.push(t),
        MarkupNode::Element { tag, children, .. } => {
            if is_ignored_tag(tag) {
                return;
            }
            for child in children {
                walk_text_nodes(child, out);
            }
        }
    }
}

fn speaker_toggle_turns(root: &MarkupNode) -> Vec<(String, String)> {
    let mut texts = Vec::new();
    walk_text_nodes(root, &mut texts);

    let mut turns: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, String)> = None;

    for text in texts {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(speaker) = speaker_label(trimmed) {
            if let Some(turn) = current.take() {
                if !turn.1.is_empty() {
                    turns.push(turn);
                }
            }
            current = Some((speaker, String::new()));
            continue;
        }
        let turn = current.get_or_insert_with(|| (EXTRACTED_SENDER.to_string(), String::new()));
        if !turn.1.is_empty() {
            turn.1.push('\n');
        }
        turn.1.push_str(trimmed);
    }
    if let Some(turn) = current {
        if !turn.1.is_empty() {
            turns.push(turn);
        }
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExtractContext {
        ExtractContext {
            conversation_id: "html_1".to_string(),
            title: "chat.html".to_string(),
            ingested_at: 1000,
        }
    }

    #[test]
    fn test_role_markers() {
        let root = MarkupNode::element(
            "body",
            &[],
            vec![
                MarkupNode::element(
                    "div",
                    &[("data-message-author-role", "user")],
                    vec![MarkupNode::text("What is Rust?")],
                ),
                MarkupNode::element(
                    "div",
                    &[("data-message-author-role", "assistant")],
                    vec![MarkupNode::element(
                        "p",
                        &[],
                        vec![MarkupNode::text("A systems language.")],
                    )],
                ),
            ],
        );
        let records = ConversationExtractor.extract(&root, &ctx());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sender, "user");
        assert_eq!(records[0].direction, Direction::Sent);
        assert_eq!(records[1].direction, Direction::Received);
        assert_eq!(records[1].content(), "A systems language.");
        assert_eq!(records[1].timestamp, 1001);
        assert_eq!(records[1].source, Source::Markup);
    }

    #[test]
    fn test_class_markers_with_author_child() {
        let root = MarkupNode::element(
            "body",
            &[],
            vec![MarkupNode::element(
                "div",
                &[("class", "chat message")],
                vec![
                    MarkupNode::element("strong", &[], vec![MarkupNode::text("ChatGPT")]),
                    MarkupNode::element("div", &[], vec![MarkupNode::text("Hello!")]),
                ],
            )],
        );
        let records = ConversationExtractor.extract(&root, &ctx());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sender, "ChatGPT");
        assert_eq!(records[0].content(), "Hello!");
        assert_eq!(records[0].direction, Direction::Received);
    }

    #[test]
    fn test_nested_markers_not_double_counted() {
        let inner = MarkupNode::element("span", &[("class", "message-body")], vec![MarkupNode::text("hi")]);
        let root = MarkupNode::element(
            "div",
            &[],
            vec![MarkupNode::element("div", &[("class", "message")], vec![inner])],
        );
        let records = ConversationExtractor.extract(&root, &ctx());
        assert_eq!(records.len(), 1);
    }

    fn turn(author: &str, text: &str) -> MarkupNode {
        MarkupNode::element(
            "div",
            &[("class", "message")],
            vec![
                MarkupNode::element("b", &[], vec![MarkupNode::text(author)]),
                MarkupNode::text(text),
            ],
        )
    }

    #[test]
    fn test_wrapper_classes_are_not_messages() {
        for wrapper in ["messages-list", "messages", "message-container"] {
            let root = MarkupNode::element(
                "body",
                &[],
                vec![MarkupNode::element(
                    "div",
                    &[("class", wrapper)],
                    vec![
                        turn("You", "first question"),
                        turn("ChatGPT", "first answer"),
                        turn("You", "second question"),
                    ],
                )],
            );
            let records = ConversationExtractor.extract(&root, &ctx());
            assert_eq!(records.len(), 3, "wrapper {}", wrapper);
            assert_eq!(records[1].sender, "ChatGPT");
            assert_eq!(records[1].content(), "first answer");
            assert_eq!(records[2].content(), "second question");
        }
    }

    #[test]
    fn test_marked_container_yields_inner_messages() {
        let root = MarkupNode::element(
            "div",
            &[("class", "chat-item")],
            vec![
                MarkupNode::element(
                    "div",
                    &[("class", "user-message")],
                    vec![MarkupNode::text("ping")],
                ),
                MarkupNode::element(
                    "div",
                    &[("data-author", "bot")],
                    vec![MarkupNode::text("pong")],
                ),
            ],
        );
        let records = ConversationExtractor.extract(&root, &ctx());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content(), "ping");
        assert_eq!(records[1].sender, "bot");
        assert_eq!(records[1].direction, Direction::Received);
    }

    #[test]
    fn test_speaker_toggle_fallback() {
        let root = MarkupNode::element(
            "body",
            &[],
            vec![
                MarkupNode::element("p", &[], vec![MarkupNode::text("Exported on Monday")]),
                MarkupNode::element("h5", &[], vec![MarkupNode::text("You said:")]),
                MarkupNode::element("p", &[], vec![MarkupNode::text("Plan my trip")]),
                MarkupNode::element("p", &[], vec![MarkupNode::text("to Cairo")]),
                MarkupNode::element("h6", &[], vec![MarkupNode::text("ChatGPT said:")]),
                MarkupNode::element("p", &[], vec![MarkupNode::text("Sure.")]),
                MarkupNode::element("script", &[], vec![MarkupNode::text("var x = 1;")]),
            ],
        );
        let records = ConversationExtractor.extract(&root, &ctx());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sender, EXTRACTED_SENDER);
        assert_eq!(records[0].direction, Direction::Received);
        assert_eq!(records[1].sender, "You");
        assert_eq!(records[1].content(), "Plan my trip\nto Cairo");
        assert_eq!(records[1].direction, Direction::Sent);
        assert_eq!(records[2].sender, "ChatGPT");
        assert_eq!(records[2].content(), "Sure.");
        assert_eq!(records[2].direction, Direction::Received);
    }

    #[test]
    fn test_speaker_label() {
        assert_eq!(speaker_label("ChatGPT said:"), Some("ChatGPT".to_string()));
        assert_eq!(speaker_label("  User: "), Some("User".to_string()));
        assert_eq!(speaker_label("You"), Some("You".to_string()));
        assert_eq!(speaker_label("Youth club"), None);
        assert_eq!(speaker_label("a long paragraph that mentions the assistant"), None);
    }

    #[test]
    fn test_empty_tree_yields_nothing() {
        let root = MarkupNode::element("html", &[], vec![]);
        assert!(ConversationExtractor.extract(&root, &ctx()).is_empty());
    }
}
