use serde::Serialize;
use std::collections::HashMap;

/// Index of a node in its owning `Document` arena.
///
/// Parents own children through the arena; a child only stores its parent's
/// index, so the tree has no reference cycles and survives arbitrarily deep
/// hostile markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: HashMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(|s| s.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            NodeKind::Element { .. } => None,
        }
    }
}

/// An owning DOM tree parsed on a best-effort basis from tag soup.
///
/// Structural damage (unclosed tags, stray end tags) is repaired rather than
/// reported as an error: spam HTML is expected to be broken.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    pub root: NodeId,
    pub warnings: Vec<String>,
}

/// Elements that never have children in HTML.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching close tag.
const RAWTEXT_ELEMENTS: &[&str] = &["style", "script", "title", "textarea"];

impl Document {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order traversal of the subtree rooted at `start`, using an
    /// explicit stack so adversarially deep markup cannot blow the call
    /// stack.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            let node = self.node(id);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Ancestor chain of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.node(p).parent;
        }
        out
    }

    /// Parse an HTML string into a tree. Never fails: structural problems
    /// are repaired and recorded as warnings on the document.
    pub fn parse(html: &str) -> Document {
        Parser::new(html).run()
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    doc: Document,
    /// Stack of open elements; the synthetic root is always at the bottom.
    open: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn new(html: &'a str) -> Self {
        let root = Node {
            id: NodeId(0),
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element {
                tag: "#root".to_string(),
                attrs: HashMap::new(),
            },
        };
        Parser {
            input: html.as_bytes(),
            pos: 0,
            doc: Document {
                nodes: vec![root],
                root: NodeId(0),
                warnings: Vec::new(),
            },
            open: vec![NodeId(0)],
        }
    }

    fn run(mut self) -> Document {
        while self.pos < self.input.len() {
            if self.input[self.pos] == b'<' {
                self.consume_markup();
            } else {
                self.consume_text();
            }
        }
        if self.open.len() > 1 {
            self.doc.warnings.push(format!(
                "{} unclosed element(s) at end of input",
                self.open.len() - 1
            ));
        }
        self.doc
    }

    fn current(&self) -> NodeId {
        *self.open.last().expect("root never popped")
    }

    fn consume_text(&mut self) {
        let start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos] != b'<' {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let text = decode_entities(&String::from_utf8_lossy(raw));
        if !text.trim().is_empty() {
            let parent = self.current();
            self.doc.push_node(parent, NodeKind::Text(text));
        }
    }

    fn consume_markup(&mut self) {
        debug_assert_eq!(self.input[self.pos], b'<');
        let rest = &self.input[self.pos..];

        // Comments, doctype and other declarations carry no renderable text.
        if rest.starts_with(b"<!--") {
            self.skip_until(b"-->");
            return;
        }
        if rest.len() > 1 && (rest[1] == b'!' || rest[1] == b'?') {
            self.skip_until(b">");
            return;
        }
        if rest.starts_with(b"</") {
            self.consume_end_tag();
            return;
        }
        // A lone '<' that does not open a tag is treated as text.
        if rest.len() < 2 || !rest[1].is_ascii_alphabetic() {
            let parent = self.current();
            self.doc.push_node(parent, NodeKind::Text("<".to_string()));
            self.pos += 1;
            return;
        }
        self.consume_start_tag();
    }

    fn skip_until(&mut self, needle: &[u8]) {
        let hay = &self.input[self.pos..];
        match find_subslice(hay, needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn consume_start_tag(&mut self) {
        self.pos += 1; // '<'
        let tag = self.read_name();
        let (attrs, self_closing) = self.read_attrs();

        if tag.is_empty() {
            return;
        }

        let parent = self.current();
        let id = self.doc.push_node(
            parent,
            NodeKind::Element {
                tag: tag.clone(),
                attrs,
            },
        );

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return;
        }

        if RAWTEXT_ELEMENTS.contains(&tag.as_str()) {
            self.consume_rawtext(id, &tag);
            return;
        }

        self.open.push(id);
    }

    /// Read raw content (e.g. a stylesheet) up to the matching close tag and
    /// attach it as a single text child.
    fn consume_rawtext(&mut self, id: NodeId, tag: &str) {
        let close = format!("</{tag}");
        let hay = &self.input[self.pos..];
        let lower: Vec<u8> = hay.iter().map(|b| b.to_ascii_lowercase()).collect();
        let end = find_subslice(&lower, close.as_bytes()).unwrap_or(hay.len());
        let raw = String::from_utf8_lossy(&hay[..end]).into_owned();
        if !raw.trim().is_empty() {
            self.doc.push_node(id, NodeKind::Text(raw));
        }
        self.pos += end;
        // Skip past the close tag itself.
        if self.pos < self.input.len() {
            self.skip_until(b">");
        }
    }

    fn consume_end_tag(&mut self) {
        self.pos += 2; // "</"
        let tag = self.read_name();
        // Skip to '>'.
        while self.pos < self.input.len() && self.input[self.pos] != b'>' {
            self.pos += 1;
        }
        if self.pos < self.input.len() {
            self.pos += 1;
        }
        if tag.is_empty() {
            return;
        }
        // Find the matching open element; pop everything above it. A stray
        // end tag with no matching open element is ignored with a warning.
        let found = self
            .open
            .iter()
            .rposition(|&id| self.doc.node(id).tag() == Some(tag.as_str()));
        match found {
            Some(0) | None => {
                self.doc
                    .warnings
                    .push(format!("stray end tag </{tag}> ignored"));
            }
            Some(idx) => {
                if self.open.len() - idx > 1 {
                    self.doc
                        .warnings
                        .push(format!("</{tag}> implicitly closed nested elements"));
                }
                self.open.truncate(idx);
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric()
                || self.input[self.pos] == b'-'
                || self.input[self.pos] == b':')
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).to_lowercase()
    }

    fn read_attrs(&mut self) -> (HashMap<String, String>, bool) {
        let mut attrs = HashMap::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            match self.input[self.pos] {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' => {
                    self_closing = true;
                    self.pos += 1;
                }
                _ => {
                    let name = self.read_attr_name();
                    if name.is_empty() {
                        self.pos += 1;
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.pos < self.input.len() && self.input[self.pos] == b'=' {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_attr_value()
                    } else {
                        String::new()
                    };
                    attrs.entry(name).or_insert(value);
                }
            }
        }
        (attrs, self_closing)
    }

    fn read_attr_name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.input.len() {
            let b = self.input[self.pos];
            if b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/' {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).to_lowercase()
    }

    fn read_attr_value(&mut self) -> String {
        if self.pos >= self.input.len() {
            return String::new();
        }
        let quote = self.input[self.pos];
        if quote == b'"' || quote == b'\'' {
            self.pos += 1;
            let start = self.pos;
            while self.pos < self.input.len() && self.input[self.pos] != quote {
                self.pos += 1;
            }
            let raw = &self.input[start..self.pos];
            if self.pos < self.input.len() {
                self.pos += 1;
            }
            decode_entities(&String::from_utf8_lossy(raw))
        } else {
            let start = self.pos;
            while self.pos < self.input.len() {
                let b = self.input[self.pos];
                if b.is_ascii_whitespace() || b == b'>' {
                    break;
                }
                self.pos += 1;
            }
            decode_entities(&String::from_utf8_lossy(&self.input[start..self.pos]))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}

fn find_subslice(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    hay.windows(needle.len()).position(|w| w == needle)
}

/// Decode the handful of entities that actually show up in email bodies.
/// Unknown entities pass through verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let semi = rest
            .char_indices()
            .take_while(|(i, _)| *i < 12)
            .find(|(_, c)| *c == ';')
            .map(|(i, _)| i);
        match semi {
            Some(j) => {
                let entity = &rest[1..j];
                match entity {
                    "amp" => out.push('&'),
                    "lt" => out.push('<'),
                    "gt" => out.push('>'),
                    "quot" => out.push('"'),
                    "apos" => out.push('\''),
                    "nbsp" => out.push(' '),
                    _ if entity.starts_with('#') => {
                        let code = &entity[1..];
                        let parsed = if let Some(hex) = code.strip_prefix(['x', 'X']) {
                            u32::from_str_radix(hex, 16).ok()
                        } else {
                            code.parse::<u32>().ok()
                        };
                        match parsed.and_then(char::from_u32) {
                            Some(c) => out.push(c),
                            None => out.push_str(&rest[..j + 1]),
                        }
                    }
                    _ => out.push_str(&rest[..j + 1]),
                }
                rest = &rest[j + 1..];
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

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(doc: &Document) -> Vec<String> {
        doc.descendants(doc.root)
            .into_iter()
            .filter_map(|id| doc.node(id).text().map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .collect()
    }

    #[test]
    fn test_parse_simple_tree() {
        let doc = Document::parse("<div><p>hello</p><p>world</p></div>");
        assert_eq!(texts(&doc), vec!["hello", "world"]);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_unclosed_tags_are_repaired() {
        let doc = Document::parse("<div><p>one<p>two");
        assert_eq!(texts(&doc), vec!["one", "two"]);
        assert!(!doc.warnings.is_empty());
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = Document::parse("</span><b>ok</b>");
        assert_eq!(texts(&doc), vec!["ok"]);
        assert!(doc.warnings.iter().any(|w| w.contains("stray end tag")));
    }

    #[test]
    fn test_attributes_parsed() {
        let doc = Document::parse(r#"<p class="big" id=main data-x='1' hidden>t</p>"#);
        let p = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).tag() == Some("p"))
            .unwrap();
        let p = doc.node(p);
        assert_eq!(p.attr("class"), Some("big"));
        assert_eq!(p.attr("id"), Some("main"));
        assert_eq!(p.attr("data-x"), Some("1"));
        assert_eq!(p.attr("hidden"), Some(""));
    }

    #[test]
    fn test_style_content_is_rawtext() {
        let doc = Document::parse("<style>p > a { color: red }</style><p>text</p>");
        let style = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).tag() == Some("style"))
            .unwrap();
        let css = doc.node(doc.node(style).children[0]).text().unwrap();
        assert!(css.contains("p > a"));
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let doc = Document::parse("<!DOCTYPE html><!-- hidden note --><p>v</p>");
        assert_eq!(texts(&doc), vec!["v"]);
    }

    #[test]
    fn test_entities_decoded() {
        let doc = Document::parse("<p>a &amp; b &lt;c&gt; &#65;&#x42;</p>");
        assert_eq!(texts(&doc), vec!["a & b <c> AB"]);
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let mut html = String::new();
        for _ in 0..5000 {
            html.push_str("<div>");
        }
        html.push_str("deep");
        let doc = Document::parse(&html);
        assert_eq!(texts(&doc), vec!["deep"]);
        // Ancestor chain is as deep as the markup.
        let text = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).is_text())
            .unwrap();
        assert!(doc.ancestors(text).len() >= 5000);
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let doc = Document::parse("<p>a<br>b<hr>c</p>");
        assert_eq!(texts(&doc), vec!["a", "b", "c"]);
        assert!(doc.warnings.is_empty());
    }
}
