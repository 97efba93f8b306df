//! Text Partitioner: splits document text into the sequence a reader would
//! see and the sequence only a machine would see, preserving document order
//! within each.

use crate::classifier::{NodeVerdict, Visibility};
use crate::dom::{Document, NodeId};
use serde::Serialize;

/// Tags whose text content is not email body text (stylesheets, scripts,
/// metadata). Text under these enters neither partition.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "title", "meta", "link", "head",
];

/// One run of text attributed to its source node, with the evidence that
/// classified it.
#[derive(Debug, Clone, Serialize)]
pub struct TextSegment {
    pub node: NodeId,
    pub text: String,
    pub configs: Vec<&'static str>,
    pub inherited_from: Option<NodeId>,
}

#[derive(Debug, Default, Serialize)]
pub struct Partition {
    pub visible: Vec<TextSegment>,
    pub hidden: Vec<TextSegment>,
}

impl Partition {
    pub fn visible_text(&self) -> String {
        join_segments(&self.visible)
    }

    pub fn hidden_text(&self) -> String {
        join_segments(&self.hidden)
    }
}

fn join_segments(segments: &[TextSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace runs and trim, so formatting differences alone never
/// make the two partitions diverge.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Partition the classified text nodes. Every verdict for a non-excluded,
/// non-empty text node lands in exactly one partition.
pub fn partition_text(doc: &Document, verdicts: &[NodeVerdict]) -> Partition {
    let mut out = Partition::default();
    for v in verdicts {
        let node = doc.node(v.node);
        let text = match node.text() {
            Some(t) => t,
            None => continue,
        };
        if under_excluded_tag(doc, v.node) {
            continue;
        }
        let text = normalize_whitespace(text);
        if text.is_empty() {
            continue;
        }
        let segment = TextSegment {
            node: v.node,
            text,
            configs: v.matched.clone(),
            inherited_from: v.inherited_from,
        };
        match v.visibility {
            Visibility::Visible => out.visible.push(segment),
            Visibility::Hidden => out.hidden.push(segment),
        }
    }
    out
}

fn under_excluded_tag(doc: &Document, id: NodeId) -> bool {
    doc.ancestors(id).into_iter().any(|anc| {
        doc.node(anc)
            .tag()
            .map(|t| EXCLUDED_TAGS.contains(&t))
            .unwrap_or(false)
    })
}
