//! Visibility Classifier: walks the document and decides, per text node,
//! whether a compliant rendering would show that text.

use crate::cascade::StyleMap;
use crate::catalogue::{Catalogue, PredicateContext};
use crate::dom::{Document, NodeId, NodeKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// The verdict for one text node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeVerdict {
    pub node: NodeId,
    pub visibility: Visibility,
    /// Every configuration the node's own styleable ancestor matched, in
    /// catalogue order. Empty for visible nodes.
    pub matched: Vec<&'static str>,
    /// Set when the node is hidden because a suppressed ancestor hides the
    /// whole subtree, not because of its own styles.
    pub inherited_from: Option<NodeId>,
}

pub struct Classifier<'a> {
    catalogue: &'a Catalogue,
}

impl<'a> Classifier<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Classifier { catalogue }
    }

    /// Classify every text node, in document order.
    ///
    /// A subtree-suppressing match short-circuits: descendants are marked
    /// hidden without evaluating their own styles, matching real rendering
    /// where a removed container removes everything inside it.
    pub fn classify(&self, doc: &Document, styles: &StyleMap) -> Vec<NodeVerdict> {
        let mut verdicts = Vec::new();
        // Per-element match results, computed on the way down.
        let mut element_matches: HashMap<NodeId, Vec<&'static str>> = HashMap::new();
        // (node, suppression state inherited from the nearest suppressed
        // ancestor, if any)
        let mut stack: Vec<(NodeId, Option<NodeId>)> = vec![(doc.root, None)];

        while let Some((id, suppressed_by)) = stack.pop() {
            let node = doc.node(id);
            match &node.kind {
                NodeKind::Text(_) => {
                    let parent = node.parent;
                    let verdict = if let Some(origin) = suppressed_by {
                        NodeVerdict {
                            node: id,
                            visibility: Visibility::Hidden,
                            matched: element_matches.get(&origin).cloned().unwrap_or_default(),
                            inherited_from: Some(origin),
                        }
                    } else {
                        let matched = parent
                            .and_then(|p| element_matches.get(&p))
                            .cloned()
                            .unwrap_or_default();
                        if matched.is_empty() {
                            NodeVerdict {
                                node: id,
                                visibility: Visibility::Visible,
                                matched,
                                inherited_from: None,
                            }
                        } else {
                            NodeVerdict {
                                node: id,
                                visibility: Visibility::Hidden,
                                matched,
                                inherited_from: None,
                            }
                        }
                    };
                    verdicts.push(verdict);
                }
                NodeKind::Element { tag, .. } => {
                    let mut child_suppression = suppressed_by;
                    if suppressed_by.is_none() {
                        let cx = PredicateContext {
                            style: styles.get(id),
                            tag,
                        };
                        let matches = self.catalogue.evaluate(&cx);
                        if !matches.is_empty() {
                            log::debug!(
                                "node {:?} <{}> matched {:?}",
                                id,
                                tag,
                                matches.iter().map(|c| c.id).collect::<Vec<_>>()
                            );
                        }
                        if matches.iter().any(|c| c.suppresses_subtree) {
                            child_suppression = Some(id);
                        }
                        element_matches
                            .insert(id, matches.iter().map(|c| c.id).collect());
                    }
                    for &child in node.children.iter().rev() {
                        stack.push((child, child_suppression));
                    }
                }
            }
        }
        verdicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::resolve_styles;
    use crate::css::collect::collect_styles;

    fn classify(html: &str) -> (Document, Vec<NodeVerdict>) {
        let doc = Document::parse(html);
        let collected = collect_styles(&doc);
        let styles = resolve_styles(&doc, &collected);
        let catalogue = Catalogue::standard();
        let verdicts = Classifier::new(&catalogue).classify(&doc, &styles);
        (doc, verdicts)
    }

    fn verdict_for<'a>(
        doc: &Document,
        verdicts: &'a [NodeVerdict],
        text: &str,
    ) -> &'a NodeVerdict {
        verdicts
            .iter()
            .find(|v| {
                doc.node(v.node)
                    .text()
                    .map(|t| t.contains(text))
                    .unwrap_or(false)
            })
            .unwrap_or_else(|| panic!("no verdict for text {text:?}"))
    }

    #[test]
    fn test_plain_text_is_visible() {
        let (doc, verdicts) = classify("<p>hello</p>");
        let v = verdict_for(&doc, &verdicts, "hello");
        assert_eq!(v.visibility, Visibility::Visible);
        assert!(v.matched.is_empty());
    }

    #[test]
    fn test_display_none_suppresses_subtree() {
        let (doc, verdicts) = classify(
            r#"<div style="display: none"><p style="color: black; font-size: 40px">big and bold</p></div>"#,
        );
        let v = verdict_for(&doc, &verdicts, "big and bold");
        assert_eq!(v.visibility, Visibility::Hidden);
        assert_eq!(v.matched, vec!["display-none"]);
        // Hidden because of the ancestor, not the paragraph's own styles.
        let div = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).tag() == Some("div"))
            .unwrap();
        assert_eq!(v.inherited_from, Some(div));
    }

    #[test]
    fn test_own_match_not_marked_inherited() {
        let (doc, verdicts) = classify(r#"<p style="font-size: 0">tiny</p>"#);
        let v = verdict_for(&doc, &verdicts, "tiny");
        assert_eq!(v.visibility, Visibility::Hidden);
        assert_eq!(v.matched, vec!["zero-font-size"]);
        assert_eq!(v.inherited_from, None);
    }

    #[test]
    fn test_multiple_matches_all_recorded() {
        let (doc, verdicts) =
            classify(r#"<p style="font-size: 0; visibility: hidden">both</p>"#);
        let v = verdict_for(&doc, &verdicts, "both");
        assert_eq!(v.matched, vec!["visibility-hidden", "zero-font-size"]);
    }

    #[test]
    fn test_visibility_hidden_overridable_by_descendant() {
        let (doc, verdicts) = classify(
            r#"<div style="visibility: hidden"><span style="visibility: visible">shown</span><span>gone</span></div>"#,
        );
        assert_eq!(
            verdict_for(&doc, &verdicts, "shown").visibility,
            Visibility::Visible
        );
        assert_eq!(
            verdict_for(&doc, &verdicts, "gone").visibility,
            Visibility::Hidden
        );
    }

    #[test]
    fn test_display_none_not_overridable_by_descendant() {
        let (doc, verdicts) = classify(
            r#"<div style="display: none"><span style="display: block; visibility: visible">still gone</span></div>"#,
        );
        assert_eq!(
            verdict_for(&doc, &verdicts, "still gone").visibility,
            Visibility::Hidden
        );
    }

    #[test]
    fn test_document_order_preserved() {
        let (doc, verdicts) = classify("<p>one</p><p>two</p><p>three</p>");
        let texts: Vec<&str> = verdicts
            .iter()
            .map(|v| doc.node(v.node).text().unwrap().trim())
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_inherited_color_hides_nested_text() {
        let (doc, verdicts) = classify(
            r#"<div style="color: #ffffff; background-color: #ffffff"><p><b>nested</b></p></div>"#,
        );
        let v = verdict_for(&doc, &verdicts, "nested");
        assert_eq!(v.visibility, Visibility::Hidden);
        assert!(v.matched.contains(&"color-on-color"));
    }
}
