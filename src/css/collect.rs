//! Style Collector: turns `<style>` blocks, inline `style` attributes and
//! legacy presentational attributes into a uniform set of declarations bound
//! to the elements they match, ready for the cascade.

use crate::css::selector::{parse_selector_list, Specificity};
use crate::css::value::legacy_font_size_px;
use crate::dom::{Document, NodeId, NodeKind};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref STYLE_PROP_RE: Regex =
        Regex::new(r"(?i)([a-zA-Z-]+)\s*:\s*([^;]+)").unwrap();
    static ref CSS_COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
}

/// Where a declaration came from; rank order is the first cascade key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    /// User-agent defaults, including lowered presentational attributes.
    UserAgent,
    /// `<style>` block rules.
    Author,
    /// Inline `style` attributes.
    Inline,
}

/// One parsed declaration. Immutable once built.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub origin: Origin,
    pub specificity: Specificity,
    pub important: bool,
    /// Global source order index; the final cascade tie-break.
    pub order: u32,
}

/// A non-fatal problem found while collecting styles.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    pub detail: String,
}

/// All declarations in the document, bound to the elements they apply to.
#[derive(Debug, Default)]
pub struct CollectedStyles {
    pub bound: HashMap<NodeId, Vec<Declaration>>,
    pub warnings: Vec<ParseWarning>,
}

impl CollectedStyles {
    fn warn(&mut self, detail: String) {
        log::debug!("style parse warning: {detail}");
        self.warnings.push(ParseWarning { detail });
    }

    fn bind(&mut self, node: NodeId, decl: Declaration) {
        self.bound.entry(node).or_default().push(decl);
    }
}

/// Collect every declaration in the document. Malformed CSS is skipped with
/// a recorded warning; collection itself never fails.
pub fn collect_styles(doc: &Document) -> CollectedStyles {
    let mut out = CollectedStyles::default();
    let mut order = 0u32;

    let all = doc.descendants(doc.root);

    // Presentational attributes first: lowest origin, lowest specificity.
    for &id in &all {
        lower_presentational_attrs(doc, id, &mut order, &mut out);
    }

    // Author rules from <style> blocks, in document order.
    for &id in &all {
        if doc.node(id).tag() == Some("style") {
            for &child in &doc.node(id).children {
                if let NodeKind::Text(css) = &doc.node(child).kind {
                    collect_style_block(doc, css, &all, &mut order, &mut out);
                }
            }
        }
    }

    // Inline style attributes last: highest origin, synthetic max specificity.
    for &id in &all {
        if let Some(style) = doc.node(id).attr("style") {
            for (property, value, important) in parse_declaration_list(style) {
                out.bind(
                    id,
                    Declaration {
                        property,
                        value,
                        origin: Origin::Inline,
                        specificity: Specificity::INLINE,
                        important,
                        order: next(&mut order),
                    },
                );
            }
        }
    }

    out
}

fn next(order: &mut u32) -> u32 {
    let v = *order;
    *order += 1;
    v
}

/// Parse one `<style>` block and bind its declarations to every matching
/// element.
fn collect_style_block(
    doc: &Document,
    css: &str,
    all: &[NodeId],
    order: &mut u32,
    out: &mut CollectedStyles,
) {
    let css = CSS_COMMENT_RE.replace_all(css, "");
    let mut rest = css.as_ref();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let body_start = open + 1;
        let close = match find_block_end(&rest[body_start..]) {
            Some(i) => body_start + i,
            None => {
                out.warn(format!("unterminated rule block after {prelude:?}"));
                return;
            }
        };
        let body = &rest[body_start..close];
        rest = &rest[close + 1..];

        if prelude.starts_with('@') {
            // At-rules (media, font-face, ...) are outside our selector
            // model; skip the whole block.
            out.warn(format!("skipped at-rule {prelude:?}"));
            continue;
        }

        let selectors = match parse_selector_list(prelude) {
            Ok(s) => s,
            Err(e) => {
                out.warn(e);
                continue;
            }
        };

        let declarations = parse_declaration_list(body);
        if declarations.is_empty() {
            continue;
        }

        for selector in &selectors {
            let specificity = selector.specificity();
            for &id in all {
                if doc.node(id).tag().is_some() && selector.matches(doc, id) {
                    for (property, value, important) in &declarations {
                        out.bind(
                            id,
                            Declaration {
                                property: property.clone(),
                                value: value.clone(),
                                origin: Origin::Author,
                                specificity,
                                important: *important,
                                order: next(order),
                            },
                        );
                    }
                }
            }
        }
    }

    if !rest.trim().is_empty() && rest.contains(':') {
        out.warn(format!(
            "trailing unparsed stylesheet content ({} bytes)",
            rest.trim().len()
        ));
    }
}

/// Find the index of the `}` closing the block that starts right after an
/// already-consumed `{`, tolerating nested braces inside at-rule bodies.
fn find_block_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Parse a `prop: value; prop: value !important` list.
fn parse_declaration_list(body: &str) -> Vec<(String, String, bool)> {
    let mut out = Vec::new();
    for caps in STYLE_PROP_RE.captures_iter(body) {
        let property = caps[1].trim().to_lowercase();
        let mut value = caps[2].trim().to_string();
        let important = value.to_lowercase().ends_with("!important");
        if important {
            value.truncate(value.len() - "!important".len());
            value = value.trim_end().trim_end_matches('!').trim_end().to_string();
        }
        if property.is_empty() || value.is_empty() {
            continue;
        }
        out.push((property, value, important));
    }
    out
}

/// Map legacy presentational attributes to declarations at user-agent
/// origin so the cascade handles them uniformly (any real CSS wins).
fn lower_presentational_attrs(
    doc: &Document,
    id: NodeId,
    order: &mut u32,
    out: &mut CollectedStyles,
) {
    let node = doc.node(id);
    let tag = match node.tag() {
        Some(t) => t.to_string(),
        None => return,
    };

    let mut push = |out: &mut CollectedStyles, property: &str, value: String| {
        out.bind(
            id,
            Declaration {
                property: property.to_string(),
                value,
                origin: Origin::UserAgent,
                specificity: Specificity::default(),
                important: false,
                order: next(order),
            },
        );
    };

    if node.attr("hidden").is_some() {
        push(out, "display", "none".to_string());
    }
    if let Some(bgcolor) = node.attr("bgcolor") {
        push(out, "background-color", bgcolor.to_string());
    }
    if matches!(tag.as_str(), "body") {
        if let Some(text) = node.attr("text") {
            push(out, "color", text.to_string());
        }
    }
    if tag == "font" {
        if let Some(color) = node.attr("color") {
            push(out, "color", color.to_string());
        }
        if let Some(size) = node.attr("size") {
            if let Some(px) = legacy_font_size_px(size) {
                push(out, "font-size", format!("{px}px"));
            }
        }
    }
    for dim in ["width", "height"] {
        if let Some(v) = node.attr(dim) {
            let v = v.trim();
            if v.chars().all(|c| c.is_ascii_digit()) && !v.is_empty() {
                push(out, dim, format!("{v}px"));
            } else {
                push(out, dim, v.to_string());
            }
        }
    }
    if let Some(align) = node.attr("align") {
        let mapped = match align.to_lowercase().as_str() {
            "middle" | "center" => "center",
            "right" => "right",
            "justify" => "justify",
            _ => "left",
        };
        push(out, "text-align", mapped.to_string());
    }
}
