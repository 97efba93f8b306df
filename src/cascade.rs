//! Cascade Resolver: per-element computed styles from the collected
//! declarations, applying origin/importance/specificity/source-order
//! precedence and CSS inheritance.

use crate::css::collect::{CollectedStyles, Declaration};
use crate::css::color::{parse_color, Rgba};
use crate::css::value::{parse_length_px, parse_opacity};
use crate::dom::{Document, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Other,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Other,
}

/// The resolved style of one element after cascade and inheritance.
///
/// Geometry fields are declared values resolved to pixels where a unit
/// allows it, `None` where nothing was declared or the value needs real
/// layout (`auto`, percentages of an unknown box). Predicates treat `None`
/// as "cannot evaluate", which is a no-match.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
    /// Cumulative opacity: own value multiplied down the ancestor chain.
    pub opacity: f32,
    pub color: Rgba,
    /// Effective background: nearest declared background blended over the
    /// default white page backdrop.
    pub background: Rgba,
    pub font_size: f32,
    /// Line height in pixels, if declared.
    pub line_height: Option<f32>,
    pub text_indent: f32,
    pub position: Position,
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub top: Option<f32>,
    pub bottom: Option<f32>,
    pub margin_left: Option<f32>,
    pub margin_right: Option<f32>,
    pub margin_top: Option<f32>,
    pub margin_bottom: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub overflow: Overflow,
    /// Raw `clip` / `clip-path` value, lowercased.
    pub clip: Option<String>,
    /// Raw `filter` value, lowercased.
    pub filter: Option<String>,
    pub z_index: Option<i32>,
    /// Unsupported properties, stored verbatim.
    pub other: HashMap<String, String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        ComputedStyle {
            display: Display::Other,
            visibility: Visibility::Visible,
            opacity: 1.0,
            color: Rgba::BLACK,
            background: Rgba::WHITE,
            font_size: 16.0,
            line_height: None,
            text_indent: 0.0,
            position: Position::Static,
            left: None,
            right: None,
            top: None,
            bottom: None,
            margin_left: None,
            margin_right: None,
            margin_top: None,
            margin_bottom: None,
            width: None,
            height: None,
            overflow: Overflow::Visible,
            clip: None,
            filter: None,
            z_index: None,
            other: HashMap::new(),
        }
    }
}

impl ComputedStyle {
    /// Start a child style from this one: inheritable properties carry
    /// over, everything else resets to its initial value.
    fn inherit(&self) -> ComputedStyle {
        ComputedStyle {
            color: self.color,
            background: self.background,
            font_size: self.font_size,
            line_height: self.line_height,
            text_indent: self.text_indent,
            visibility: self.visibility,
            opacity: self.opacity,
            ..ComputedStyle::default()
        }
    }
}

/// Computed styles for every node in a document, indexed by `NodeId`.
/// Text nodes carry their parent element's style.
#[derive(Debug)]
pub struct StyleMap {
    styles: Vec<ComputedStyle>,
}

impl StyleMap {
    pub fn get(&self, id: NodeId) -> &ComputedStyle {
        &self.styles[id.0]
    }
}

/// Resolve the cascade for the whole document. Elements are processed in
/// document order so parents are always resolved before their children.
pub fn resolve_styles(doc: &Document, collected: &CollectedStyles) -> StyleMap {
    let mut styles: Vec<ComputedStyle> = vec![ComputedStyle::default(); doc.len()];

    for id in doc.descendants(doc.root) {
        let parent_style = match doc.node(id).parent {
            Some(p) => styles[p.0].clone(),
            None => ComputedStyle::default(),
        };

        if doc.node(id).is_text() {
            styles[id.0] = parent_style;
            continue;
        }

        let mut style = parent_style.inherit();
        let parent_font = parent_style.font_size;
        let parent_opacity = parent_style.opacity;

        if let Some(decls) = collected.bound.get(&id) {
            for (property, value) in winning_declarations(decls) {
                apply_property(&mut style, &property, &value, parent_font, parent_opacity);
            }
        }

        styles[id.0] = style;
    }

    StyleMap { styles }
}

/// Order candidate declarations by cascade priority and keep the winning
/// value per property. Equal priority resolves by later source order, the
/// CSS-standard tie-break; inline `!important` sorts above everything.
fn winning_declarations(decls: &[Declaration]) -> Vec<(String, String)> {
    let mut sorted: Vec<&Declaration> = decls.iter().collect();
    sorted.sort_by_key(|d| (d.origin, d.important, d.specificity, d.order));

    let mut winner: HashMap<&str, &Declaration> = HashMap::new();
    let mut order_seen: Vec<&str> = Vec::new();
    for d in sorted {
        if !winner.contains_key(d.property.as_str()) {
            order_seen.push(d.property.as_str());
        }
        winner.insert(d.property.as_str(), d);
    }

    // font-size must apply before other length properties so em values
    // resolve against the element's own size.
    order_seen.sort_by_key(|p| if *p == "font-size" { 0 } else { 1 });
    order_seen
        .into_iter()
        .map(|p| {
            let d = winner[p];
            (d.property.clone(), d.value.clone())
        })
        .collect()
}

fn apply_property(
    style: &mut ComputedStyle,
    property: &str,
    value: &str,
    parent_font: f32,
    parent_opacity: f32,
) {
    let v = value.trim();
    let lower = v.to_lowercase();
    match property {
        "display" => {
            style.display = if lower == "none" {
                Display::None
            } else {
                Display::Other
            };
        }
        "visibility" => {
            style.visibility = match lower.as_str() {
                "hidden" => Visibility::Hidden,
                "collapse" => Visibility::Collapse,
                _ => Visibility::Visible,
            };
        }
        "opacity" => {
            if let Some(own) = parse_opacity(v) {
                style.opacity = parent_opacity * own;
            }
        }
        "color" => {
            if let Some(c) = parse_color(v) {
                style.color = c;
            }
        }
        "background-color" | "background" | "bgcolor" => {
            if let Some(c) = first_color_token(v) {
                // Blend a translucent background over what is already
                // behind it so contrast checks see the displayed color.
                style.background = if c.is_opaque() {
                    c
                } else {
                    c.over(style.background)
                };
            }
        }
        "font-size" => {
            if let Some(px) = parse_length_px(v, parent_font) {
                if px >= 0.0 {
                    style.font_size = px;
                }
            }
        }
        "line-height" => {
            if lower == "normal" {
                style.line_height = None;
            } else if let Ok(n) = lower.parse::<f32>() {
                style.line_height = Some(n * style.font_size);
            } else if let Some(px) = parse_length_px(v, style.font_size) {
                style.line_height = Some(px);
            }
        }
        "text-indent" => {
            if let Some(px) = length_no_percent(v, style.font_size) {
                style.text_indent = px;
            }
        }
        "position" => {
            style.position = match lower.as_str() {
                "relative" => Position::Relative,
                "absolute" => Position::Absolute,
                "fixed" => Position::Fixed,
                _ => Position::Static,
            };
        }
        "left" => style.left = length_no_percent(v, style.font_size),
        "right" => style.right = length_no_percent(v, style.font_size),
        "top" => style.top = length_no_percent(v, style.font_size),
        "bottom" => style.bottom = length_no_percent(v, style.font_size),
        "margin-left" => style.margin_left = length_no_percent(v, style.font_size),
        "margin-right" => style.margin_right = length_no_percent(v, style.font_size),
        "margin-top" => style.margin_top = length_no_percent(v, style.font_size),
        "margin-bottom" => style.margin_bottom = length_no_percent(v, style.font_size),
        "margin" => apply_margin_shorthand(style, v),
        "width" => style.width = length_no_percent(v, style.font_size),
        "height" => style.height = length_no_percent(v, style.font_size),
        "overflow" | "overflow-x" | "overflow-y" => {
            style.overflow = match lower.as_str() {
                "hidden" => Overflow::Hidden,
                "clip" => Overflow::Clip,
                "visible" => Overflow::Visible,
                _ => Overflow::Other,
            };
        }
        "clip" | "clip-path" => style.clip = Some(lower),
        "filter" => style.filter = Some(lower),
        "z-index" => {
            if let Ok(z) = lower.parse::<i32>() {
                style.z_index = Some(z);
            }
        }
        _ => {
            style.other.insert(property.to_string(), v.to_string());
        }
    }
}

/// Resolve a length to pixels, refusing percentages (their base would need
/// real layout).
fn length_no_percent(value: &str, font_size: f32) -> Option<f32> {
    if value.trim_end().ends_with('%') {
        return None;
    }
    parse_length_px(value, font_size)
}

/// `margin: a [b [c [d]]]` in CSS order top/right/bottom/left.
fn apply_margin_shorthand(style: &mut ComputedStyle, value: &str) {
    let parts: Vec<Option<f32>> = value
        .split_ascii_whitespace()
        .map(|p| length_no_percent(p, style.font_size))
        .collect();
    let (t, r, b, l) = match parts.len() {
        1 => (parts[0], parts[0], parts[0], parts[0]),
        2 => (parts[0], parts[1], parts[0], parts[1]),
        3 => (parts[0], parts[1], parts[2], parts[1]),
        4 => (parts[0], parts[1], parts[2], parts[3]),
        _ => return,
    };
    style.margin_top = t;
    style.margin_right = r;
    style.margin_bottom = b;
    style.margin_left = l;
}

/// Find the first parseable color token in a value (handles `background`
/// shorthands like `#fff url(x) no-repeat`).
fn first_color_token(value: &str) -> Option<Rgba> {
    if let Some(c) = parse_color(value) {
        return Some(c);
    }
    value.split_ascii_whitespace().find_map(parse_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::collect::collect_styles;

    fn styled(html: &str) -> (Document, StyleMap) {
        let doc = Document::parse(html);
        let collected = collect_styles(&doc);
        let styles = resolve_styles(&doc, &collected);
        (doc, styles)
    }

    fn element(doc: &Document, tag: &str) -> NodeId {
        doc.descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).tag() == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_inline_beats_author_regardless_of_specificity() {
        let (doc, styles) = styled(
            r#"<style>#exact p { color: red }</style><div id="exact"><p style="color: blue">t</p></div>"#,
        );
        let p = element(&doc, "p");
        assert_eq!(styles.get(p).color, parse_color("blue").unwrap());
    }

    #[test]
    fn test_later_source_order_wins_on_tie() {
        let (doc, styles) = styled("<style>p { color: red } p { color: green }</style><p>t</p>");
        let p = element(&doc, "p");
        assert_eq!(styles.get(p).color, parse_color("green").unwrap());
    }

    #[test]
    fn test_specificity_beats_source_order() {
        let (doc, styles) =
            styled(r#"<style>.x { color: red } p { color: green }</style><p class="x">t</p>"#);
        let p = element(&doc, "p");
        assert_eq!(styles.get(p).color, parse_color("red").unwrap());
    }

    #[test]
    fn test_important_beats_normal_within_origin() {
        let (doc, styles) =
            styled("<style>p { color: red !important } p { color: green }</style><p>t</p>");
        let p = element(&doc, "p");
        assert_eq!(styles.get(p).color, parse_color("red").unwrap());
    }

    #[test]
    fn test_color_inherits_into_unset_descendants() {
        let (doc, styles) =
            styled(r#"<div style="color: rgb(1, 2, 3)"><p><span>t</span></p></div>"#);
        let span = element(&doc, "span");
        assert_eq!(styles.get(span).color, Rgba::new(1, 2, 3, 1.0));
    }

    #[test]
    fn test_display_does_not_inherit() {
        let (doc, styles) = styled(r#"<div style="display: none"><p>t</p></div>"#);
        assert_eq!(styles.get(element(&doc, "div")).display, Display::None);
        assert_eq!(styles.get(element(&doc, "p")).display, Display::Other);
    }

    #[test]
    fn test_cumulative_opacity() {
        let (doc, styles) =
            styled(r#"<div style="opacity: 0.5"><p style="opacity: 0.5">t</p></div>"#);
        let p = element(&doc, "p");
        assert!((styles.get(p).opacity - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_relative_font_size_resolution() {
        let (doc, styles) =
            styled(r#"<div style="font-size: 20px"><p style="font-size: 50%"><span style="font-size: 2em">t</span></p></div>"#);
        assert_eq!(styles.get(element(&doc, "p")).font_size, 10.0);
        assert_eq!(styles.get(element(&doc, "span")).font_size, 20.0);
    }

    #[test]
    fn test_presentational_attr_loses_to_real_css() {
        let (doc, styles) = styled(
            r##"<style>td { background-color: #000000 }</style><table><tr><td bgcolor="#ffffff">t</td></tr></table>"##,
        );
        let td = element(&doc, "td");
        assert!(styles.get(td).background.same_rgb(&Rgba::BLACK));
    }

    #[test]
    fn test_translucent_background_blends_over_backdrop() {
        let (doc, styles) = styled(r#"<div style="background-color: rgba(0, 0, 0, 0.5)">t</div>"#);
        let div = element(&doc, "div");
        let bg = styles.get(div).background;
        // Half black over white is mid gray.
        assert_eq!((bg.r, bg.g, bg.b), (128, 128, 128));
    }

    #[test]
    fn test_text_node_carries_parent_style() {
        let (doc, styles) = styled(r#"<p style="font-size: 0">t</p>"#);
        let text = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).is_text())
            .unwrap();
        assert_eq!(styles.get(text).font_size, 0.0);
    }

    #[test]
    fn test_unknown_property_stored_verbatim() {
        let (doc, styles) = styled(r#"<p style="mix-blend-mode: multiply">t</p>"#);
        let p = element(&doc, "p");
        assert_eq!(
            styles.get(p).other.get("mix-blend-mode").map(|s| s.as_str()),
            Some("multiply")
        );
    }

    #[test]
    fn test_margin_shorthand() {
        let (doc, styles) = styled(r#"<p style="margin: 1px -2000px">t</p>"#);
        let s = styles.get(element(&doc, "p"));
        assert_eq!(s.margin_top, Some(1.0));
        assert_eq!(s.margin_left, Some(-2000.0));
        assert_eq!(s.margin_right, Some(-2000.0));
    }

    #[test]
    fn test_visibility_inherits_and_can_be_overridden() {
        let (doc, styles) = styled(
            r#"<div style="visibility: hidden"><p>a</p><p id="v" style="visibility: visible">b</p></div>"#,
        );
        let hidden_p = element(&doc, "p");
        assert_eq!(styles.get(hidden_p).visibility, Visibility::Hidden);
        let visible_p = doc
            .descendants(doc.root)
            .into_iter()
            .find(|&id| doc.node(id).attr("id") == Some("v"))
            .unwrap();
        assert_eq!(styles.get(visible_p).visibility, Visibility::Visible);
    }
}
