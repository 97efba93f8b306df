//! The Invisible Configuration Catalogue: the known CSS configurations that
//! render text unreadable while keeping it in the document's text content.
//!
//! Each entry is an independent, side-effect-free predicate over a node's
//! computed style. The catalogue is an explicit constructed value handed to
//! the classifier; extending it means adding an entry here and nowhere else.

use crate::cascade::{ComputedStyle, Display, Overflow, Position, Visibility};

/// Context a predicate sees: the node's computed style plus its tag name.
/// Ancestor-derived data (cumulative opacity, inherited color, effective
/// background) is already folded into the computed style by the cascade.
pub struct PredicateContext<'a> {
    pub style: &'a ComputedStyle,
    pub tag: &'a str,
}

/// One catalogued invisible-rendering configuration.
pub struct InvisibleConfig {
    pub id: &'static str,
    pub description: &'static str,
    /// Whether a match suppresses the whole subtree the way real rendering
    /// does (a `display:none` container hides every descendant no matter
    /// what the descendants declare).
    pub suppresses_subtree: bool,
    predicate: fn(&PredicateContext) -> bool,
}

impl InvisibleConfig {
    /// Evaluate this configuration. Missing computed data always evaluates
    /// to no-match; a predicate can never fail.
    pub fn matches(&self, cx: &PredicateContext) -> bool {
        (self.predicate)(cx)
    }
}

/// Offsets beyond this many pixels put a box outside any plausible
/// email-client viewport.
const OFFSCREEN_PX: f32 = 1000.0;
/// Computed font sizes below this are unreadable.
const TINY_FONT_PX: f32 = 3.0;
/// Cumulative opacity at or below this is invisible.
const MIN_OPACITY: f32 = 0.01;
/// WCAG contrast ratios below this are perceptually indistinguishable.
const MIN_CONTRAST: f32 = 1.05;

pub struct Catalogue {
    configs: Vec<InvisibleConfig>,
}

impl Catalogue {
    /// The versioned standard catalogue of 16 configurations.
    pub fn standard() -> Catalogue {
        Catalogue {
            configs: vec![
                InvisibleConfig {
                    id: "display-none",
                    description: "display: none removes the box entirely",
                    suppresses_subtree: true,
                    predicate: |cx| cx.style.display == Display::None,
                },
                InvisibleConfig {
                    id: "visibility-hidden",
                    description: "visibility: hidden or collapse",
                    suppresses_subtree: false,
                    predicate: |cx| {
                        matches!(
                            cx.style.visibility,
                            Visibility::Hidden | Visibility::Collapse
                        )
                    },
                },
                InvisibleConfig {
                    id: "zero-opacity",
                    description: "cumulative opacity at or below 0.01",
                    suppresses_subtree: false,
                    predicate: |cx| cx.style.opacity <= MIN_OPACITY,
                },
                InvisibleConfig {
                    id: "transparent-color",
                    description: "fully transparent text color",
                    suppresses_subtree: false,
                    predicate: |cx| cx.style.color.is_transparent(),
                },
                InvisibleConfig {
                    id: "color-on-color",
                    description: "text color identical to the effective background",
                    suppresses_subtree: false,
                    predicate: |cx| {
                        let fg = cx.style.color;
                        if fg.is_transparent() {
                            // transparent-color owns that case
                            return false;
                        }
                        let shown = fg.over(cx.style.background);
                        shown.same_rgb(&cx.style.background)
                    },
                },
                InvisibleConfig {
                    id: "low-contrast",
                    description: "contrast ratio against the background below 1.05",
                    suppresses_subtree: false,
                    predicate: |cx| {
                        let fg = cx.style.color;
                        if fg.is_transparent() {
                            return false;
                        }
                        let shown = fg.over(cx.style.background);
                        if shown.same_rgb(&cx.style.background) {
                            // exact match is color-on-color
                            return false;
                        }
                        shown.contrast_ratio(&cx.style.background) < MIN_CONTRAST
                    },
                },
                InvisibleConfig {
                    id: "zero-font-size",
                    description: "computed font size below 3px",
                    suppresses_subtree: false,
                    predicate: |cx| cx.style.font_size < TINY_FONT_PX,
                },
                InvisibleConfig {
                    id: "zero-line-height",
                    description: "line height collapsed to zero",
                    suppresses_subtree: false,
                    predicate: |cx| matches!(cx.style.line_height, Some(lh) if lh <= 0.01),
                },
                InvisibleConfig {
                    id: "negative-text-indent",
                    description: "text indented far outside the viewport",
                    suppresses_subtree: false,
                    predicate: |cx| cx.style.text_indent <= -OFFSCREEN_PX,
                },
                InvisibleConfig {
                    id: "offscreen-position",
                    description: "absolutely positioned outside any viewport",
                    suppresses_subtree: true,
                    predicate: |cx| {
                        matches!(cx.style.position, Position::Absolute | Position::Fixed)
                            && [
                                cx.style.left,
                                cx.style.right,
                                cx.style.top,
                                cx.style.bottom,
                            ]
                            .iter()
                            .any(|o| matches!(o, Some(px) if px.abs() > OFFSCREEN_PX))
                    },
                },
                InvisibleConfig {
                    id: "large-margin-offset",
                    description: "margins pushing the box outside the viewport",
                    suppresses_subtree: true,
                    predicate: |cx| {
                        [
                            cx.style.margin_left,
                            cx.style.margin_right,
                            cx.style.margin_top,
                            cx.style.margin_bottom,
                        ]
                        .iter()
                        .any(|m| matches!(m, Some(px) if px.abs() > OFFSCREEN_PX))
                    },
                },
                InvisibleConfig {
                    id: "clip-to-zero",
                    description: "clip or clip-path leaving a zero-area region",
                    suppresses_subtree: true,
                    predicate: |cx| match &cx.style.clip {
                        Some(clip) => ["rect(0", "inset(100%", "circle(0", "polygon(0 0"]
                            .iter()
                            .any(|p| clip.contains(p)),
                        None => false,
                    },
                },
                InvisibleConfig {
                    id: "collapsed-box",
                    description: "zero-size box with overflow hidden",
                    suppresses_subtree: true,
                    predicate: |cx| {
                        matches!(cx.style.overflow, Overflow::Hidden | Overflow::Clip)
                            && (matches!(cx.style.width, Some(w) if w <= 1.0)
                                || matches!(cx.style.height, Some(h) if h <= 1.0))
                    },
                },
                InvisibleConfig {
                    id: "filter-opacity",
                    description: "filter: opacity() at or below 5%",
                    // filters composite the whole subtree as one image
                    suppresses_subtree: true,
                    predicate: |cx| match &cx.style.filter {
                        Some(filter) => filter_opacity_fraction(filter)
                            .map(|f| f <= 0.05)
                            .unwrap_or(false),
                        None => false,
                    },
                },
                InvisibleConfig {
                    id: "filter-blur",
                    description: "filter: blur() beyond 10px",
                    suppresses_subtree: true,
                    predicate: |cx| match &cx.style.filter {
                        Some(filter) => filter_blur_px(filter).map(|b| b > 10.0).unwrap_or(false),
                        None => false,
                    },
                },
                InvisibleConfig {
                    id: "occluded-by-stacking",
                    description: "negative z-index beneath an opaque background",
                    suppresses_subtree: true,
                    predicate: |cx| {
                        matches!(
                            cx.style.position,
                            Position::Relative | Position::Absolute | Position::Fixed
                        ) && matches!(cx.style.z_index, Some(z) if z < 0)
                            && cx.style.background.is_opaque()
                    },
                },
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvisibleConfig> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// All matches for a node, in catalogue order.
    pub fn evaluate(&self, cx: &PredicateContext) -> Vec<&InvisibleConfig> {
        self.configs.iter().filter(|c| c.matches(cx)).collect()
    }
}

/// Extract the fraction from an `opacity(...)` filter function, handling
/// both `opacity(0.04)` and `opacity(4%)`.
fn filter_opacity_fraction(filter: &str) -> Option<f32> {
    let start = filter.find("opacity(")?;
    let rest = &filter[start + "opacity(".len()..];
    let end = rest.find(')')?;
    let arg = rest[..end].trim();
    if let Some(pct) = arg.strip_suffix('%') {
        pct.trim().parse::<f32>().ok().map(|p| p / 100.0)
    } else {
        arg.parse::<f32>().ok()
    }
}

/// Extract the radius in px from a `blur(...)` filter function.
fn filter_blur_px(filter: &str) -> Option<f32> {
    let start = filter.find("blur(")?;
    let rest = &filter[start + "blur(".len()..];
    let end = rest.find(')')?;
    crate::css::value::parse_length_px(rest[..end].trim(), 16.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::color::Rgba;

    fn ctx_matches(style: &ComputedStyle, id: &str) -> bool {
        let catalogue = Catalogue::standard();
        let cx = PredicateContext { style, tag: "p" };
        catalogue.evaluate(&cx).iter().any(|c| c.id == id)
    }

    #[test]
    fn test_catalogue_has_sixteen_entries() {
        assert_eq!(Catalogue::standard().len(), 16);
    }

    #[test]
    fn test_default_style_matches_nothing() {
        let style = ComputedStyle::default();
        let catalogue = Catalogue::standard();
        let cx = PredicateContext {
            style: &style,
            tag: "p",
        };
        assert!(catalogue.evaluate(&cx).is_empty());
    }

    #[test]
    fn test_display_none() {
        let style = ComputedStyle {
            display: Display::None,
            ..Default::default()
        };
        assert!(ctx_matches(&style, "display-none"));
    }

    #[test]
    fn test_color_on_color_excludes_low_contrast_and_transparent() {
        let white_on_white = ComputedStyle {
            color: Rgba::WHITE,
            background: Rgba::WHITE,
            ..Default::default()
        };
        assert!(ctx_matches(&white_on_white, "color-on-color"));
        assert!(!ctx_matches(&white_on_white, "low-contrast"));
        assert!(!ctx_matches(&white_on_white, "transparent-color"));

        let near_white = ComputedStyle {
            color: Rgba::new(254, 254, 254, 1.0),
            background: Rgba::WHITE,
            ..Default::default()
        };
        assert!(ctx_matches(&near_white, "low-contrast"));
        assert!(!ctx_matches(&near_white, "color-on-color"));

        let transparent = ComputedStyle {
            color: Rgba::TRANSPARENT,
            ..Default::default()
        };
        assert!(ctx_matches(&transparent, "transparent-color"));
        assert!(!ctx_matches(&transparent, "color-on-color"));
    }

    #[test]
    fn test_geometric_family() {
        let tiny = ComputedStyle {
            font_size: 0.0,
            ..Default::default()
        };
        assert!(ctx_matches(&tiny, "zero-font-size"));

        let indent = ComputedStyle {
            text_indent: -9999.0,
            ..Default::default()
        };
        assert!(ctx_matches(&indent, "negative-text-indent"));

        let lh = ComputedStyle {
            line_height: Some(0.0),
            ..Default::default()
        };
        assert!(ctx_matches(&lh, "zero-line-height"));

        let collapsed = ComputedStyle {
            overflow: Overflow::Hidden,
            width: Some(0.0),
            ..Default::default()
        };
        assert!(ctx_matches(&collapsed, "collapsed-box"));
        // overflow hidden alone is a legitimate layout tool
        let just_overflow = ComputedStyle {
            overflow: Overflow::Hidden,
            ..Default::default()
        };
        assert!(!ctx_matches(&just_overflow, "collapsed-box"));
    }

    #[test]
    fn test_positional_family_requires_positioning() {
        let offscreen = ComputedStyle {
            position: Position::Absolute,
            left: Some(-9999.0),
            ..Default::default()
        };
        assert!(ctx_matches(&offscreen, "offscreen-position"));

        let static_left = ComputedStyle {
            left: Some(-9999.0),
            ..Default::default()
        };
        assert!(!ctx_matches(&static_left, "offscreen-position"));

        let margin = ComputedStyle {
            margin_left: Some(-2000.0),
            ..Default::default()
        };
        assert!(ctx_matches(&margin, "large-margin-offset"));
    }

    #[test]
    fn test_filters() {
        let fo = ComputedStyle {
            filter: Some("opacity(3%)".to_string()),
            ..Default::default()
        };
        assert!(ctx_matches(&fo, "filter-opacity"));

        let fo2 = ComputedStyle {
            filter: Some("opacity(0.5)".to_string()),
            ..Default::default()
        };
        assert!(!ctx_matches(&fo2, "filter-opacity"));

        let fb = ComputedStyle {
            filter: Some("blur(20px)".to_string()),
            ..Default::default()
        };
        assert!(ctx_matches(&fb, "filter-blur"));

        let fb2 = ComputedStyle {
            filter: Some("blur(2px)".to_string()),
            ..Default::default()
        };
        assert!(!ctx_matches(&fb2, "filter-blur"));
    }

    #[test]
    fn test_clip_patterns() {
        for clip in ["rect(0,0,0,0)", "inset(100%)", "circle(0)", "polygon(0 0, 0 0, 0 0)"] {
            let style = ComputedStyle {
                clip: Some(clip.to_string()),
                ..Default::default()
            };
            assert!(ctx_matches(&style, "clip-to-zero"), "clip {clip:?}");
        }
        let benign = ComputedStyle {
            clip: Some("circle(50%)".to_string()),
            ..Default::default()
        };
        assert!(!ctx_matches(&benign, "clip-to-zero"));
    }

    #[test]
    fn test_occlusion() {
        let occluded = ComputedStyle {
            position: Position::Relative,
            z_index: Some(-1),
            ..Default::default()
        };
        assert!(ctx_matches(&occluded, "occluded-by-stacking"));

        let fine = ComputedStyle {
            position: Position::Relative,
            z_index: Some(1),
            ..Default::default()
        };
        assert!(!ctx_matches(&fine, "occluded-by-stacking"));
    }

    #[test]
    fn test_each_minimal_style_matches_exactly_one_config() {
        // Catalogue completeness: every configuration has a minimal style
        // that triggers it and nothing else.
        let catalogue = Catalogue::standard();
        let cases: Vec<(&str, ComputedStyle)> = vec![
            (
                "display-none",
                ComputedStyle {
                    display: Display::None,
                    ..Default::default()
                },
            ),
            (
                "visibility-hidden",
                ComputedStyle {
                    visibility: Visibility::Hidden,
                    ..Default::default()
                },
            ),
            (
                "zero-opacity",
                ComputedStyle {
                    opacity: 0.0,
                    ..Default::default()
                },
            ),
            (
                "transparent-color",
                ComputedStyle {
                    color: Rgba::TRANSPARENT,
                    ..Default::default()
                },
            ),
            (
                "color-on-color",
                ComputedStyle {
                    color: Rgba::WHITE,
                    ..Default::default()
                },
            ),
            (
                "low-contrast",
                ComputedStyle {
                    color: Rgba::new(254, 254, 254, 1.0),
                    ..Default::default()
                },
            ),
            (
                "zero-font-size",
                ComputedStyle {
                    font_size: 0.0,
                    ..Default::default()
                },
            ),
            (
                "zero-line-height",
                ComputedStyle {
                    line_height: Some(0.0),
                    ..Default::default()
                },
            ),
            (
                "negative-text-indent",
                ComputedStyle {
                    text_indent: -5000.0,
                    ..Default::default()
                },
            ),
            (
                "offscreen-position",
                ComputedStyle {
                    position: Position::Absolute,
                    top: Some(-5000.0),
                    ..Default::default()
                },
            ),
            (
                "large-margin-offset",
                ComputedStyle {
                    margin_top: Some(-5000.0),
                    ..Default::default()
                },
            ),
            (
                "clip-to-zero",
                ComputedStyle {
                    clip: Some("rect(0,0,0,0)".to_string()),
                    ..Default::default()
                },
            ),
            (
                "collapsed-box",
                ComputedStyle {
                    overflow: Overflow::Hidden,
                    height: Some(0.0),
                    ..Default::default()
                },
            ),
            (
                "filter-opacity",
                ComputedStyle {
                    filter: Some("opacity(0)".to_string()),
                    ..Default::default()
                },
            ),
            (
                "filter-blur",
                ComputedStyle {
                    filter: Some("blur(50px)".to_string()),
                    ..Default::default()
                },
            ),
            (
                "occluded-by-stacking",
                ComputedStyle {
                    position: Position::Absolute,
                    z_index: Some(-1),
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(cases.len(), catalogue.len());
        for (expected, style) in cases {
            let cx = PredicateContext {
                style: &style,
                tag: "p",
            };
            let matched: Vec<&str> = catalogue.evaluate(&cx).iter().map(|c| c.id).collect();
            assert_eq!(matched, vec![expected], "style for {expected}");
        }
    }
}
