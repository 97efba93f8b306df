use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LENGTH_RE: Regex =
        Regex::new(r"^([-+]?[0-9]*\.?[0-9]+)(px|pt|em|rem|%)?$").unwrap();
}

/// Resolve a CSS length to pixels against `base_px` (the parent's computed
/// font size for em/%; root font size is fixed at 16px for rem).
///
/// Unit ratios follow email-client conventions: 1pt = 1.333px.
pub fn parse_length_px(value: &str, base_px: f32) -> Option<f32> {
    let caps = LENGTH_RE.captures(value.trim())?;
    let num: f32 = caps.get(1)?.as_str().parse().ok()?;
    let px = match caps.get(2).map(|m| m.as_str()) {
        Some("pt") => num * 1.333,
        Some("em") => num * base_px,
        Some("rem") => num * 16.0,
        Some("%") => num / 100.0 * base_px,
        _ => num,
    };
    Some(px)
}

/// Parse an opacity value ("0.3", "30%"), clamped to [0, 1].
pub fn parse_opacity(value: &str) -> Option<f32> {
    let v = value.trim();
    let alpha = if let Some(pct) = v.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? / 100.0
    } else {
        v.parse::<f32>().ok()?
    };
    Some(alpha.clamp(0.0, 1.0))
}

/// Legacy `<font size=N>` values, 1 through 7.
pub fn legacy_font_size_px(value: &str) -> Option<f32> {
    match value.trim() {
        "1" => Some(10.0),
        "2" => Some(13.0),
        "3" => Some(16.0),
        "4" => Some(18.0),
        "5" => Some(24.0),
        "6" => Some(32.0),
        "7" => Some(48.0),
        _ => None,
    }
}
