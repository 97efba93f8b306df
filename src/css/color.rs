use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEX_RE: Regex = Regex::new(r"^#([0-9a-fA-F]{3,8})$").unwrap();
    static ref RGB_RE: Regex = Regex::new(
        r"^rgba?\(\s*([0-9]+)\s*,\s*([0-9]+)\s*,\s*([0-9]+)\s*(?:,\s*([0-9.]+)\s*)?\)$"
    )
    .unwrap();
    static ref HSL_RE: Regex = Regex::new(
        r"^hsla?\(\s*([0-9]+)\s*,\s*([0-9]+)%\s*,\s*([0-9]+)%\s*(?:,\s*([0-9.]+)\s*)?\)$"
    )
    .unwrap();
}

/// An sRGB color with alpha. Equality compares the RGB channels and alpha
/// bit-exactly; the contrast predicates do their own perceptual comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 1.0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Source-over composite of `self` on top of `backdrop`.
    pub fn over(&self, backdrop: Rgba) -> Rgba {
        if self.is_opaque() {
            return *self;
        }
        if self.is_transparent() {
            return backdrop;
        }
        let fa = self.a;
        let ba = backdrop.a;
        let out_a = fa + ba * (1.0 - fa);
        let blend = |f: u8, b: u8| -> u8 {
            let v = f as f32 * fa + b as f32 * ba * (1.0 - fa);
            v.min(255.0).round() as u8
        };
        Rgba {
            r: blend(self.r, backdrop.r),
            g: blend(self.g, backdrop.g),
            b: blend(self.b, backdrop.b),
            a: out_a.clamp(0.0, 1.0),
        }
    }

    pub fn same_rgb(&self, other: &Rgba) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// WCAG 2.1 relative luminance of the RGB channels.
    fn relative_luminance(&self) -> f32 {
        let lin = |c: u8| -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
    }

    /// WCAG 2.1 contrast ratio between two colors, in [1, 21].
    pub fn contrast_ratio(&self, other: &Rgba) -> f32 {
        let l1 = self.relative_luminance() + 0.05;
        let l2 = other.relative_luminance() + 0.05;
        if l1 > l2 {
            l1 / l2
        } else {
            l2 / l1
        }
    }
}

/// Parse a CSS color value. Returns `None` for values we cannot interpret
/// (gradients, `inherit`, vendor junk); the caller decides the fallback.
pub fn parse_color(value: &str) -> Option<Rgba> {
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return None;
    }
    if v == "transparent" {
        return Some(Rgba::TRANSPARENT);
    }
    if let Some(caps) = HEX_RE.captures(&v) {
        return parse_hex(caps.get(1).unwrap().as_str());
    }
    if let Some(caps) = RGB_RE.captures(&v) {
        let r = caps.get(1)?.as_str().parse::<u32>().ok()?.min(255) as u8;
        let g = caps.get(2)?.as_str().parse::<u32>().ok()?.min(255) as u8;
        let b = caps.get(3)?.as_str().parse::<u32>().ok()?.min(255) as u8;
        let a = match caps.get(4) {
            Some(m) => m.as_str().parse::<f32>().ok()?.clamp(0.0, 1.0),
            None => 1.0,
        };
        return Some(Rgba::new(r, g, b, a));
    }
    if let Some(caps) = HSL_RE.captures(&v) {
        let h = caps.get(1)?.as_str().parse::<f32>().ok()?;
        let s = caps.get(2)?.as_str().parse::<f32>().ok()?;
        let l = caps.get(3)?.as_str().parse::<f32>().ok()?;
        let a = match caps.get(4) {
            Some(m) => m.as_str().parse::<f32>().ok()?.clamp(0.0, 1.0),
            None => 1.0,
        };
        return Some(hsl_to_rgba(h, s, l, a));
    }
    named_color(&v)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expanded: String = if hex.len() == 3 || hex.len() == 4 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    if expanded.len() != 6 && expanded.len() != 8 {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let r = byte(0)?;
    let g = byte(2)?;
    let b = byte(4)?;
    let a = if expanded.len() == 8 {
        byte(6)? as f32 / 255.0
    } else {
        1.0
    };
    Some(Rgba::new(r, g, b, a))
}

fn hsl_to_rgba(h: f32, s: f32, l: f32, a: f32) -> Rgba {
    let h = (h % 360.0) / 360.0;
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };
    Rgba::new(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
        a,
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// The CSS named colors that actually occur in email markup.
fn named_color(name: &str) -> Option<Rgba> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "gold" => (255, 215, 0),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "aqua" | "cyan" => (0, 255, 255),
        "teal" => (0, 128, 128),
        "navy" => (0, 0, 128),
        "fuchsia" | "magenta" => (255, 0, 255),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        "snow" => (255, 250, 250),
        "whitesmoke" => (245, 245, 245),
        "ghostwhite" => (248, 248, 255),
        "aliceblue" => (240, 248, 255),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "dimgray" | "dimgrey" => (105, 105, 105),
        "gainsboro" => (220, 220, 220),
        "lavender" => (230, 230, 250),
        "lightyellow" => (255, 255, 224),
        "lightblue" => (173, 216, 230),
        "lightgreen" => (144, 238, 144),
        "darkred" => (139, 0, 0),
        "darkblue" => (0, 0, 139),
        "darkgreen" => (0, 100, 0),
        "crimson" => (220, 20, 60),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "tomato" => (255, 99, 71),
        "salmon" => (250, 128, 114),
        "khaki" => (240, 230, 140),
        "tan" => (210, 180, 140),
        "coral" => (255, 127, 80),
        "turquoise" => (64, 224, 208),
        "skyblue" => (135, 206, 235),
        "steelblue" => (70, 130, 180),
        "royalblue" => (65, 105, 225),
        "slategray" | "slategrey" => (112, 128, 144),
        _ => return None,
    };
    Some(Rgba::new(r, g, b, 1.0))
}
