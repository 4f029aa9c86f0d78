//! Watermark color parsing
//!
//! Accepts `#RRGGBB`, `#AARRGGBB` (alpha is ignored, opacity is a separate
//! watermark setting) and a small set of color names. Anything else is reported
//! as a failed parse so callers can apply their own fallback.

/// An opaque RGB color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Channels scaled to the 0.0-1.0 range used by the `rg` operator
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
        )
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("black", Rgb::new(0x00, 0x00, 0x00)),
    ("darkgray", Rgb::new(0x44, 0x44, 0x44)),
    ("darkgrey", Rgb::new(0x44, 0x44, 0x44)),
    ("gray", Rgb::new(0x88, 0x88, 0x88)),
    ("grey", Rgb::new(0x88, 0x88, 0x88)),
    ("lightgray", Rgb::new(0xCC, 0xCC, 0xCC)),
    ("lightgrey", Rgb::new(0xCC, 0xCC, 0xCC)),
    ("white", Rgb::new(0xFF, 0xFF, 0xFF)),
    ("red", Rgb::new(0xFF, 0x00, 0x00)),
    ("green", Rgb::new(0x00, 0xFF, 0x00)),
    ("blue", Rgb::new(0x00, 0x00, 0xFF)),
    ("yellow", Rgb::new(0xFF, 0xFF, 0x00)),
    ("cyan", Rgb::new(0x00, 0xFF, 0xFF)),
    ("magenta", Rgb::new(0xFF, 0x00, 0xFF)),
    ("aqua", Rgb::new(0x00, 0xFF, 0xFF)),
    ("fuchsia", Rgb::new(0xFF, 0x00, 0xFF)),
    ("lime", Rgb::new(0x00, 0xFF, 0x00)),
    ("maroon", Rgb::new(0x80, 0x00, 0x00)),
    ("navy", Rgb::new(0x00, 0x00, 0x80)),
    ("olive", Rgb::new(0x80, 0x80, 0x00)),
    ("purple", Rgb::new(0x80, 0x00, 0x80)),
    ("silver", Rgb::new(0xC0, 0xC0, 0xC0)),
    ("teal", Rgb::new(0x00, 0x80, 0x80)),
];

/// Parse a color string
///
/// Returns the parsed color and `true`, or black and `false` when the string
/// is not a recognized color. Never fails.
///
/// # Example
///
/// ```
/// use pdf_watermark::color::{parse_color, Rgb};
///
/// assert_eq!(parse_color("#FF0000"), (Rgb::new(255, 0, 0), true));
/// assert_eq!(parse_color("not a color"), (Rgb::BLACK, false));
/// ```
pub fn parse_color(input: &str) -> (Rgb, bool) {
    match try_parse(input) {
        Some(rgb) => (rgb, true),
        None => (Rgb::BLACK, false),
    }
}

fn try_parse(input: &str) -> Option<Rgb> {
    let input = input.trim();

    if let Some(hex) = input.strip_prefix('#') {
        return parse_hex(hex);
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(input))
        .map(|(_, rgb)| *rgb)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    // #AARRGGBB carries a leading alpha byte
    let rgb = match hex.len() {
        6 => hex,
        8 => &hex[2..],
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&rgb[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_rgb() {
        assert_eq!(parse_color("#FF0000"), (Rgb::new(255, 0, 0), true));
        assert_eq!(parse_color("#00ff80"), (Rgb::new(0, 255, 128), true));
    }

    #[test]
    fn test_parse_hex_ignores_alpha() {
        assert_eq!(parse_color("#80112233"), (Rgb::new(0x11, 0x22, 0x33), true));
    }

    #[test]
    fn test_parse_named_colors() {
        assert_eq!(parse_color("red"), (Rgb::new(255, 0, 0), true));
        assert_eq!(parse_color("Navy"), (Rgb::new(0, 0, 0x80), true));
        assert_eq!(parse_color(" lightgrey "), (Rgb::new(0xCC, 0xCC, 0xCC), true));
    }

    #[test]
    fn test_invalid_colors_fall_back_to_black() {
        for input in ["", "#", "#FFF", "#GG0000", "#FF00001", "chartreuse-ish", "FF0000"] {
            assert_eq!(parse_color(input), (Rgb::BLACK, false), "input: {:?}", input);
        }
    }

    #[test]
    fn test_non_ascii_hex_is_rejected() {
        // Multi-byte chars must not be sliced mid-codepoint
        assert_eq!(parse_color("#ÿÿÿ"), (Rgb::BLACK, false));
    }

    #[test]
    fn test_to_unit() {
        let (r, g, b) = Rgb::new(255, 0, 51).to_unit();
        assert_eq!(r, 1.0);
        assert_eq!(g, 0.0);
        assert!((b - 0.2).abs() < 0.001);
    }
}
