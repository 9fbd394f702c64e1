//! Color parsing and HSV conversion.
//!
//! Shape colors are kept as RGB channels on the 0..255 scale, the way the
//! SVG loader reads them. HSV follows the usual hexcone model: hue and
//! saturation in 0..1, value on the same scale as the channels.

use std::str::FromStr;

/// White, used when an element carries no usable paint.
pub const DEFAULT_RGB: [u8; 3] = [255, 255, 255];

/// Parse an SVG paint value (`#rgb`, `#rrggbb`, `rgb(...)`, named colors).
///
/// Returns `None` for `none`, gradients (`url(#...)`) and anything else
/// that is not a plain color.
pub fn parse_paint(value: &str) -> Option<[u8; 3]> {
    let value = value.trim();
    if value.is_empty() || value == "none" || value.starts_with("url(") {
        return None;
    }
    svgtypes::Color::from_str(value)
        .ok()
        .map(|c| [c.red, c.green, c.blue])
}

/// Convert RGB channels to `(hue, saturation, value)`.
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if min == max {
        return (0.0, 0.0, v);
    }
    let range = max - min;
    let s = range / max;
    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_named() {
        assert_eq!(parse_paint("#ff0000"), Some([255, 0, 0]));
        assert_eq!(parse_paint("#0f0"), Some([0, 255, 0]));
        assert_eq!(parse_paint("blue"), Some([0, 0, 255]));
        assert_eq!(parse_paint("none"), None);
        assert_eq!(parse_paint("url(#grad)"), None);
    }

    #[test]
    fn hsv_of_primaries() {
        assert_eq!(rgb_to_hsv(255.0, 0.0, 0.0), (0.0, 1.0, 255.0));
        let (h, s, v) = rgb_to_hsv(0.0, 255.0, 0.0);
        assert!((h - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!((s, v), (1.0, 255.0));
        // grays have no hue or saturation
        assert_eq!(rgb_to_hsv(128.0, 128.0, 128.0), (0.0, 0.0, 128.0));
    }

    #[test]
    fn value_orders_by_brightness() {
        let dark = rgb_to_hsv(100.0, 0.0, 0.0).2;
        let light = rgb_to_hsv(200.0, 0.0, 0.0).2;
        assert!(dark < light);
    }
}
