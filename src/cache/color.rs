//! `#RRGGBB` colour parsing, formatting and blending.
//!
//! The renderers work on [`Rgb`] values; the string-level helpers exist for
//! callers holding hex text and pass malformed input through unchanged.

use std::fmt;

use crossterm::style::Color;

/// Intensity above which the gradient shifts toward white
const HOT_CORE_START: f32 = 0.7;

/// 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse exactly `#RRGGBB` (either hex case); anything else is `None`
    pub fn parse_hex(hex: &str) -> Option<Rgb> {
        let bytes = hex.as_bytes();
        if bytes.len() != 7 || bytes[0] != b'#' {
            return None;
        }
        let channel = |i: usize| Some(unhex(bytes[i])? << 4 | unhex(bytes[i + 1])?);
        Some(Rgb::new(channel(1)?, channel(3)?, channel(5)?))
    }

    /// Format as upper-case `#RRGGBB`
    pub fn to_hex(self) -> String {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        let mut out = String::with_capacity(7);
        out.push('#');
        for v in [self.r, self.g, self.b] {
            out.push(DIGITS[(v >> 4) as usize] as char);
            out.push(DIGITS[(v & 0x0F) as usize] as char);
        }
        out
    }

    /// Brighten nonlinearly with intensity and blend toward white above
    /// 0.7 (the hot core).
    pub fn gradient(self, intensity: f32) -> Rgb {
        let intensity = if intensity.is_finite() {
            intensity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let brightness = 0.2 + intensity.powf(0.7) * 0.8;
        let heat = if intensity > HOT_CORE_START {
            (intensity - HOT_CORE_START) / (1.0 - HOT_CORE_START)
        } else {
            0.0
        };
        let shade = |v: u8| to_channel(v as f32 * brightness * (1.0 - heat) + 255.0 * heat);
        Rgb::new(shade(self.r), shade(self.g), shade(self.b))
    }

    /// Per-channel linear interpolation; `ratio` 0 keeps `self`, 1 yields `other`
    pub fn blend(self, other: Rgb, ratio: f32) -> Rgb {
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mix = |a: u8, b: u8| to_channel(a as f32 * (1.0 - ratio) + b as f32 * ratio);
        Rgb::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }

    /// Terminal colour for this value
    pub fn to_terminal(self) -> Color {
        Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Hex-level [`Rgb::gradient`]; malformed input comes back unchanged
pub fn gradient(color: &str, intensity: f32) -> String {
    match Rgb::parse_hex(color) {
        Some(rgb) => rgb.gradient(intensity).to_hex(),
        None => color.to_string(),
    }
}

/// Hex-level [`Rgb::blend`]; if either side is malformed the other side is
/// returned unchanged
pub fn blend(a: &str, b: &str, ratio: f32) -> String {
    match (Rgb::parse_hex(a), Rgb::parse_hex(b)) {
        (Some(a), Some(b)) => a.blend(b, ratio).to_hex(),
        (None, _) => b.to_string(),
        (Some(_), None) => a.to_string(),
    }
}

fn unhex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn to_channel(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Rgb::parse_hex("#FF00C8"), Some(Rgb::new(255, 0, 200)));
        assert_eq!(Rgb::parse_hex("#ff00c8"), Some(Rgb::new(255, 0, 200)));
        assert_eq!(Rgb::parse_hex("FF00C8"), None);
        assert_eq!(Rgb::parse_hex("#FF00C"), None);
        assert_eq!(Rgb::parse_hex("#GG0000"), None);
        assert_eq!(Rgb::parse_hex(""), None);
    }

    #[test]
    fn test_malformed_passes_through() {
        assert_eq!(gradient("not-a-color", 0.9), "not-a-color");
        assert_eq!(blend("#nope!!", "#102030", 0.5), "#102030");
        assert_eq!(blend("#102030", "bad", 0.5), "#102030");
    }

    #[test]
    fn test_gradient_dims_and_heats() {
        let base = Rgb::new(200, 100, 0);

        // Silence keeps 20% brightness
        assert_eq!(base.gradient(0.0), Rgb::new(40, 20, 0));

        // Full intensity is fully white-hot
        assert_eq!(base.gradient(1.0), Rgb::WHITE);

        // Below the hot core there is no white shift on a zero channel
        assert_eq!(base.gradient(0.5).b, 0);
        assert!(base.gradient(0.85).b > 100);
    }

    #[test]
    fn test_blend_endpoints() {
        let a = Rgb::new(0, 0, 0);
        let b = Rgb::new(255, 128, 64);
        assert_eq!(a.blend(b, 0.0), a);
        assert_eq!(a.blend(b, 1.0), b);
        assert_eq!(a.blend(b, 0.5), Rgb::new(127, 64, 32));
        assert_eq!(blend("#000000", "#FF8040", 0.5), "#7F4020");
    }

    proptest! {
        #[test]
        fn prop_hex_round_trip(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let hex = format!("#{:02X}{:02X}{:02X}", r, g, b);
            let parsed = Rgb::parse_hex(&hex).unwrap();
            prop_assert_eq!(parsed.to_hex(), hex.clone());
            prop_assert_eq!(parsed.to_string(), hex);
        }
    }
}
