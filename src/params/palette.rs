//! Colour palettes (one colour per band, low to high).

use std::fmt;
use std::str::FromStr;

use super::analysis::BAND_COUNT;
use crate::error::Error;

/// Named palette of nine `#RRGGBB` band colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    /// Dark red through the spectrum to magenta
    #[default]
    Vibrant,
    /// Hot pinks sliding into violet
    Retro,
    /// Soft desaturated spectrum
    Pastel,
    /// Phosphor-green monochrome ramp
    Mono,
}

const VIBRANT: [&str; BAND_COUNT] = [
    "#5A0000", // Dark red
    "#E10600", // Red
    "#FF7A00", // Orange
    "#FFD400", // Yellow
    "#3DFF4E", // Green
    "#00E5FF", // Cyan
    "#2F5BFF", // Blue
    "#6A00FF", // Purple
    "#FF00C8", // Magenta
];

const RETRO: [&str; BAND_COUNT] = [
    "#FF0080", "#FF0099", "#FF00CC", "#FF00FF", "#CC00FF", "#9900FF", "#6600FF", "#3300FF",
    "#FF00CC",
];

const PASTEL: [&str; BAND_COUNT] = [
    "#FFB3BA", "#FFCBA4", "#FFDFBA", "#FFFFBA", "#BAFFC9", "#BAE1FF", "#C9C9FF", "#E0BBFF",
    "#FFC6FF",
];

const MONO: [&str; BAND_COUNT] = [
    "#0F5F1F", "#1A7A2A", "#249536", "#2FB042", "#3ACB4E", "#5CD86D", "#7EE48C", "#A0F0AB",
    "#C2FCCA",
];

impl Palette {
    /// All palettes in toggle order
    pub const ALL: [Palette; 4] = [
        Palette::Vibrant,
        Palette::Retro,
        Palette::Pastel,
        Palette::Mono,
    ];

    /// Band colours as hex strings
    pub fn colors(self) -> &'static [&'static str; BAND_COUNT] {
        match self {
            Palette::Vibrant => &VIBRANT,
            Palette::Retro => &RETRO,
            Palette::Pastel => &PASTEL,
            Palette::Mono => &MONO,
        }
    }

    /// Next palette in toggle order (wraps)
    pub fn next(self) -> Palette {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Palette::Vibrant => "Vibrant",
            Palette::Retro => "Retro",
            Palette::Pastel => "Pastel",
            Palette::Mono => "Mono",
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Palette {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vibrant" | "default" => Ok(Palette::Vibrant),
            "retro" => Ok(Palette::Retro),
            "pastel" => Ok(Palette::Pastel),
            "mono" => Ok(Palette::Mono),
            other => Err(Error::UnknownPalette(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::color::Rgb;

    #[test]
    fn test_palette_colors_are_well_formed() {
        for palette in Palette::ALL {
            for hex in palette.colors() {
                assert!(Rgb::parse_hex(hex).is_some(), "{palette}: {hex}");
            }
        }
    }

    #[test]
    fn test_palette_toggle_cycles() {
        let mut palette = Palette::Vibrant;
        for _ in 0..Palette::ALL.len() {
            palette = palette.next();
        }
        assert_eq!(palette, Palette::Vibrant);
        assert_eq!(Palette::Vibrant.next(), Palette::Retro);
    }

    #[test]
    fn test_palette_parse() {
        assert_eq!("Retro".parse::<Palette>().unwrap(), Palette::Retro);
        assert_eq!("default".parse::<Palette>().unwrap(), Palette::Vibrant);
        assert!("neon".parse::<Palette>().is_err());
    }
}
