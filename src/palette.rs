//! Qualitative colours for taxon labels.
//!
//! Colours are spread around the hue circle by the golden angle so that
//! neighbouring labels stay distinguishable for any count. An optional root
//! colour fixes the first hue.

use std::fmt;
use std::str::FromStr;

/// Hue step between consecutive colours, in degrees.
const GOLDEN_ANGLE: f64 = 137.507_764;
/// Hue of the first colour when no root is given.
const DEFAULT_ROOT_HUE: f64 = 210.0;
const SATURATION: f64 = 0.65;
const LIGHTNESS: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let h = hue.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb(channel(r), channel(g), channel(b))
    }

    /// Hue of the colour in degrees.
    fn hue(self) -> f64 {
        let (r, g, b) = (
            self.0 as f64 / 255.0,
            self.1 as f64 / 255.0,
            self.2 as f64 / 255.0,
        );
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        if delta == 0.0 {
            return 0.0;
        }
        let hue = if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        hue.rem_euclid(360.0)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parses `#rrggbb` or `rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid colour '{}', expected #rrggbb", s));
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Returns `count` distinct colours; the first one is `root` when given.
pub fn qualitative(count: usize, root: Option<Rgb>) -> Vec<Rgb> {
    let start = root.map_or(DEFAULT_ROOT_HUE, Rgb::hue);
    (0..count)
        .map(|i| match (i, root) {
            (0, Some(root)) => root,
            _ => Rgb::from_hsl(start + GOLDEN_ANGLE * i as f64, SATURATION, LIGHTNESS),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let colour: Rgb = "#DC143C".parse().unwrap();
        assert_eq!(colour, Rgb(0xdc, 0x14, 0x3c));
        assert_eq!(colour.to_string(), "#dc143c");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("zz0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_qualitative_is_deterministic() {
        assert_eq!(qualitative(5, None), qualitative(5, None));
        assert_eq!(qualitative(0, None), Vec::new());
    }

    #[test]
    fn test_qualitative_colours_distinct() {
        let colours = qualitative(12, None);
        for (i, a) in colours.iter().enumerate() {
            for b in &colours[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_root_colour_first() {
        let root = Rgb(0x63, 0x6e, 0xfa);
        let colours = qualitative(3, Some(root));
        assert_eq!(colours[0], root);
        assert_ne!(colours[1], root);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(Rgb::from_hsl(0.0, 1.0, 0.5), Rgb(255, 0, 0));
        assert_eq!(Rgb::from_hsl(120.0, 1.0, 0.5), Rgb(0, 255, 0));
        assert_eq!(Rgb::from_hsl(240.0, 1.0, 0.5), Rgb(0, 0, 255));
    }
}
