//! Deterministic overlay gradients.
//!
//! Every card gets a two-stop gradient picked from a fixed palette by hashing
//! its URL. Domain and path are hashed separately so that pages on the same
//! site still spread across the palette.

use serde::{Deserialize, Serialize, Serializer};

use crate::urls::split_url;

/// Tailwind hue families used by the palettes and the color table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hue {
    Slate,
    Stone,
    Red,
    Orange,
    Amber,
    Yellow,
    Lime,
    Green,
    Emerald,
    Teal,
    Cyan,
    Sky,
    Blue,
    Indigo,
    Violet,
    Purple,
    Fuchsia,
    Pink,
    Rose,
}

impl Hue {
    pub fn name(self) -> &'static str {
        match self {
            Hue::Slate => "slate",
            Hue::Stone => "stone",
            Hue::Red => "red",
            Hue::Orange => "orange",
            Hue::Amber => "amber",
            Hue::Yellow => "yellow",
            Hue::Lime => "lime",
            Hue::Green => "green",
            Hue::Emerald => "emerald",
            Hue::Teal => "teal",
            Hue::Cyan => "cyan",
            Hue::Sky => "sky",
            Hue::Blue => "blue",
            Hue::Indigo => "indigo",
            Hue::Violet => "violet",
            Hue::Purple => "purple",
            Hue::Fuchsia => "fuchsia",
            Hue::Pink => "pink",
            Hue::Rose => "rose",
        }
    }
}

/// Which overlay text color the gradients must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// Dark stops under white text.
    #[default]
    Dark,
    /// Light stops under black text.
    Light,
}

impl Palette {
    pub fn shade(self) -> u16 {
        match self {
            Palette::Dark => 600,
            Palette::Light => 200,
        }
    }

    pub fn gradient(self, from: Hue, to: Hue) -> Gradient {
        let shade = self.shade();
        Gradient {
            from: ColorStop { hue: from, shade },
            to: ColorStop { hue: to, shade },
        }
    }

    pub fn entry(self, index: usize) -> Gradient {
        let (from, to) = PALETTE_PAIRS[index % PALETTE_SIZE];
        self.gradient(from, to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorStop {
    pub hue: Hue,
    pub shade: u16,
}

impl std::fmt::Display for ColorStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.hue.name(), self.shade)
    }
}

/// Two color stops, rendered as `from-<stop> to-<stop>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gradient {
    pub from: ColorStop,
    pub to: ColorStop,
}

impl std::fmt::Display for Gradient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "from-{} to-{}", self.from, self.to)
    }
}

impl Serialize for Gradient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const PALETTE_SIZE: usize = 10;

const PALETTE_PAIRS: [(Hue, Hue); PALETTE_SIZE] = [
    (Hue::Yellow, Hue::Pink),
    (Hue::Green, Hue::Blue),
    (Hue::Indigo, Hue::Purple),
    (Hue::Red, Hue::Yellow),
    (Hue::Teal, Hue::Lime),
    (Hue::Fuchsia, Hue::Rose),
    (Hue::Sky, Hue::Indigo),
    (Hue::Violet, Hue::Fuchsia),
    (Hue::Amber, Hue::Orange),
    (Hue::Emerald, Hue::Teal),
];

/// Position-sensitive rolling hash over the characters of `s`.
///
/// The mixing step rotates through five formulas by `index % 5`, on a
/// wrapping 32-bit signed accumulator. The absolute value is returned.
pub fn hash_code(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for (i, ch) in s.chars().enumerate() {
        let c = ch as i32;
        hash = match i % 5 {
            0 => (hash << 5).wrapping_sub(hash).wrapping_add(c),
            1 => (hash << 3).wrapping_add(hash).wrapping_add(c),
            2 => hash.wrapping_add(c << 4),
            3 => hash ^ (c << 2),
            _ => hash.wrapping_add(c.wrapping_mul(7)),
        };
    }
    hash.unsigned_abs()
}

/// Palette slot for a URL, always in `0..PALETTE_SIZE`.
pub fn palette_index(url: &str) -> usize {
    let (domain, path) = split_url(url);
    let combined = u64::from(hash_code(domain)) * 31 + u64::from(hash_code(path));
    (combined % PALETTE_SIZE as u64) as usize
}

/// Fallback gradient for a URL.
pub fn gradient_for(url: &str, palette: Palette) -> Gradient {
    palette.entry(palette_index(url))
}
