//! Color schemes: pure functions from `(level, position)` to a color tier.
//!
//! The core never names terminal colors. A surface maps each [`ColorTier`]
//! to whatever its backend supports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseNameError;

/// Ordered set of color categories. `Dim` is reserved for axes, empty meter
/// segments and fading trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ColorTier {
    Dim,
    Blue,
    Cyan,
    Green,
    Yellow,
    Red,
    Magenta,
    #[default]
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Multicolor,
    Blue,
    Green,
    Red,
    Rainbow,
    Fire,
    Prism,
    Heat,
    Ocean,
}

impl ColorScheme {
    /// Cycle order used by the color key.
    pub const ALL: [ColorScheme; 9] = [
        ColorScheme::Multicolor,
        ColorScheme::Blue,
        ColorScheme::Green,
        ColorScheme::Red,
        ColorScheme::Rainbow,
        ColorScheme::Fire,
        ColorScheme::Prism,
        ColorScheme::Heat,
        ColorScheme::Ocean,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorScheme::Multicolor => "multicolor",
            ColorScheme::Blue => "blue",
            ColorScheme::Green => "green",
            ColorScheme::Red => "red",
            ColorScheme::Rainbow => "rainbow",
            ColorScheme::Fire => "fire",
            ColorScheme::Prism => "prism",
            ColorScheme::Heat => "heat",
            ColorScheme::Ocean => "ocean",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Schemes that ignore the level and color by horizontal position.
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            ColorScheme::Rainbow | ColorScheme::Prism | ColorScheme::Ocean
        )
    }

    /// Tier for a cell. `level` is the bar height or intensity at the cell,
    /// `position` its horizontal (or angular) position; both in [0, 1] and
    /// clamped otherwise.
    pub fn tier(self, level: f32, position: f32) -> ColorTier {
        use ColorTier::*;
        let level = unit(level);
        let pos = unit(position);
        match self {
            ColorScheme::Multicolor => {
                let blend = 0.5 * level + 0.5 * pos;
                ladder(blend, &[(0.33, Green), (0.66, Yellow)], Red)
            }
            ColorScheme::Blue => ladder(level, &[(0.3, Blue), (0.7, Cyan)], White),
            ColorScheme::Green => ladder(level, &[(0.5, Green)], Yellow),
            ColorScheme::Red => ladder(level, &[(0.5, Yellow)], Red),
            ColorScheme::Rainbow => ladder(
                pos,
                &[(0.2, Red), (0.4, Yellow), (0.6, Green), (0.8, Cyan)],
                Blue,
            ),
            ColorScheme::Fire => ladder(level, &[(0.3, Red), (0.6, Yellow)], White),
            ColorScheme::Prism => ladder(
                pos,
                &[
                    (0.16, Red),
                    (0.32, Yellow),
                    (0.48, Green),
                    (0.64, Cyan),
                    (0.80, Blue),
                ],
                Magenta,
            ),
            ColorScheme::Heat => ladder(
                level,
                &[(0.25, Blue), (0.5, Green), (0.75, Yellow)],
                Red,
            ),
            ColorScheme::Ocean => ladder(pos, &[(0.33, Cyan), (0.66, Blue)], White),
        }
    }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// First tier whose threshold `v` is below, else `top`.
fn ladder(v: f32, steps: &[(f32, ColorTier)], top: ColorTier) -> ColorTier {
    steps
        .iter()
        .find(|(threshold, _)| v < *threshold)
        .map(|&(_, tier)| tier)
        .unwrap_or(top)
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorScheme {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| ParseNameError::new("color scheme", s, &Self::ALL.map(ColorScheme::name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ladders() {
        assert_eq!(ColorScheme::Blue.tier(0.1, 0.9), ColorTier::Blue);
        assert_eq!(ColorScheme::Blue.tier(0.5, 0.9), ColorTier::Cyan);
        assert_eq!(ColorScheme::Blue.tier(0.9, 0.0), ColorTier::White);
        assert_eq!(ColorScheme::Fire.tier(0.2, 0.0), ColorTier::Red);
        assert_eq!(ColorScheme::Heat.tier(0.6, 0.0), ColorTier::Yellow);
    }

    #[test]
    fn positional_schemes_ignore_level() {
        for scheme in ColorScheme::ALL.into_iter().filter(|s| s.is_positional()) {
            for pos in [0.0, 0.3, 0.7, 1.0] {
                assert_eq!(scheme.tier(0.0, pos), scheme.tier(1.0, pos), "{scheme}");
            }
        }
        assert_eq!(ColorScheme::Rainbow.tier(0.5, 0.0), ColorTier::Red);
        assert_eq!(ColorScheme::Rainbow.tier(0.5, 1.0), ColorTier::Blue);
    }

    #[test]
    fn multicolor_blends_level_and_position() {
        assert_eq!(ColorScheme::Multicolor.tier(0.0, 0.0), ColorTier::Green);
        assert_eq!(ColorScheme::Multicolor.tier(1.0, 0.0), ColorTier::Yellow);
        assert_eq!(ColorScheme::Multicolor.tier(1.0, 1.0), ColorTier::Red);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(ColorScheme::Blue.tier(f32::NAN, 0.0), ColorTier::Blue);
        assert_eq!(ColorScheme::Blue.tier(7.0, 0.0), ColorTier::White);
    }

    #[test]
    fn cycling_visits_every_scheme() {
        let mut s = ColorScheme::default();
        for _ in 0..ColorScheme::ALL.len() {
            s = s.next();
        }
        assert_eq!(s, ColorScheme::default());
        assert_eq!("OCEAN".parse::<ColorScheme>(), Ok(ColorScheme::Ocean));
    }
}
