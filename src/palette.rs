// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A palette maps an iteration count onto a colour.  It always has
//! exactly 256 entries, and counts larger than that wrap around: two
//! pixels whose counts differ by a multiple of 256 get the same
//! colour.  That aliasing is part of how escape-time images look.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use error::{Error, Result};

/// Number of entries in every palette.
pub const PALETTE_SIZE: usize = 256;

/// One colour, as red, green and blue bytes.
pub type Rgb = [u8; 3];

/// A fixed table of 256 colours.  Built once, then only read, so a
/// single palette can be shared by any number of concurrent renders.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    entries: Vec<Rgb>,
}

impl Palette {
    /// Wraps a table of exactly 256 colours.
    pub fn from_entries(entries: Vec<Rgb>) -> Result<Palette> {
        if entries.len() != PALETTE_SIZE {
            return Err(Error::Palette(format!(
                "expected {} entries, found {}",
                PALETTE_SIZE,
                entries.len()
            )));
        }
        Ok(Palette { entries })
    }

    /// Builds a palette by asking `f` for each index in turn.
    pub fn from_fn<F>(f: F) -> Palette
    where
        F: Fn(u8) -> Rgb,
    {
        Palette {
            entries: (0..PALETTE_SIZE).map(|i| f(i as u8)).collect(),
        }
    }

    /// The palette the SDL viewers improvise from the count itself:
    /// red, green and blue advance at 2, 3 and 5 steps per iteration.
    pub fn gradient() -> Palette {
        Palette::from_fn(|i| [i.wrapping_mul(2), i.wrapping_mul(3), i.wrapping_mul(5)])
    }

    /// Black to white.
    pub fn grayscale() -> Palette {
        Palette::from_fn(|i| [i, i, i])
    }

    /// Arbitrary colours, reproducible from `seed`.  Index 0 stays
    /// black so the interior of a set reads as a hole.
    pub fn random(seed: u64) -> Palette {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut entries: Vec<Rgb> = (0..PALETTE_SIZE)
            .map(|_| [rng.gen(), rng.gen(), rng.gen()])
            .collect();
        entries[0] = [0, 0, 0];
        Palette { entries }
    }

    /// Reads a Fractint-style `.map` file: one `R G B` triple of
    /// decimal bytes per line, 256 lines.  Blank lines are skipped and
    /// anything after the third number on a line is ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Palette> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// The colour for an iteration count.  Total for every `u32`.
    #[inline]
    pub fn color(&self, count: u32) -> Rgb {
        self.entries[(count & 0xff) as usize]
    }

    /// All 256 entries, in index order.
    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::gradient()
    }
}

impl FromStr for Palette {
    type Err = Error;

    fn from_str(text: &str) -> Result<Palette> {
        let mut entries = Vec::with_capacity(PALETTE_SIZE);
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace().map(u8::from_str);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => entries.push([r, g, b]),
                _ => {
                    return Err(Error::Palette(format!(
                        "line {}: expected three bytes, found '{}'",
                        lineno + 1,
                        line
                    )))
                }
            }
        }
        Palette::from_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_wraps_instead_of_overflowing() {
        let pal = Palette::grayscale();
        assert_eq!(pal.color(0), [0, 0, 0]);
        assert_eq!(pal.color(255), [255, 255, 255]);
        assert_eq!(pal.color(256), [0, 0, 0]);
        assert_eq!(pal.color(1000), pal.color(1000 % 256));
        assert_eq!(pal.color(u32::max_value()), [255, 255, 255]);
    }

    #[test]
    fn gradient_matches_sdl_viewer_colors() {
        let pal = Palette::gradient();
        assert_eq!(pal.color(1), [2, 3, 5]);
        assert_eq!(pal.color(100), [200, 44, 244]);
    }

    #[test]
    fn wrong_sized_table_is_rejected() {
        assert!(Palette::from_entries(vec![[0, 0, 0]; 255]).is_err());
        assert!(Palette::from_entries(vec![[0, 0, 0]; 257]).is_err());
        assert!(Palette::from_entries(vec![[0, 0, 0]; 256]).is_ok());
    }

    #[test]
    fn random_palette_is_reproducible() {
        let a = Palette::random(42);
        let b = Palette::random(42);
        assert_eq!(a.entries(), b.entries());
        assert_eq!(a.color(0), [0, 0, 0]);
    }

    #[test]
    fn parses_map_text() {
        let mut text = String::new();
        for i in 0..256 {
            text.push_str(&format!("{} {} {}  comment\n", i, 255 - i, 7));
            if i == 10 {
                text.push('\n');
            }
        }
        let pal: Palette = text.parse().unwrap();
        assert_eq!(pal.color(3), [3, 252, 7]);
    }

    #[test]
    fn rejects_bad_map_lines() {
        assert!("1 2\n".parse::<Palette>().is_err());
        assert!("1 2 300\n".parse::<Palette>().is_err());
        assert!("0 0 0\n".parse::<Palette>().is_err());
    }
}
