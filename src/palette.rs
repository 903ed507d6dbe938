//! Surface color palette
//!
//! The surface shows track colors from a fixed table; host RGB values are
//! snapped to the nearest entry by euclidean distance.

use std::collections::HashMap;

/// Palette index used when a track has no color
pub const DEFAULT_COLOR_INDEX: u8 = 70;

const PALETTE: [u32; 83] = [
    0xff94a6, 0xffa529, 0xcc9926, 0xf6f47d, 0xbffb00, 0x1eff2e, 0x28ffa8, 0x5cffe8, 0x8bc5ff,
    0x5480e4, 0x92a7ff, 0xd86ce4, 0xe553a0, 0xffffff, //
    0xff3536, 0xf66c03, 0x99614b, 0xe1d52d, 0x87ff68, 0x3ec303, 0x02bfaf, 0x18e9ff, 0x0fa4ee,
    0x027dc0, 0x896ce4, 0xb677c6, 0xff39d4, 0xd0d0d0, //
    0xe4685a, 0xffa374, 0xd3ad71, 0xedffae, 0xd2e498, 0xbad074, 0x9bc48d, 0xd4fde1, 0xcdf1f8,
    0xb8c1e3, 0xcdbbe4, 0xae98e5, 0xe5dce1, 0xa9a9a9, //
    0xe6928b, 0xb78256, 0x98836a, 0xbfba6a, 0xa7be00, 0x89c2ba, 0x96c1ba, 0x9cb3c4, 0x85a5c7,
    0x8392cd, 0xa595b5, 0xbf9fbe, 0xbc7195, 0x7b7b7b, //
    0xaf3333, 0xa95131, 0x724f41, 0xdbc300, 0x85951f, 0x539f31, 0x089c8e, 0x226384, 0x1a2e96,
    0x2f52a2, 0x614bad, 0xa34bad, 0xcc2e6d, 0x3c3c3c, //
    0x000000, 0xff0000, 0x03ff00, 0xffff00, 0x0000ff, 0xff00ff, 0x03ffff, 0x800000, 0x808000,
    0x008002, 0x008080, 0x000080, 0x800080,
];

/// 8-bit RGB color as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Build from normalized (0.0-1.0) channels, truncating like the host does
    pub fn from_normalized(r: f64, g: f64, b: f64) -> Self {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0) as u8;
        Rgb(channel(r), channel(g), channel(b))
    }
}

/// Nearest palette index for `color`
pub fn closest_index(color: Rgb) -> u8 {
    let Rgb(r, g, b) = color;
    let mut best = 0usize;
    let mut best_distance = u32::MAX;
    for (index, entry) in PALETTE.iter().enumerate() {
        let dr = ((entry >> 16) & 0xFF) as i32 - r as i32;
        let dg = ((entry >> 8) & 0xFF) as i32 - g as i32;
        let db = (entry & 0xFF) as i32 - b as i32;
        let distance = (dr * dr + dg * dg + db * db) as u32;
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best as u8
}

/// Memoizing palette lookup
#[derive(Debug, Default)]
pub struct Palette {
    cache: HashMap<Rgb, u8>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_of(&mut self, color: Option<Rgb>) -> u8 {
        match color {
            Some(rgb) => *self.cache.entry(rgb).or_insert_with(|| closest_index(rgb)),
            None => DEFAULT_COLOR_INDEX,
        }
    }
}
