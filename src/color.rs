//! 8-bit RGBA color and brush color parsing.
//!
//! Brush colors arrive as CSS color strings from the drawing front end. Only
//! the forms the survey emits are understood (`#rgb`, `#rrggbb`,
//! `#rrggbbaa`, `rgb(...)`, `rgba(...)`, `transparent`); anything else falls
//! back to opaque black, which is what a canvas does with an unparsable
//! `strokeStyle`.

use crate::basics::iround;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BASE_SHIFT: u32 = 8;
    pub const BASE_MASK: u32 = (1 << Self::BASE_SHIFT) - 1;
    pub const BASE_MSB: u32 = 1 << (Self::BASE_SHIFT - 1);

    pub const BLACK: Rgba8 = Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn new_opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, Self::BASE_MASK as u8)
    }

    /// Fixed-point multiply, `a * b / 255` with rounding.
    #[inline]
    pub fn multiply(a: u8, b: u8) -> u8 {
        let t: u32 = a as u32 * b as u32 + Self::BASE_MSB;
        (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT) as u8
    }

    /// Interpolate from p to q by a.
    #[inline]
    pub fn lerp(p: u8, q: u8, a: u8) -> u8 {
        let t = (q as i32 - p as i32) * a as i32 + Self::BASE_MSB as i32 - (p > q) as i32;
        (p as i32 + (((t >> Self::BASE_SHIFT) + t) >> Self::BASE_SHIFT)) as u8
    }

    /// Parse a CSS brush color, falling back to opaque black.
    pub fn parse_css(s: &str) -> Self {
        Self::try_parse_css(s).unwrap_or(Self::BLACK)
    }

    pub fn try_parse_css(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Self::default());
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        let args = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |p: &str| -> Option<u8> {
            let v: f64 = p.parse().ok()?;
            Some(iround(v.clamp(0.0, 255.0)) as u8)
        };
        let alpha = match parts.get(3) {
            Some(p) => {
                let v: f64 = p.parse().ok()?;
                iround(v.clamp(0.0, 1.0) * 255.0) as u8
            }
            None => 255,
        };
        Some(Self::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

fn parse_hex(hex: &str) -> Option<Rgba8> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba8::new_opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba8::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba8::new_opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba8::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}
