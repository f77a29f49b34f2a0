//! Foundation types, rounding helpers and path command utilities.
//!
//! Everything else in the crate depends on these: the point and rectangle
//! types, the path command vocabulary understood by [`VertexSource`]
//! consumers, and the pixel-grid rounding rules.

// ============================================================================
// Rounding and conversion functions
// ============================================================================

/// Round to the nearest integer, halves away from zero.
#[inline]
pub fn iround(v: f64) -> i64 {
    if v < 0.0 {
        (v - 0.5) as i64
    } else {
        (v + 0.5) as i64
    }
}

/// Round to the nearest integer, halves toward positive infinity.
///
/// This is the rounding used when snapping stroke samples to the pixel grid
/// (`-2.5` becomes `-2`, `2.5` becomes `3`).
#[inline]
pub fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Floor toward negative infinity.
#[inline]
pub fn ifloor(v: f64) -> i64 {
    v.floor() as i64
}

/// Ceiling toward positive infinity.
#[inline]
pub fn iceil(v: f64) -> i64 {
    v.ceil() as i64
}

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two inclusive corner points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clip this rectangle to the intersection with `r`.
    /// Returns `true` if the result is a valid (non-empty) rectangle.
    pub fn clip(&mut self, r: &Self) -> bool {
        if self.x2 > r.x2 {
            self.x2 = r.x2;
        }
        if self.y2 > r.y2 {
            self.y2 = r.y2;
        }
        if self.x1 < r.x1 {
            self.x1 = r.x1;
        }
        if self.y1 < r.y1 {
            self.y1 = r.y1;
        }
        self.is_valid()
    }

    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }
}

pub type RectI = Rect<i32>;

// ============================================================================
// Path commands
// ============================================================================

pub const PATH_CMD_STOP: u32 = 0;
pub const PATH_CMD_MOVE_TO: u32 = 1;
pub const PATH_CMD_LINE_TO: u32 = 2;
pub const PATH_CMD_CURVE3: u32 = 3;

#[inline]
pub fn is_stop(c: u32) -> bool {
    c == PATH_CMD_STOP
}

#[inline]
pub fn is_move_to(c: u32) -> bool {
    c == PATH_CMD_MOVE_TO
}

#[inline]
pub fn is_line_to(c: u32) -> bool {
    c == PATH_CMD_LINE_TO
}

#[inline]
pub fn is_curve3(c: u32) -> bool {
    c == PATH_CMD_CURVE3
}

/// Returns `true` for any command carrying a coordinate.
#[inline]
pub fn is_vertex(c: u32) -> bool {
    (PATH_CMD_MOVE_TO..=PATH_CMD_CURVE3).contains(&c)
}

// ============================================================================
// Point / Vertex
// ============================================================================

/// A 2D point with `f64` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointD {
    pub x: f64,
    pub y: f64,
}

impl PointD {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A coordinate paired with the path command that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexD {
    pub x: f64,
    pub y: f64,
    pub cmd: u32,
}

impl VertexD {
    pub fn new(x: f64, y: f64, cmd: u32) -> Self {
        Self { x, y, cmd }
    }
}

// ============================================================================
// VertexSource
// ============================================================================

/// A rewindable producer of path vertices.
///
/// `vertex` writes the next coordinate and returns its command, or
/// [`PATH_CMD_STOP`] once the source is exhausted.
pub trait VertexSource {
    fn rewind(&mut self, path_id: u32);
    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(iround(2.5), 3);
        assert_eq!(iround(-2.5), -3);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(ifloor(-0.1), -1);
        assert_eq!(iceil(0.1), 1);
    }

    #[test]
    fn test_rect_clip() {
        let mut r = RectI::new(-5, -5, 50, 50);
        assert!(r.clip(&RectI::new(0, 0, 9, 9)));
        assert_eq!(r, RectI::new(0, 0, 9, 9));

        let mut outside = RectI::new(20, 20, 30, 30);
        assert!(!outside.clip(&RectI::new(0, 0, 9, 9)));
    }

    #[test]
    fn test_command_predicates() {
        assert!(is_vertex(PATH_CMD_MOVE_TO));
        assert!(is_vertex(PATH_CMD_CURVE3));
        assert!(!is_vertex(PATH_CMD_STOP));
        assert!(is_curve3(PATH_CMD_CURVE3));
        assert!(is_line_to(PATH_CMD_LINE_TO));
    }
}
