use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::narrowphase::Narrowphase;
use crate::response::Response;

slotmap::new_key_type! {
    /// Generational handle to a box owned by a [`World`](crate::World).
    ///
    /// Keys of removed boxes never alias a later box; using one fails with
    /// [`CollisionError::DetachedBox`](crate::CollisionError::DetachedBox).
    pub struct BoxId;
}

/// Axis-aligned rectangle: `pos` is the minimum corner, `size` the extent.
///
/// Width and height are expected to be `>= 0`; zero-area rectangles are valid
/// but never intersect anything.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            pos: min,
            size: (max - min).max(Vec2::ZERO),
        }
    }

    pub fn min(&self) -> Vec2 {
        self.pos
    }

    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        self.size * 0.5
    }

    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// True when the rectangle has no area (and therefore never collides).
    pub fn is_degenerate(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Finite position and finite, non-negative size.
    pub fn is_valid(&self) -> bool {
        self.pos.is_finite() && self.size.is_finite() && self.size.x >= 0.0 && self.size.y >= 0.0
    }

    /// Same size, translated by `delta`.
    pub fn offset(&self, delta: Vec2) -> Self {
        Self {
            pos: self.pos + delta,
            size: self.size,
        }
    }

    /// Same size, minimum corner moved to `pos`.
    pub fn at(&self, pos: Vec2) -> Self {
        Self {
            pos,
            size: self.size,
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Self {
        Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        Narrowphase::intersects(self, other)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        Narrowphase::contains(self, other)
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        Narrowphase::contains_point(self, p)
    }

    /// Area shared with `other` (0 when disjoint or merely touching).
    pub fn overlap_area(&self, other: &Rect) -> f32 {
        let lo = self.min().max(other.min());
        let hi = self.max().min(other.max());
        let ext = (hi - lo).max(Vec2::ZERO);
        ext.x * ext.y
    }
}

/// Sweep (time-of-impact) result for a moving rectangle against a static one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepHit {
    /// Fraction in [0,1] of the delta at which contact begins.
    pub toi: f32,
    /// Axis-aligned unit normal pointing from the obstacle toward the mover,
    /// opposing the motion. Zero when the mover already penetrates at t = 0.
    pub normal: Vec2,
}

/// Interval over which a segment crosses a rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentSpan {
    /// Entry fraction along the segment, clamped to >= 0.
    pub enter: f32,
    /// Exit fraction along the segment, clamped to <= 1.
    pub exit: f32,
    /// Entry normal; zero when the segment starts inside the rectangle.
    pub normal: Vec2,
}

/// One box crossed by [`WorldApi::query_segment`](crate::WorldApi::query_segment).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SegmentHit {
    pub id: BoxId,
    pub enter: f32,
    pub exit: f32,
    pub normal: Vec2,
}

/// A collision that received a response during a simulate/move call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// The box that was contacted.
    pub other: BoxId,
    /// Normal at contact (see [`SweepHit::normal`]).
    pub normal: Vec2,
    /// Impact fraction in [0,1] of the whole requested motion.
    pub toi: f32,
    /// Minimum corner of the mover at the moment of contact.
    pub touch: Vec2,
    /// What the selector answered for this contact.
    pub response: Response,
}

/// Outcome of one simulate/move call.
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub origin: Rect,
    pub destination: Rect,
    /// Contacts that received a response, ascending by `toi`.
    pub hits: Vec<Hit>,
}

impl Movement {
    /// Net displacement actually achieved.
    pub fn delta(&self) -> Vec2 {
        self.destination.pos - self.origin.pos
    }

    /// True if any recorded contact constrained the motion.
    pub fn is_blocked(&self) -> bool {
        self.hits.iter().any(|h| h.response.is_blocking())
    }

    /// True if some blocking contact had exactly this normal.
    ///
    /// In a y-down world, `blocked_by(Vec2::new(0.0, -1.0))` means "landed on
    /// something".
    pub fn blocked_by(&self, normal: Vec2) -> bool {
        self.hits
            .iter()
            .any(|h| h.response.is_blocking() && h.normal == normal)
    }

    pub fn hits_with(&self, other: BoxId) -> impl Iterator<Item = &Hit> + '_ {
        self.hits.iter().filter(move |h| h.other == other)
    }
}

/// World-level configuration.
///
/// Tolerances are absolute: [`CONTACT_EPSILON`](crate::CONTACT_EPSILON) is
/// 1e-4 world units and the smallest usable `cell_size` is 1e-5. Both assume
/// coordinates within about ±1e3 of the origin, where f32 steps stay below the
/// contact tolerance. Beyond that, contacts are still snapped exactly flush,
/// but touching/penetrating decisions are only as fine as the f32 step at that
/// magnitude (about 5e-4 at 5e3, 6e-2 at 1e6). Boxes spanning more than 1024
/// cells are kept outside the grid and checked by every query.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// Grid cell size in world units (typ. 2-4x the common box size).
    /// Clamped to at least 1e-5.
    pub cell_size: f32,
    /// Maximum number of slide/bounce redirections per call; once reached the
    /// remaining motion is resolved as a stop.
    pub max_response_depth: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            max_response_depth: 6,
        }
    }
}

/// Debug/performance statistics for the broad phase.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub boxes: usize,
    /// Occupied grid cells.
    pub cells: usize,
    /// Sum of per-cell entry counts (a box spanning k cells counts k times).
    pub cell_entries: usize,
    pub max_cell_occupancy: usize,
    /// Boxes too large to file per cell, checked by every query.
    pub oversized: usize,
}
