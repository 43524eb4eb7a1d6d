use glam::Vec2;

use crate::error::Result;
use crate::movement::BoxView;
use crate::tags::{Tag, TagSet};
use crate::types::*;

/// Public API contract for the persistent box world.
pub trait WorldApi<P> {
    /// Construct an empty world with the given configuration.
    fn new(cfg: WorldConfig) -> Self
    where
        Self: Sized;

    // --- Box lifecycle -----------------------------------------------------

    /// Allocate and index a new box with its minimum corner at `(x, y)`.
    /// Fails with `InvalidGeometry` on non-finite input or negative size.
    fn create(&mut self, x: f32, y: f32, w: f32, h: f32, payload: P) -> Result<BoxId>;

    /// Deindex the box and hand back its payload. Removing twice fails.
    fn remove(&mut self, id: BoxId) -> Result<P>;

    fn contains(&self, id: BoxId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Accessors ---------------------------------------------------------

    fn get(&self, id: BoxId) -> Result<BoxView<'_, P>>;

    fn bounds(&self, id: BoxId) -> Result<Rect>;

    fn payload(&self, id: BoxId) -> Result<&P>;

    fn payload_mut(&mut self, id: BoxId) -> Result<&mut P>;

    fn tags(&self, id: BoxId) -> Result<&TagSet>;

    // --- Tags --------------------------------------------------------------

    fn add_tags<T: Tag>(&mut self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<()>;

    fn remove_tags<T: Tag>(&mut self, id: BoxId, tags: impl IntoIterator<Item = T>)
    -> Result<()>;

    fn has_any_tag<T: Tag>(&self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<bool>;

    fn has_all_tags<T: Tag>(&self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<bool>;

    // --- Placement ---------------------------------------------------------

    /// Relocate the box without any collision check, then reindex it.
    fn teleport(&mut self, id: BoxId, pos: Vec2) -> Result<()>;

    /// Replace position and size at once, then reindex.
    fn set_bounds(&mut self, id: BoxId, bounds: Rect) -> Result<()>;

    // --- Queries -----------------------------------------------------------

    /// Every live box whose area overlaps `region` with positive area.
    fn query(&self, region: &Rect) -> Vec<BoxId>;

    /// Every live box whose half-open area `[min, max)` contains `p`.
    fn query_point(&self, p: Vec2) -> Vec<BoxId>;

    /// Boxes crossed by the segment `a -> b`, ordered by entry fraction.
    fn query_segment(&self, a: Vec2, b: Vec2) -> Vec<SegmentHit>;
}

/// Pure rectangle tests used by both the index and the simulator.
pub trait NarrowphaseApi {
    // Static tests ----------------------------------------------------------

    /// Positive-area overlap; edge contact alone does not count.
    fn intersects(a: &Rect, b: &Rect) -> bool;
    /// `inner` lies within `outer` (inclusive on edges).
    fn contains(outer: &Rect, inner: &Rect) -> bool;
    fn contains_point(r: &Rect, p: Vec2) -> bool;

    // Swept tests -----------------------------------------------------------

    /// Earliest fraction of `delta` at which `moving` starts to penetrate `target`.
    fn sweep(moving: &Rect, delta: Vec2, target: &Rect) -> Option<SweepHit>;
    /// Portion of the segment `a -> b` inside `r` (inclusive on edges).
    fn segment(a: Vec2, b: Vec2, r: &Rect) -> Option<SegmentSpan>;
}
