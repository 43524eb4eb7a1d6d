use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Axis overlap at or below this length counts as touching, not penetrating.
///
/// Absolute, in world units; see [`WorldConfig`](crate::WorldConfig) for the
/// coordinate range it is meant for.
pub const CONTACT_EPSILON: f32 = 1e-4;

/// Narrowphase rectangle tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn intersects(a: &Rect, b: &Rect) -> bool {
        if a.is_degenerate() || b.is_degenerate() {
            return false;
        }
        let (amin, amax) = (a.min(), a.max());
        let (bmin, bmax) = (b.min(), b.max());
        amin.x < bmax.x && bmin.x < amax.x && amin.y < bmax.y && bmin.y < amax.y
    }

    fn contains(outer: &Rect, inner: &Rect) -> bool {
        inner.min().cmpge(outer.min()).all() && inner.max().cmple(outer.max()).all()
    }

    fn contains_point(r: &Rect, p: Vec2) -> bool {
        let min = r.min();
        let max = r.max();
        p.x >= min.x && p.x < max.x && p.y >= min.y && p.y < max.y
    }

    fn sweep(moving: &Rect, delta: Vec2, target: &Rect) -> Option<SweepHit> {
        if !delta.is_finite()
            || delta.abs().max_element() < f32::EPSILON
            || moving.is_degenerate()
            || target.is_degenerate()
        {
            return None;
        }

        if penetrating(moving, target) {
            // Resting overlap is tolerated; only motion that deepens it collides.
            return (overlap_growth(moving, delta, target) > 0.0).then_some(SweepHit {
                toi: 0.0,
                normal: Vec2::ZERO,
            });
        }

        // Per-axis entry/exit times against the target expanded by the mover's
        // extents (Minkowski sum), taken from edge gaps so flush contacts
        // stay exact far from the origin.
        let (mmin, mmax) = (moving.min(), moving.max());
        let (omin, omax) = (target.min(), target.max());
        let origin = moving.center();

        let (tx0, tx1) = slab(mmin.x, mmax.x, delta.x, omin.x, omax.x)?;
        let (ty0, ty1) = slab(mmin.y, mmax.y, delta.y, omin.y, omax.y)?;

        let enter = tx0.max(ty0);
        let exit = tx1.min(ty1);
        if enter > 1.0 || exit <= enter.max(0.0) {
            return None;
        }

        // Binding axis is the one entered last; x wins ties.
        let toward = target.center() - origin;
        let (approach, normal) = if ty0 > tx0 {
            (toward.y * delta.y, Vec2::new(0.0, -delta.y.signum()))
        } else {
            (toward.x * delta.x, Vec2::new(-delta.x.signum(), 0.0))
        };
        // Starting in edge contact and moving away is not a collision.
        if approach <= 0.0 {
            return None;
        }

        Some(SweepHit {
            toi: enter.max(0.0),
            normal,
        })
    }

    fn segment(a: Vec2, b: Vec2, r: &Rect) -> Option<SegmentSpan> {
        if r.is_degenerate() {
            return None;
        }
        let d = b - a;
        let min = r.min();
        let max = r.max();
        // Slab method clamped to the segment [0,1]
        let mut tmin = 0.0f32;
        let mut tmax = 1.0f32;
        let mut n_enter = Vec2::ZERO;

        for axis in 0..2 {
            if d[axis].abs() < f32::EPSILON {
                if a[axis] < min[axis] || a[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t1 = (min[axis] - a[axis]) * inv;
            let mut t2 = (max[axis] - a[axis]) * inv;
            let mut n = -1.0;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
                n = 1.0;
            }
            if t1 > tmin {
                tmin = t1;
                n_enter = Vec2::ZERO;
                n_enter[axis] = n;
            }
            if t2 < tmax {
                tmax = t2;
            }
            if tmin > tmax {
                return None;
            }
        }

        Some(SegmentSpan {
            enter: tmin,
            exit: tmax,
            normal: n_enter,
        })
    }
}

/// Entry and exit fractions of the mover's `[amin, amax]` span against
/// `[bmin, bmax]` when moving by `d` on one axis.
fn slab(amin: f32, amax: f32, d: f32, bmin: f32, bmax: f32) -> Option<(f32, f32)> {
    if d.abs() < f32::EPSILON {
        // Parallel: only a hit if already strictly overlapping on this axis.
        if axis_overlap(amin, amax, bmin, bmax) > CONTACT_EPSILON {
            Some((f32::NEG_INFINITY, f32::INFINITY))
        } else {
            None
        }
    } else if d > 0.0 {
        Some(((bmin - amax) / d, (bmax - amin) / d))
    } else {
        Some(((bmax - amin) / d, (bmin - amax) / d))
    }
}

fn axis_overlap(amin: f32, amax: f32, bmin: f32, bmax: f32) -> f32 {
    amax.min(bmax) - amin.max(bmin)
}

fn penetrating(a: &Rect, b: &Rect) -> bool {
    let (amin, amax) = (a.min(), a.max());
    let (bmin, bmax) = (b.min(), b.max());
    axis_overlap(amin.x, amax.x, bmin.x, bmax.x) > CONTACT_EPSILON
        && axis_overlap(amin.y, amax.y, bmin.y, bmax.y) > CONTACT_EPSILON
}

/// Rate of change at t = 0 of one axis' overlap length when `a` moves by `d`.
fn axis_growth(amin: f32, amax: f32, bmin: f32, bmax: f32, d: f32) -> f32 {
    let hi = if amax < bmax {
        d
    } else if amax > bmax {
        0.0
    } else {
        d.min(0.0)
    };
    let lo = if amin > bmin {
        d
    } else if amin < bmin {
        0.0
    } else {
        d.max(0.0)
    };
    hi - lo
}

/// d(overlap area)/dt at t = 0. Each axis overlap is concave in t, so once this
/// is <= 0 the overlap never grows again along the same straight motion.
fn overlap_growth(a: &Rect, delta: Vec2, b: &Rect) -> f32 {
    let (amin, amax) = (a.min(), a.max());
    let (bmin, bmax) = (b.min(), b.max());
    let ox = axis_overlap(amin.x, amax.x, bmin.x, bmax.x);
    let oy = axis_overlap(amin.y, amax.y, bmin.y, bmax.y);
    let gx = axis_growth(amin.x, amax.x, bmin.x, bmax.x, delta.x);
    let gy = axis_growth(amin.y, amax.y, bmin.y, bmax.y, delta.y);
    gx * oy + gy * ox
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    #[test]
    fn test_intersects_basic() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::intersects(&a, &r(5.0, 5.0, 10.0, 10.0)));
        assert!(!Narrowphase::intersects(&a, &r(20.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_intersects_edge_touch_is_not_overlap() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        assert!(!Narrowphase::intersects(&a, &r(10.0, 0.0, 10.0, 10.0)));
        assert!(!Narrowphase::intersects(&a, &r(10.0, 10.0, 5.0, 5.0)));
    }

    #[test]
    fn test_degenerate_never_intersects() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        assert!(!Narrowphase::intersects(&a, &r(5.0, 5.0, 0.0, 3.0)));
        assert!(!Narrowphase::intersects(&r(5.0, 5.0, 0.0, 0.0), &a));
    }

    #[test]
    fn test_contains_and_point() {
        let outer = r(0.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::contains(&outer, &r(0.0, 0.0, 10.0, 10.0)));
        assert!(Narrowphase::contains(&outer, &r(2.0, 2.0, 1.0, 1.0)));
        assert!(!Narrowphase::contains(&outer, &r(8.0, 8.0, 5.0, 1.0)));
        assert!(Narrowphase::contains_point(&outer, Vec2::ZERO));
        assert!(!Narrowphase::contains_point(&outer, Vec2::new(10.0, 5.0)));
        assert!(!Narrowphase::contains_point(&r(1.0, 1.0, 0.0, 0.0), Vec2::ONE));
    }

    // --- Sweeps -------------------------------------------------------------

    #[test]
    fn test_sweep_head_on() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(15.0, 0.0, 10.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(20.0, 0.0), &b).unwrap();
        assert!((hit.toi - 0.25).abs() < 1e-6);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_sweep_from_above_lands() {
        let a = r(0.0, -20.0, 10.0, 10.0);
        let floor = r(-50.0, 0.0, 100.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(3.0, 20.0), &floor).unwrap();
        assert!((hit.toi - 0.5).abs() < 1e-6);
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_sweep_miss_and_short() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(15.0, 20.0, 10.0, 10.0);
        assert!(Narrowphase::sweep(&a, Vec2::new(20.0, 0.0), &b).is_none());
        let c = r(40.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::sweep(&a, Vec2::new(20.0, 0.0), &c).is_none());
    }

    #[test]
    fn test_sweep_exact_arrival_is_hit_at_one() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(30.0, 0.0, 10.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(20.0, 0.0), &b).unwrap();
        assert_eq!(hit.toi, 1.0);
    }

    #[test]
    fn test_sweep_zero_delta_and_degenerate() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(5.0, 0.0, 10.0, 10.0);
        assert!(Narrowphase::sweep(&a, Vec2::ZERO, &b).is_none());
        let flat = r(15.0, 0.0, 0.0, 10.0);
        assert!(Narrowphase::sweep(&a, Vec2::new(20.0, 0.0), &flat).is_none());
    }

    #[test]
    fn test_sweep_sliding_along_edge_is_not_contact() {
        let a = r(0.0, -10.0, 10.0, 10.0);
        let floor = r(-50.0, 0.0, 100.0, 10.0);
        assert!(Narrowphase::sweep(&a, Vec2::new(30.0, 0.0), &floor).is_none());
    }

    #[test]
    fn test_sweep_resting_then_pressing() {
        let a = r(0.0, -10.0, 10.0, 10.0);
        let floor = r(-50.0, 0.0, 100.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(2.0, 1.0), &floor).unwrap();
        assert_eq!(hit.toi, 0.0);
        assert_eq!(hit.normal, Vec2::new(0.0, -1.0));
        // Leaving the surface is free.
        assert!(Narrowphase::sweep(&a, Vec2::new(2.0, -1.0), &floor).is_none());
    }

    #[test]
    fn test_sweep_flush_far_from_origin_is_contact_not_overlap() {
        let a = r(4979.5, 0.0, 20.5, 10.0);
        let wall = r(5000.0, -100.0, 10.0, 300.0);
        assert!(Narrowphase::sweep(&a, Vec2::new(0.0, 20.0), &wall).is_none());
        let hit = Narrowphase::sweep(&a, Vec2::new(5.0, 20.0), &wall).unwrap();
        assert_eq!(hit.toi, 0.0);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_sweep_tie_prefers_x_axis() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(20.0, 20.0, 10.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(20.0, 20.0), &b).unwrap();
        assert!((hit.toi - 0.5).abs() < 1e-6);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_sweep_overlap_deepening_vs_escaping() {
        let a = r(0.0, 0.0, 10.0, 10.0);
        let b = r(5.0, 0.0, 10.0, 10.0);
        let hit = Narrowphase::sweep(&a, Vec2::new(10.0, 0.0), &b).unwrap();
        assert_eq!(hit.toi, 0.0);
        assert_eq!(hit.normal, Vec2::ZERO);
        assert!(Narrowphase::sweep(&a, Vec2::new(-10.0, 0.0), &b).is_none());
        // Sliding out along y shrinks the overlap.
        assert!(Narrowphase::sweep(&a, Vec2::new(0.0, -3.0), &b).is_none());
    }

    // --- Segments -----------------------------------------------------------

    #[test]
    fn test_segment_hit_and_miss() {
        let rect = r(-1.0, -1.0, 2.0, 2.0);
        let span = Narrowphase::segment(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), &rect).unwrap();
        assert!((span.enter - 0.25).abs() < 1e-6);
        assert!((span.exit - 0.75).abs() < 1e-6);
        assert_eq!(span.normal, Vec2::new(-1.0, 0.0));
        assert!(Narrowphase::segment(Vec2::new(-2.0, 2.0), Vec2::new(2.0, 2.0), &rect).is_none());
        assert!(Narrowphase::segment(Vec2::new(-5.0, 0.0), Vec2::new(-3.0, 0.0), &rect).is_none());
    }

    #[test]
    fn test_segment_starting_inside() {
        let rect = r(-1.0, -1.0, 2.0, 2.0);
        let span = Narrowphase::segment(Vec2::ZERO, Vec2::new(0.0, 4.0), &rect).unwrap();
        assert_eq!(span.enter, 0.0);
        assert!((span.exit - 0.25).abs() < 1e-6);
        assert_eq!(span.normal, Vec2::ZERO);
    }
}
