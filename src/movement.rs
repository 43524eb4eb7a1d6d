//! Movement simulator: broad phase over the swept envelope, narrowphase sweeps,
//! per-contact response selection and bounded slide/bounce redirection.

use std::convert::Infallible;

use glam::Vec2;
use tracing::{debug, trace};

use crate::api::{NarrowphaseApi, WorldApi};
use crate::error::{CollisionError, Result, SelectorError};
use crate::narrowphase::Narrowphase;
use crate::response::Response;
use crate::tags::TagSet;
use crate::types::*;
use crate::world::World;

/// Read-only view of one box.
#[derive(Debug)]
pub struct BoxView<'a, P> {
    pub id: BoxId,
    pub bounds: Rect,
    pub tags: &'a TagSet,
    pub payload: &'a P,
}

impl<P> Clone for BoxView<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for BoxView<'_, P> {}

/// A tentative contact offered to the response selector.
#[derive(Debug)]
pub struct Collision<'a, P> {
    /// The moving box, with `bounds` at the start of the current step.
    pub mover: BoxView<'a, P>,
    pub other: BoxView<'a, P>,
    /// Impact fraction in [0,1] of the whole requested motion.
    pub toi: f32,
    /// See [`SweepHit::normal`].
    pub normal: Vec2,
    /// Motion being attempted in the current step.
    pub delta: Vec2,
    /// 0 for the requested motion, +1 for every slide/bounce redirection.
    pub depth: usize,
}

/// First contact in a step that received a blocking response.
struct Block {
    hit: SweepHit,
    touch: Rect,
    response: Response,
}

/// Motion still to be resolved, and where its hits land on the call's timeline.
struct Step {
    from: Rect,
    goal: Vec2,
    depth: usize,
    t_base: f32,
    t_span: f32,
}

impl<P> World<P> {
    /// Resolve moving `id` toward `target` (new minimum corner) without
    /// committing anything. `select` decides how each contact is treated;
    /// `None` means the contact imposes no constraint and is not recorded.
    pub fn simulate<F>(&self, id: BoxId, target: Vec2, mut select: F) -> Result<Movement>
    where
        F: FnMut(&Collision<'_, P>) -> Option<Response>,
    {
        self.try_simulate(id, target, |c| Ok::<_, Infallible>(select(c)))
    }

    /// Like [`simulate`](Self::simulate), with a selector that can fail. The
    /// first error aborts the call.
    pub fn try_simulate<F, E>(&self, id: BoxId, target: Vec2, mut select: F) -> Result<Movement>
    where
        F: FnMut(&Collision<'_, P>) -> Result<Option<Response>, E>,
        E: Into<SelectorError>,
    {
        let origin = self.entry(id)?.bounds;
        if !target.is_finite() {
            return Err(CollisionError::InvalidGeometry {
                reason: "movement target must be finite",
            });
        }

        let mut hits = Vec::new();
        // Boxes already reported as pass-through in this call.
        let mut passed = Vec::new();
        let mut step = Step {
            from: origin,
            goal: target,
            depth: 0,
            t_base: 0.0,
            t_span: 1.0,
        };

        let destination = loop {
            let delta = step.goal - step.from.pos;
            if delta == Vec2::ZERO {
                break step.from.at(step.goal);
            }
            let Some(block) =
                self.first_block(id, &step, delta, &mut select, &mut hits, &mut passed)?
            else {
                break step.from.at(step.goal);
            };

            // A zero normal means the mover already penetrates: nothing to slide along.
            let redirected = if block.hit.normal == Vec2::ZERO {
                None
            } else {
                block.response.redirect(delta * (1.0 - block.hit.toi), block.hit.normal)
            };
            let Some(next) = redirected else {
                break block.touch;
            };
            if step.depth >= self.cfg.max_response_depth {
                debug!(?id, depth = step.depth, "response depth exhausted; stopping at contact");
                break block.touch;
            }

            step = Step {
                from: block.touch,
                goal: block.touch.pos + next,
                depth: step.depth + 1,
                t_base: step.t_base + step.t_span * block.hit.toi,
                t_span: step.t_span * (1.0 - block.hit.toi),
            };
        };

        Ok(Movement {
            origin,
            destination,
            hits,
        })
    }

    /// Simulate, then commit the destination and reindex the box.
    pub fn move_to<F>(&mut self, id: BoxId, target: Vec2, select: F) -> Result<Movement>
    where
        F: FnMut(&Collision<'_, P>) -> Option<Response>,
    {
        let movement = self.simulate(id, target, select)?;
        self.teleport(id, movement.destination.pos)?;
        Ok(movement)
    }

    /// Fallible-selector form of [`move_to`](Self::move_to). On error the box
    /// is left where it was.
    pub fn try_move_to<F, E>(&mut self, id: BoxId, target: Vec2, select: F) -> Result<Movement>
    where
        F: FnMut(&Collision<'_, P>) -> Result<Option<Response>, E>,
        E: Into<SelectorError>,
    {
        let movement = self.try_simulate(id, target, select)?;
        self.teleport(id, movement.destination.pos)?;
        Ok(movement)
    }

    /// Gather, sweep and order the contacts of one straight step, recording
    /// every answered contact up to the first blocking one.
    fn first_block<F, E>(
        &self,
        id: BoxId,
        step: &Step,
        delta: Vec2,
        select: &mut F,
        hits: &mut Vec<Hit>,
        passed: &mut Vec<BoxId>,
    ) -> Result<Option<Block>>
    where
        F: FnMut(&Collision<'_, P>) -> Result<Option<Response>, E>,
        E: Into<SelectorError>,
    {
        let mover = self.entry(id)?;
        let from = step.from;
        let envelope = from.union(&from.offset(delta));

        // Candidates arrive in creation order; the stable sort keeps it as the
        // tie-break between equal impact times.
        let mut tentative: Vec<(BoxId, SweepHit)> = self
            .candidates(&envelope)
            .into_iter()
            .filter(|&other| other != id && !passed.contains(&other))
            .filter_map(|other| {
                let bounds = self.entry(other).ok()?.bounds;
                Narrowphase::sweep(&from, delta, &bounds).map(|hit| (other, hit))
            })
            .collect();
        tentative.sort_by(|a, b| a.1.toi.total_cmp(&b.1.toi));

        for (other_id, hit) in tentative {
            let other = self.entry(other_id)?;
            let toi = (step.t_base + step.t_span * hit.toi).min(1.0);
            let collision = Collision {
                mover: BoxView {
                    bounds: from,
                    ..mover.view(id)
                },
                other: other.view(other_id),
                toi,
                normal: hit.normal,
                delta,
                depth: step.depth,
            };
            let Some(response) = select(&collision).map_err(|e| CollisionError::Selector(e.into()))?
            else {
                continue;
            };
            response.validate()?;

            let touch = touch_rect(&from, delta, &hit, &other.bounds);
            hits.push(Hit {
                other: other_id,
                normal: hit.normal,
                toi,
                touch: touch.pos,
                response,
            });
            if response.is_blocking() {
                trace!(?id, other = ?other_id, toi, ?response, "blocked");
                return Ok(Some(Block {
                    hit,
                    touch,
                    response,
                }));
            }
            passed.push(other_id);
        }
        Ok(None)
    }
}

/// Mover bounds at contact, snapped flush against `other` along the normal so
/// rounding never leaves it inside.
fn touch_rect(from: &Rect, delta: Vec2, hit: &SweepHit, other: &Rect) -> Rect {
    let mut pos = from.pos + delta * hit.toi;
    if hit.normal.x < 0.0 {
        pos.x = flush_below(other.min().x, from.size.x);
    } else if hit.normal.x > 0.0 {
        pos.x = other.max().x;
    }
    if hit.normal.y < 0.0 {
        pos.y = flush_below(other.min().y, from.size.y);
    } else if hit.normal.y > 0.0 {
        pos.y = other.max().y;
    }
    from.at(pos)
}

/// Largest start whose `start + size` does not pass `edge`. `edge - size`
/// alone can round so that adding `size` back lands past `edge`.
fn flush_below(edge: f32, size: f32) -> f32 {
    let mut start = edge - size;
    while start + size > edge {
        start = start.next_down();
    }
    start
}
