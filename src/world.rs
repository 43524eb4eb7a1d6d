use glam::Vec2;

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;
use tracing::trace;

use crate::api::{NarrowphaseApi, WorldApi};
use crate::error::{CollisionError, Result};
use crate::movement::BoxView;
use crate::narrowphase::Narrowphase;
use crate::tags::{Tag, TagSet};
use crate::types::*;

/// Inclusive cell bounds `(ix0, iy0, ix1, iy1)` covered by a rectangle.
type CellRange = (i32, i32, i32, i32);

/// Boxes covering more cells than this stay out of the grid; every query
/// checks them directly.
const MAX_FILED_CELLS: u64 = 1024;

/// Floor for `WorldConfig::cell_size`.
const MIN_CELL_SIZE: f32 = 1e-5;

/// Persistent box world indexed by a sparse uniform grid.
///
/// The grid always reflects the current bounds of every live box: every
/// operation that changes bounds re-files the box before returning.
pub struct World<P> {
    pub cfg: WorldConfig,

    boxes: SlotMap<BoxId, BoxEntry<P>>,
    next_serial: u64,

    // Uniform grid: cell coord -> boxes whose bounds touch that cell
    grid: HashMap<(i32, i32), Vec<BoxId>>,
    // Boxes too large to file cell by cell
    oversized: Vec<BoxId>,
}

pub(crate) struct BoxEntry<P> {
    pub(crate) bounds: Rect,
    pub(crate) tags: TagSet,
    pub(crate) payload: P,
    /// Creation order; the deterministic tie-break key.
    pub(crate) serial: u64,
}

impl<P> BoxEntry<P> {
    pub(crate) fn view(&self, id: BoxId) -> BoxView<'_, P> {
        BoxView {
            id,
            bounds: self.bounds,
            tags: &self.tags,
            payload: &self.payload,
        }
    }
}

impl<P> WorldApi<P> for World<P> {
    fn new(cfg: WorldConfig) -> Self {
        Self {
            cfg,
            boxes: SlotMap::with_key(),
            next_serial: 0,
            grid: HashMap::new(),
            oversized: Vec::new(),
        }
    }

    fn create(&mut self, x: f32, y: f32, w: f32, h: f32, payload: P) -> Result<BoxId> {
        let bounds = Rect::new(x, y, w, h);
        if !bounds.is_valid() {
            return Err(CollisionError::InvalidGeometry {
                reason: "box position must be finite and its size finite and non-negative",
            });
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        let id = self.boxes.insert(BoxEntry {
            bounds,
            tags: TagSet::new(),
            payload,
            serial,
        });
        let cells = self.cell_range(&bounds);
        self.file(id, cells);
        trace!(?id, ?bounds, "box created");
        Ok(id)
    }

    fn remove(&mut self, id: BoxId) -> Result<P> {
        let entry = self.boxes.remove(id).ok_or(CollisionError::DetachedBox(id))?;
        let cells = self.cell_range(&entry.bounds);
        self.unfile(id, cells);
        trace!(?id, "box removed");
        Ok(entry.payload)
    }

    fn contains(&self, id: BoxId) -> bool {
        self.boxes.contains_key(id)
    }

    fn len(&self) -> usize {
        self.boxes.len()
    }

    fn get(&self, id: BoxId) -> Result<BoxView<'_, P>> {
        Ok(self.entry(id)?.view(id))
    }

    fn bounds(&self, id: BoxId) -> Result<Rect> {
        Ok(self.entry(id)?.bounds)
    }

    fn payload(&self, id: BoxId) -> Result<&P> {
        Ok(&self.entry(id)?.payload)
    }

    fn payload_mut(&mut self, id: BoxId) -> Result<&mut P> {
        Ok(&mut self.entry_mut(id)?.payload)
    }

    fn tags(&self, id: BoxId) -> Result<&TagSet> {
        Ok(&self.entry(id)?.tags)
    }

    fn add_tags<T: Tag>(&mut self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<()> {
        self.entry_mut(id)?.tags.extend(tags);
        Ok(())
    }

    fn remove_tags<T: Tag>(
        &mut self,
        id: BoxId,
        tags: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        let entry = self.entry_mut(id)?;
        for tag in tags {
            entry.tags.remove(tag);
        }
        Ok(())
    }

    fn has_any_tag<T: Tag>(&self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<bool> {
        let wanted: TagSet = tags.into_iter().collect();
        Ok(self.entry(id)?.tags.has_any(&wanted))
    }

    fn has_all_tags<T: Tag>(&self, id: BoxId, tags: impl IntoIterator<Item = T>) -> Result<bool> {
        let wanted: TagSet = tags.into_iter().collect();
        Ok(self.entry(id)?.tags.has_all(&wanted))
    }

    fn teleport(&mut self, id: BoxId, pos: Vec2) -> Result<()> {
        let size = self.entry(id)?.bounds.size;
        self.set_bounds(id, Rect { pos, size })
    }

    fn set_bounds(&mut self, id: BoxId, bounds: Rect) -> Result<()> {
        if !bounds.is_valid() {
            return Err(CollisionError::InvalidGeometry {
                reason: "box position must be finite and its size finite and non-negative",
            });
        }
        let entry = self.entry_mut(id)?;
        let previous = entry.bounds;
        entry.bounds = bounds;
        self.update(id, &previous);
        Ok(())
    }

    fn query(&self, region: &Rect) -> Vec<BoxId> {
        if !region.is_valid() {
            return Vec::new();
        }
        let mut out = self.candidates(region);
        out.retain(|&id| Narrowphase::intersects(&self.boxes[id].bounds, region));
        out
    }

    fn query_point(&self, p: Vec2) -> Vec<BoxId> {
        if !p.is_finite() {
            return Vec::new();
        }
        let cs = self.cell_size();
        let filed = self.grid.get(&self.world_to_cell(p, cs)).into_iter().flatten();
        let mut out: Vec<BoxId> = filed
            .chain(&self.oversized)
            .copied()
            .filter(|&id| Narrowphase::contains_point(&self.boxes[id].bounds, p))
            .collect();
        out.sort_by_key(|&id| self.boxes[id].serial);
        out
    }

    fn query_segment(&self, a: Vec2, b: Vec2) -> Vec<SegmentHit> {
        if !a.is_finite() || !b.is_finite() {
            return Vec::new();
        }
        let mut out: Vec<(u64, SegmentHit)> = Vec::new();
        for id in self.segment_candidates(a, b) {
            let entry = &self.boxes[id];
            if let Some(span) = Narrowphase::segment(a, b, &entry.bounds) {
                out.push((
                    entry.serial,
                    SegmentHit {
                        id,
                        enter: span.enter,
                        exit: span.exit,
                        normal: span.normal,
                    },
                ));
            }
        }
        out.sort_by(|x, y| x.1.enter.total_cmp(&y.1.enter).then(x.0.cmp(&y.0)));
        out.into_iter().map(|(_, hit)| hit).collect()
    }
}

impl<P> Default for World<P> {
    fn default() -> Self {
        <Self as WorldApi<P>>::new(WorldConfig::default())
    }
}

impl<P> World<P> {
    pub(crate) fn entry(&self, id: BoxId) -> Result<&BoxEntry<P>> {
        self.boxes.get(id).ok_or(CollisionError::DetachedBox(id))
    }

    fn entry_mut(&mut self, id: BoxId) -> Result<&mut BoxEntry<P>> {
        self.boxes.get_mut(id).ok_or(CollisionError::DetachedBox(id))
    }

    /// Live boxes in creation order.
    pub fn ids(&self) -> Vec<BoxId> {
        let mut ids: Vec<BoxId> = self.boxes.keys().collect();
        ids.sort_by_key(|&id| self.boxes[id].serial);
        ids
    }

    /// Coarse broad-phase candidates for `region`: every box filed in a cell the
    /// region touches plus every oversized box, de-duplicated and in creation
    /// order. May contain boxes that do not actually overlap the region; never
    /// misses one that does. Cost is bounded by the occupied cells, not by the
    /// region's extent.
    pub(crate) fn candidates(&self, region: &Rect) -> Vec<BoxId> {
        let range = self.cell_range(region);
        let mut found = Candidates::default();
        if cell_count(range) > self.grid.len() as u64 {
            // Fewer occupied cells than covered ones: scan those instead.
            for (&cell, list) in &self.grid {
                if in_range(cell, range) {
                    found.extend(list);
                }
            }
        } else {
            let (ix0, iy0, ix1, iy1) = range;
            for iy in iy0..=iy1 {
                for ix in ix0..=ix1 {
                    if let Some(list) = self.grid.get(&(ix, iy)) {
                        found.extend(list);
                    }
                }
            }
        }
        found.extend(&self.oversized);
        self.by_serial(found.out)
    }

    /// Candidates for the segment `a -> b`: the grid cells along it when that
    /// walk is shorter than the occupied cell count, the occupied cells within
    /// its bounding range otherwise.
    fn segment_candidates(&self, a: Vec2, b: Vec2) -> Vec<BoxId> {
        let cs = self.cell_size();
        let start = self.world_to_cell(a, cs);
        let end = self.world_to_cell(b, cs);
        let mut found = Candidates::default();
        if walk_len(start, end) >= self.grid.len() as u64 {
            let range = self.cell_range(&Rect::from_min_max(a.min(b), a.max(b)));
            for (&cell, list) in &self.grid {
                if in_range(cell, range) {
                    found.extend(list);
                }
            }
        } else {
            for cell in self.segment_cells(a, b) {
                if let Some(list) = self.grid.get(&cell) {
                    found.extend(list);
                }
            }
        }
        found.extend(&self.oversized);
        self.by_serial(found.out)
    }

    fn by_serial(&self, mut ids: Vec<BoxId>) -> Vec<BoxId> {
        ids.sort_by_key(|&id| self.boxes[id].serial);
        ids
    }

    /// Re-file `id` after its bounds changed from `previous`. Only cells that
    /// entered or left its coverage are touched.
    fn update(&mut self, id: BoxId, previous: &Rect) {
        let current = self.boxes[id].bounds;
        let old = self.cell_range(previous);
        let new = self.cell_range(&current);
        if old == new {
            return;
        }
        if cell_count(old) > MAX_FILED_CELLS || cell_count(new) > MAX_FILED_CELLS {
            self.unfile(id, old);
            self.file(id, new);
            return;
        }
        for iy in old.1..=old.3 {
            for ix in old.0..=old.2 {
                if !in_range((ix, iy), new) {
                    self.remove_from_cell(id, (ix, iy));
                }
            }
        }
        for iy in new.1..=new.3 {
            for ix in new.0..=new.2 {
                if !in_range((ix, iy), old) {
                    self.grid.entry((ix, iy)).or_default().push(id);
                }
            }
        }
    }

    fn cell_size(&self) -> f32 {
        self.cfg.cell_size.max(MIN_CELL_SIZE)
    }

    fn cell_range(&self, r: &Rect) -> CellRange {
        let cs = self.cell_size();
        let (ix0, iy0) = self.world_to_cell(r.min(), cs);
        let (ix1, iy1) = self.world_to_cell(r.max(), cs);
        (ix0, iy0, ix1, iy1)
    }

    fn world_to_cell(&self, p: Vec2, cs: f32) -> (i32, i32) {
        ((p.x / cs).floor() as i32, (p.y / cs).floor() as i32)
    }

    fn file(&mut self, id: BoxId, cells: CellRange) {
        if cell_count(cells) > MAX_FILED_CELLS {
            self.oversized.push(id);
        } else {
            self.insert_cells(id, cells);
        }
    }

    fn unfile(&mut self, id: BoxId, cells: CellRange) {
        if cell_count(cells) > MAX_FILED_CELLS {
            self.oversized.retain(|&b| b != id);
        } else {
            self.remove_cells(id, cells);
        }
    }

    fn insert_cells(&mut self, id: BoxId, (ix0, iy0, ix1, iy1): CellRange) {
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                self.grid.entry((ix, iy)).or_default().push(id);
            }
        }
    }

    fn remove_cells(&mut self, id: BoxId, (ix0, iy0, ix1, iy1): CellRange) {
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                self.remove_from_cell(id, (ix, iy));
            }
        }
    }

    fn remove_from_cell(&mut self, id: BoxId, cell: (i32, i32)) {
        if let Some(list) = self.grid.get_mut(&cell) {
            list.retain(|&b| b != id);
            if list.is_empty() {
                self.grid.remove(&cell);
            }
        }
    }

    /// Grid cells visited by the segment `a -> b`, in order (2D DDA).
    fn segment_cells(&self, a: Vec2, b: Vec2) -> Vec<(i32, i32)> {
        let cs = self.cell_size();
        let dir = b - a;
        let mut cell = self.world_to_cell(a, cs);
        let end = self.world_to_cell(b, cs);

        let step_x = if dir.x > 0.0 { 1 } else if dir.x < 0.0 { -1 } else { 0 };
        let step_y = if dir.y > 0.0 { 1 } else if dir.y < 0.0 { -1 } else { 0 };
        let next_boundary = |c: i32, step: i32| -> f32 {
            if step > 0 { (c as f32 + 1.0) * cs } else { c as f32 * cs }
        };
        let mut t_max_x = if step_x != 0 {
            (next_boundary(cell.0, step_x) - a.x) / dir.x
        } else {
            f32::INFINITY
        };
        let mut t_max_y = if step_y != 0 {
            (next_boundary(cell.1, step_y) - a.y) / dir.y
        } else {
            f32::INFINITY
        };
        let t_delta_x = if step_x != 0 { cs / dir.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { cs / dir.y.abs() } else { f32::INFINITY };

        let steps = walk_len(cell, end);
        let mut out = vec![cell];
        for _ in 0..steps {
            // Never step past the end cell on an axis, whatever rounding says.
            let along_x = if cell.0 == end.0 {
                false
            } else if cell.1 == end.1 {
                true
            } else {
                t_max_x < t_max_y
            };
            if along_x {
                cell.0 += step_x;
                t_max_x += t_delta_x;
            } else {
                cell.1 += step_y;
                t_max_y += t_delta_y;
            }
            out.push(cell);
        }
        out
    }

    /// Return debug/perf stats for the current grid.
    pub fn debug_stats(&self) -> WorldStats {
        WorldStats {
            boxes: self.boxes.len(),
            cells: self.grid.len(),
            cell_entries: self.grid.values().map(Vec::len).sum(),
            oversized: self.oversized.len(),
            max_cell_occupancy: self.grid.values().map(Vec::len).max().unwrap_or(0),
        }
    }
}

fn in_range((ix, iy): (i32, i32), (ix0, iy0, ix1, iy1): CellRange) -> bool {
    ix >= ix0 && ix <= ix1 && iy >= iy0 && iy <= iy1
}

fn cell_count((ix0, iy0, ix1, iy1): CellRange) -> u64 {
    let w = (i64::from(ix1) - i64::from(ix0) + 1) as u64;
    let h = (i64::from(iy1) - i64::from(iy0) + 1) as u64;
    w.saturating_mul(h)
}

/// Cell steps a 4-connected walk takes from `a` to `b`.
fn walk_len(a: (i32, i32), b: (i32, i32)) -> u64 {
    (i64::from(b.0) - i64::from(a.0)).unsigned_abs() + (i64::from(b.1) - i64::from(a.1)).unsigned_abs()
}

/// De-duplicating collector for broad-phase results.
#[derive(Default)]
struct Candidates {
    seen: HashSet<BoxId>,
    out: Vec<BoxId>,
}

impl<'a> Extend<&'a BoxId> for Candidates {
    fn extend<I: IntoIterator<Item = &'a BoxId>>(&mut self, ids: I) {
        for &id in ids {
            if self.seen.insert(id) {
                self.out.push(id);
            }
        }
    }
}
