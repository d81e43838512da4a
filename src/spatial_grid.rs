//! Uniform grid index over the container floor.
//!
//! Divides the floor into square cells and records which keys overlap which
//! cells. Queries return a candidate superset; callers do the exact
//! rectangle check.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::model::{BoxId, Container};
use crate::types::BoundingBox;

/// Default cell edge length in mm.
pub const DEFAULT_CELL_SIZE: f64 = 1000.0;

/// Upper bound on the number of cells a grid allocates.
pub const MAX_CELLS: usize = 1 << 20;

/// Spatial grid keyed by `K` (box ids in the placement engine).
#[derive(Clone, Debug)]
pub struct SpatialGrid<K = BoxId>
where
    K: Eq + Hash + Clone,
{
    width: f64,
    height: f64,
    cell_size: f64,
    cols: usize,
    rows: usize,
    /// Flat array of cells, indexed by `row * cols + col`.
    cells: Vec<HashSet<K>>,
    /// Cells each key occupies.
    object_cells: HashMap<K, Vec<usize>>,
}

impl<K> SpatialGrid<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty grid covering `width × height`.
    ///
    /// A non-positive or non-finite `cell_size` falls back to [`DEFAULT_CELL_SIZE`].
    /// The grid always has at least one cell per axis. If the floor would need more
    /// than [`MAX_CELLS`] cells, the cell size is doubled until it fits.
    pub fn new(width: f64, height: f64, cell_size: f64) -> Self {
        let requested = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        let (cell_size, cols, rows) = fit_cells(width, height, requested);
        if cell_size > requested {
            log::debug!(
                "grid cell size raised from {} to {} for a {}x{} floor",
                requested,
                cell_size,
                width,
                height
            );
        }
        let mut cells = Vec::with_capacity(cols * rows);
        cells.resize_with(cols * rows, HashSet::new);
        Self {
            width,
            height,
            cell_size,
            cols,
            rows,
            cells,
            object_cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// `(cols, rows)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Floor extent covered by the grid.
    pub fn extent(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.object_cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_cells.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.object_cells.contains_key(key)
    }

    /// Indexes `key` under every cell overlapped by `bbox`.
    ///
    /// A key that is already present has its previous footprint replaced.
    pub fn insert(&mut self, key: K, bbox: BoundingBox) {
        self.remove(&key);
        let (c0, r0, c1, r1) = self.cell_range(&bbox);
        let mut occupied = Vec::with_capacity((c1 - c0 + 1) * (r1 - r0 + 1));
        for row in r0..=r1 {
            for col in c0..=c1 {
                let idx = row * self.cols + col;
                self.cells[idx].insert(key.clone());
                occupied.push(idx);
            }
        }
        self.object_cells.insert(key, occupied);
    }

    /// Drops `key` from the index. Unknown keys are ignored.
    pub fn remove(&mut self, key: &K) {
        if let Some(occupied) = self.object_cells.remove(key) {
            for idx in occupied {
                self.cells[idx].remove(key);
            }
        }
    }

    /// Moves `key` to a new footprint.
    pub fn update(&mut self, key: K, bbox: BoundingBox) {
        self.remove(&key);
        self.insert(key, bbox);
    }

    /// Keys in all cells overlapped by `bbox`.
    pub fn query(&self, bbox: &BoundingBox) -> HashSet<K> {
        let (c0, r0, c1, r1) = self.cell_range(bbox);
        self.collect_cells(c0, r0, c1, r1)
    }

    /// Keys whose cells lie within `ceil(distance / cell_size)` cells of `key`'s
    /// footprint, excluding `key` itself. Empty for unknown keys.
    pub fn nearby_objects(&self, key: &K, distance: f64) -> HashSet<K> {
        let Some(occupied) = self.object_cells.get(key) else {
            return HashSet::new();
        };
        if occupied.is_empty() {
            return HashSet::new();
        }

        let mut min_col = usize::MAX;
        let mut min_row = usize::MAX;
        let mut max_col = 0;
        let mut max_row = 0;
        for &idx in occupied {
            let (col, row) = (idx % self.cols, idx / self.cols);
            min_col = min_col.min(col);
            min_row = min_row.min(row);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }

        let reach = (distance.max(0.0) / self.cell_size).ceil() as usize;
        let c0 = min_col.saturating_sub(reach);
        let r0 = min_row.saturating_sub(reach);
        let c1 = (max_col + reach).min(self.cols - 1);
        let r1 = (max_row + reach).min(self.rows - 1);

        let mut found = self.collect_cells(c0, r0, c1, r1);
        found.remove(key);
        found
    }

    /// Empties the grid while keeping its dimensions.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.object_cells.clear();
    }

    /// Checks that the forward cells and the reverse map describe the same index.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.object_cells.iter().all(|(key, occupied)| {
            occupied
                .iter()
                .all(|&idx| idx < self.cells.len() && self.cells[idx].contains(key))
        });
        let reverse_ok = self.cells.iter().enumerate().all(|(idx, cell)| {
            cell.iter().all(|key| {
                self.object_cells
                    .get(key)
                    .is_some_and(|occupied| occupied.contains(&idx))
            })
        });
        forward_ok && reverse_ok
    }

    fn collect_cells(&self, c0: usize, r0: usize, c1: usize, r1: usize) -> HashSet<K> {
        let mut found = HashSet::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                found.extend(self.cells[row * self.cols + col].iter().cloned());
            }
        }
        found
    }

    /// Inclusive cell range `(col_start, row_start, col_end, row_end)` for a
    /// rectangle, clamped to the grid.
    fn cell_range(&self, bbox: &BoundingBox) -> (usize, usize, usize, usize) {
        let col = |v: f64| clamp_cell(v, self.cell_size, self.cols);
        let row = |v: f64| clamp_cell(v, self.cell_size, self.rows);
        let (c0, c1) = (col(bbox.x1.min(bbox.x2)), col(bbox.x1.max(bbox.x2)));
        let (r0, r1) = (row(bbox.y1.min(bbox.y2)), row(bbox.y1.max(bbox.y2)));
        (c0, r0, c1, r1)
    }
}

impl SpatialGrid<BoxId> {
    /// Builds a grid over the container floor holding all of its boxes.
    pub fn from_container(container: &Container, cell_size: f64) -> Self {
        let mut grid = Self::new(container.length, container.width, cell_size);
        for cargo in container.boxes() {
            grid.insert(cargo.id.clone(), cargo.bounds());
        }
        log::debug!(
            "rebuilt spatial grid for '{}': {} boxes in {}x{} cells",
            container.name,
            grid.len(),
            grid.cols,
            grid.rows
        );
        grid
    }
}

/// Smallest cell size (requested size times a power of two) whose grid fits [`MAX_CELLS`].
fn fit_cells(width: f64, height: f64, requested: f64) -> (f64, usize, usize) {
    let mut cell_size = requested;
    loop {
        let cols = axis_cells(width, cell_size);
        let rows = axis_cells(height, cell_size);
        match cols.checked_mul(rows) {
            Some(count) if count <= MAX_CELLS => return (cell_size, cols, rows),
            _ => cell_size *= 2.0,
        }
    }
}

fn axis_cells(extent: f64, cell_size: f64) -> usize {
    if extent > 0.0 && extent.is_finite() {
        ((extent / cell_size).ceil() as usize).max(1)
    } else {
        1
    }
}

fn clamp_cell(value: f64, cell_size: f64, count: usize) -> usize {
    let cell = (value / cell_size).floor();
    if cell.is_nan() || cell <= 0.0 {
        0
    } else {
        (cell as usize).min(count - 1)
    }
}
