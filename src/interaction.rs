//! Interactive placement on a single container floor.
//!
//! The engine owns the active container and its spatial index and drives the
//! drag gesture:
//!
//! ```text
//! Idle -> Dragging -> (Valid | Snapped | Reverted)* -> Idle
//! ```
//!
//! Every pointer update is snapped to an adaptive grid, checked for validity and,
//! when invalid, moved next to the box it collides with or reverted to the last
//! valid position. Observers receive throttled drag notifications and an
//! unthrottled notification when a gesture ends with a real move.
//!
//! Time is always passed in by the caller so that throttling is deterministic.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::{clearance, gap_1d, overlap_1d, snap_point};
use crate::model::{BoxId, CargoBox, Container};
use crate::spatial_grid::{DEFAULT_CELL_SIZE, SpatialGrid};
use crate::types::{BoundingBox, MOVE_EPSILON, Point2, Positioned};

/// Configuration of the interactive placement behaviour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionConfig {
    /// Snap resolution close to neighbours (mm).
    pub fine_resolution: f64,
    /// Snap resolution at medium distance (mm).
    pub medium_resolution: f64,
    /// Snap resolution in open space (mm).
    pub coarse_resolution: f64,
    /// Clearance below which the fine resolution applies.
    pub fine_threshold: f64,
    /// Clearance below which the medium resolution applies.
    pub medium_threshold: f64,
    /// Margin around the candidate used to look for neighbours.
    pub proximity_radius: f64,
    /// Distance kept to the colliding box when snapping next to it.
    pub edge_offset: f64,
    /// Minimum interval between two drag notifications.
    pub notify_interval: Duration,
    /// Minimum shared edge length for two boxes to count as adjacent.
    pub adjacency_overlap_threshold: f64,
    /// Maximum gap between facing edges of adjacent boxes.
    pub adjacency_gap_threshold: f64,
    pub swap_policy: SwapPolicy,
    /// Cell size of the spatial index.
    pub grid_cell_size: f64,
    /// Use the spatial index for neighbour queries.
    pub use_index: bool,
}

impl InteractionConfig {
    pub const DEFAULT_FINE_RESOLUTION: f64 = 1.0;
    pub const DEFAULT_MEDIUM_RESOLUTION: f64 = 5.0;
    pub const DEFAULT_COARSE_RESOLUTION: f64 = 10.0;
    pub const DEFAULT_FINE_THRESHOLD: f64 = 50.0;
    pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 100.0;
    pub const DEFAULT_PROXIMITY_RADIUS: f64 = 100.0;
    pub const DEFAULT_EDGE_OFFSET: f64 = 1.0;
    pub const DEFAULT_NOTIFY_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_ADJACENCY_OVERLAP_THRESHOLD: f64 = 100.0;
    pub const DEFAULT_ADJACENCY_GAP_THRESHOLD: f64 = 50.0;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> InteractionConfigBuilder {
        InteractionConfigBuilder::default()
    }

    /// Snap resolution for the given clearance to the nearest neighbour.
    pub fn resolution_for(&self, clearance: f64) -> f64 {
        if clearance < self.fine_threshold {
            self.fine_resolution
        } else if clearance < self.medium_threshold {
            self.medium_resolution
        } else {
            self.coarse_resolution
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            fine_resolution: Self::DEFAULT_FINE_RESOLUTION,
            medium_resolution: Self::DEFAULT_MEDIUM_RESOLUTION,
            coarse_resolution: Self::DEFAULT_COARSE_RESOLUTION,
            fine_threshold: Self::DEFAULT_FINE_THRESHOLD,
            medium_threshold: Self::DEFAULT_MEDIUM_THRESHOLD,
            proximity_radius: Self::DEFAULT_PROXIMITY_RADIUS,
            edge_offset: Self::DEFAULT_EDGE_OFFSET,
            notify_interval: Self::DEFAULT_NOTIFY_INTERVAL,
            adjacency_overlap_threshold: Self::DEFAULT_ADJACENCY_OVERLAP_THRESHOLD,
            adjacency_gap_threshold: Self::DEFAULT_ADJACENCY_GAP_THRESHOLD,
            swap_policy: SwapPolicy::default(),
            grid_cell_size: DEFAULT_CELL_SIZE,
            use_index: true,
        }
    }
}

/// Builder for [`InteractionConfig`].
#[derive(Clone, Debug, Default)]
pub struct InteractionConfigBuilder {
    config: InteractionConfig,
}

impl InteractionConfigBuilder {
    /// Sets the three snap resolutions (fine, medium, coarse).
    pub fn resolutions(mut self, fine: f64, medium: f64, coarse: f64) -> Self {
        self.config.fine_resolution = fine;
        self.config.medium_resolution = medium;
        self.config.coarse_resolution = coarse;
        self
    }

    /// Sets the clearance thresholds for the fine and medium resolution.
    pub fn thresholds(mut self, fine: f64, medium: f64) -> Self {
        self.config.fine_threshold = fine;
        self.config.medium_threshold = medium;
        self
    }

    pub fn proximity_radius(mut self, radius: f64) -> Self {
        self.config.proximity_radius = radius;
        self
    }

    pub fn edge_offset(mut self, offset: f64) -> Self {
        self.config.edge_offset = offset;
        self
    }

    pub fn notify_interval(mut self, interval: Duration) -> Self {
        self.config.notify_interval = interval;
        self
    }

    pub fn adjacency_overlap_threshold(mut self, threshold: f64) -> Self {
        self.config.adjacency_overlap_threshold = threshold;
        self
    }

    pub fn adjacency_gap_threshold(mut self, threshold: f64) -> Self {
        self.config.adjacency_gap_threshold = threshold;
        self
    }

    pub fn swap_policy(mut self, policy: SwapPolicy) -> Self {
        self.config.swap_policy = policy;
        self
    }

    pub fn grid_cell_size(mut self, cell_size: f64) -> Self {
        self.config.grid_cell_size = cell_size;
        self
    }

    pub fn use_index(mut self, enabled: bool) -> Self {
        self.config.use_index = enabled;
        self
    }

    pub fn build(self) -> InteractionConfig {
        self.config
    }
}

/// How a swap treats an exchange that would leave the floor invalid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SwapPolicy {
    /// Swap only if both boxes fit at their new positions.
    #[default]
    Strict,
    /// Always swap and report the resulting conflicts.
    Permissive,
}

impl SwapPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(SwapPolicy::Strict),
            "permissive" => Some(SwapPolicy::Permissive),
            _ => None,
        }
    }
}

/// Result of a single pointer update during a drag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragOutcome {
    /// The snapped candidate is valid and now the live position.
    Valid(Point2),
    /// The candidate collided; the box was placed next to the colliding box.
    Snapped(Point2),
    /// No valid position was found; the box stays at its last valid position.
    Reverted(Point2),
}

impl DragOutcome {
    pub fn position(&self) -> Point2 {
        match self {
            DragOutcome::Valid(p) | DragOutcome::Snapped(p) | DragOutcome::Reverted(p) => *p,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DragOutcome::Valid(_))
    }
}

/// Summary of a finished drag gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSummary {
    pub id: BoxId,
    pub from: Point2,
    pub to: Point2,
    pub moved: bool,
    pub duration: Duration,
}

/// Notifications delivered to engine observers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PlacementEvent {
    DragStarted { id: BoxId, position: Point2 },
    /// Live position during a drag (throttled).
    Dragged { id: BoxId, position: Point2 },
    /// A drag ended away from where it started (never throttled).
    DragEnded { id: BoxId, from: Point2, to: Point2 },
    DragCancelled { id: BoxId, position: Point2 },
    Swapped {
        first: BoxId,
        second: BoxId,
        conflicts: usize,
    },
    Rotated { id: BoxId, rotated: bool },
    BoxAdded { id: BoxId, position: Point2 },
    BoxRemoved { id: BoxId },
}

/// Direction of a neighbour relative to a box, in screen coordinates (Y grows downward).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

/// A neighbour that shares a long enough edge with a box.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Adjacency {
    pub id: BoxId,
    pub direction: Direction,
    /// Gap between the facing edges (mm).
    pub gap: f64,
    /// Length of the shared edge (mm).
    pub shared_edge: f64,
}

/// Result of a swap request.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SwapOutcome {
    /// Both boxes fit at their new positions.
    Swapped,
    /// Swapped anyway; the listed overlaps and out-of-bounds boxes remain.
    Forced {
        #[schema(value_type = Vec<[String; 2]>)]
        conflicts: Vec<(BoxId, BoxId)>,
        out_of_bounds: Vec<BoxId>,
    },
    /// Nothing changed.
    Rejected,
}

impl SwapOutcome {
    pub fn performed(&self) -> bool {
        !matches!(self, SwapOutcome::Rejected)
    }
}

/// Errors for requests that do not fit the current engine state.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionError {
    UnknownBox(BoxId),
    NoActiveDrag,
    DragInProgress(BoxId),
}

impl fmt::Display for InteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionError::UnknownBox(id) => write!(f, "Box {} is not in the container", id),
            InteractionError::NoActiveDrag => write!(f, "No drag gesture in progress"),
            InteractionError::DragInProgress(id) => {
                write!(f, "Box {} is currently being dragged", id)
            }
        }
    }
}

impl std::error::Error for InteractionError {}

#[derive(Clone, Debug)]
struct DragState {
    id: BoxId,
    anchor: Point2,
    last_valid: Point2,
    started_at: Instant,
    last_notified: Option<Instant>,
}

type Observer = Box<dyn FnMut(&PlacementEvent)>;

/// Interactive placement engine for one container.
pub struct PlacementEngine {
    container: Container,
    grid: Option<SpatialGrid>,
    config: InteractionConfig,
    drag: Option<DragState>,
    observers: Vec<Observer>,
}

impl PlacementEngine {
    /// Creates an engine over `container` with the default configuration.
    pub fn new(container: Container) -> Self {
        Self::with_config(container, InteractionConfig::default())
    }

    pub fn with_config(container: Container, config: InteractionConfig) -> Self {
        let grid = config
            .use_index
            .then(|| SpatialGrid::from_container(&container, config.grid_cell_size));
        Self {
            container,
            grid,
            config,
            drag: None,
            observers: Vec::new(),
        }
    }

    /// Disables the spatial index; all queries scan the container.
    pub fn without_index(mut self) -> Self {
        self.config.use_index = false;
        self.grid = None;
        self
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn grid(&self) -> Option<&SpatialGrid> {
        self.grid.as_ref()
    }

    pub fn into_container(mut self) -> Container {
        self.abort_drag();
        self.container
    }

    /// Replaces the active container and rebuilds the index.
    ///
    /// A running drag is abandoned first. Returns the previous container.
    pub fn bind_container(&mut self, container: Container) -> Container {
        self.abort_drag();
        let previous = std::mem::replace(&mut self.container, container);
        if self.config.use_index {
            self.grid = Some(SpatialGrid::from_container(
                &self.container,
                self.config.grid_cell_size,
            ));
        }
        previous
    }

    /// Registers an observer for placement notifications.
    pub fn subscribe(&mut self, observer: impl FnMut(&PlacementEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged_box(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.id.as_str())
    }

    /// Adds a box at its current position and indexes it.
    pub fn add_box(&mut self, cargo: CargoBox) -> bool {
        let id = cargo.id.clone();
        let bounds = cargo.bounds();
        let position = cargo.position();
        if !self.container.add_box(cargo) {
            return false;
        }
        if let Some(grid) = self.grid.as_mut() {
            grid.insert(id.clone(), bounds);
        }
        self.emit(PlacementEvent::BoxAdded { id, position });
        true
    }

    /// Removes a box from the container and the index.
    ///
    /// Removing the box that is being dragged abandons the gesture.
    pub fn remove_box(&mut self, id: &str) -> Option<CargoBox> {
        if self.dragged_box() == Some(id) {
            self.drag = None;
        }
        let removed = self.container.remove_box(id)?;
        if let Some(grid) = self.grid.as_mut() {
            grid.remove(&removed.id);
        }
        self.emit(PlacementEvent::BoxRemoved {
            id: removed.id.clone(),
        });
        Some(removed)
    }

    /// Starts a drag gesture on `id`.
    ///
    /// # Returns
    /// The anchor position the gesture starts from.
    pub fn begin_drag(&mut self, id: &str, now: Instant) -> Result<Point2, InteractionError> {
        if let Some(active) = &self.drag {
            return Err(InteractionError::DragInProgress(active.id.clone()));
        }
        let anchor = self
            .container
            .position_of(id)
            .ok_or_else(|| InteractionError::UnknownBox(id.to_string()))?;
        self.drag = Some(DragState {
            id: id.to_string(),
            anchor,
            last_valid: anchor,
            started_at: now,
            last_notified: None,
        });
        log::debug!("drag started for {} at ({}, {})", id, anchor.x, anchor.y);
        self.emit(PlacementEvent::DragStarted {
            id: id.to_string(),
            position: anchor,
        });
        Ok(anchor)
    }

    /// Applies a pointer delta relative to the drag anchor.
    pub fn drag_by(
        &mut self,
        dx: f64,
        dy: f64,
        now: Instant,
    ) -> Result<DragOutcome, InteractionError> {
        let (id, anchor, last_valid) = match &self.drag {
            Some(state) => (state.id.clone(), state.anchor, state.last_valid),
            None => return Err(InteractionError::NoActiveDrag),
        };
        self.drag_to_inner(&id, anchor + Point2::new(dx, dy), last_valid, now)
    }

    /// Moves the dragged box towards an absolute candidate position.
    pub fn drag_to(
        &mut self,
        position: Point2,
        now: Instant,
    ) -> Result<DragOutcome, InteractionError> {
        let (id, last_valid) = match &self.drag {
            Some(state) => (state.id.clone(), state.last_valid),
            None => return Err(InteractionError::NoActiveDrag),
        };
        self.drag_to_inner(&id, position, last_valid, now)
    }

    fn drag_to_inner(
        &mut self,
        id: &str,
        raw: Point2,
        last_valid: Point2,
        now: Instant,
    ) -> Result<DragOutcome, InteractionError> {
        let cargo = self
            .container
            .get(id)
            .cloned()
            .ok_or_else(|| InteractionError::UnknownBox(id.to_string()))?;

        let resolution = self.snap_resolution(&cargo, raw);
        let candidate = snap_point(raw, resolution);

        let outcome = if self.is_free(&cargo, candidate) {
            DragOutcome::Valid(candidate)
        } else if let Some(adjacent) = self.snap_to_adjacent(&cargo, candidate, raw, last_valid) {
            DragOutcome::Snapped(adjacent)
        } else {
            DragOutcome::Reverted(last_valid)
        };

        let live = outcome.position();
        if let Some(cargo) = self.container.get_mut(id) {
            cargo.move_to(live.x, live.y);
        }

        if let DragOutcome::Reverted(_) = outcome {
            return Ok(outcome);
        }

        let notify = match self.drag.as_mut() {
            Some(state) => {
                state.last_valid = live;
                let due = state.last_notified.is_none_or(|last| {
                    now.saturating_duration_since(last) >= self.config.notify_interval
                });
                if due {
                    state.last_notified = Some(now);
                }
                due
            }
            None => false,
        };
        if notify {
            self.emit(PlacementEvent::Dragged {
                id: id.to_string(),
                position: live,
            });
        }
        Ok(outcome)
    }

    /// Finishes the gesture at the last valid position and updates the index.
    pub fn end_drag(&mut self, now: Instant) -> Result<DragSummary, InteractionError> {
        let state = self.drag.take().ok_or(InteractionError::NoActiveDrag)?;
        let cargo = self
            .container
            .get(&state.id)
            .ok_or_else(|| InteractionError::UnknownBox(state.id.clone()))?;
        let bounds = cargo.bounds();
        let to = state.last_valid;

        if let Some(grid) = self.grid.as_mut() {
            grid.update(state.id.clone(), bounds);
        }

        let moved = !state.anchor.approx_eq(&to, MOVE_EPSILON);
        log::debug!(
            "drag ended for {} at ({}, {}), moved: {}",
            state.id,
            to.x,
            to.y,
            moved
        );
        if moved {
            self.emit(PlacementEvent::DragEnded {
                id: state.id.clone(),
                from: state.anchor,
                to,
            });
        }

        Ok(DragSummary {
            id: state.id,
            from: state.anchor,
            to,
            moved,
            duration: now.saturating_duration_since(state.started_at),
        })
    }

    /// Abandons the gesture and returns the box to its anchor.
    pub fn cancel_drag(&mut self) -> Result<Point2, InteractionError> {
        let state = self.drag.take().ok_or(InteractionError::NoActiveDrag)?;
        if let Some(cargo) = self.container.get_mut(&state.id) {
            cargo.move_to(state.anchor.x, state.anchor.y);
        }
        self.emit(PlacementEvent::DragCancelled {
            id: state.id,
            position: state.anchor,
        });
        Ok(state.anchor)
    }

    fn abort_drag(&mut self) {
        if let Some(state) = self.drag.take() {
            if let Some(cargo) = self.container.get_mut(&state.id) {
                cargo.move_to(state.anchor.x, state.anchor.y);
            }
        }
    }

    /// Snap resolution from the clearance between the candidate and its nearest neighbour.
    fn snap_resolution(&self, cargo: &CargoBox, raw: Point2) -> f64 {
        let candidate = cargo.bounds_at(raw);
        let area = candidate.expanded(self.config.proximity_radius);
        let nearest = self
            .others_near(&cargo.id, &area)
            .into_iter()
            .map(|other| clearance(&candidate, &other.bounds()))
            .fold(f64::INFINITY, f64::min);
        self.config.resolution_for(nearest)
    }

    /// Other boxes whose bounds intersect `area`, in container order.
    fn others_near(&self, id: &str, area: &BoundingBox) -> Vec<&CargoBox> {
        let candidates: Option<HashSet<BoxId>> = self.grid.as_ref().map(|g| g.query(area));
        self.container
            .boxes()
            .iter()
            .filter(|other| other.id != id)
            .filter(|other| {
                candidates
                    .as_ref()
                    .is_none_or(|set| set.contains(&other.id))
            })
            .filter(|other| other.bounds().intersects(area))
            .collect()
    }

    /// In bounds and free of overlaps with every other box.
    fn is_free(&self, cargo: &CargoBox, position: Point2) -> bool {
        let bounds = cargo.bounds_at(position);
        self.container.within_bounds(&bounds) && self.others_near(&cargo.id, &bounds).is_empty()
    }

    /// Tries the four positions touching the first colliding box.
    fn snap_to_adjacent(
        &self,
        cargo: &CargoBox,
        candidate: Point2,
        raw: Point2,
        last_valid: Point2,
    ) -> Option<Point2> {
        let bounds = cargo.bounds_at(candidate);
        let collider = self.others_near(&cargo.id, &bounds).first()?.bounds();

        let offset = self.config.edge_offset;
        let length = cargo.actual_length();
        let width = cargo.actual_width();
        let options = [
            Point2::new(collider.x2 + offset, candidate.y),
            Point2::new(collider.x1 - length - offset, candidate.y),
            Point2::new(candidate.x, collider.y2 + offset),
            Point2::new(candidate.x, collider.y1 - width - offset),
        ];

        let baseline = last_valid.distance_to(&raw);
        options
            .into_iter()
            .filter(|p| p.distance_to(&raw) < baseline)
            .filter(|p| self.is_free(cargo, *p))
            .fold(None, |best: Option<Point2>, p| match best {
                Some(b) if b.distance_to(&raw) <= p.distance_to(&raw) => Some(b),
                _ => Some(p),
            })
    }

    /// Lists all boxes adjacent to `id`, in container order.
    pub fn adjacent_boxes(&self, id: &str) -> Vec<Adjacency> {
        let Some(cargo) = self.container.get(id) else {
            return Vec::new();
        };
        let nearby: Option<HashSet<BoxId>> = match (&self.grid, &self.drag) {
            (Some(grid), None) => {
                Some(grid.nearby_objects(&cargo.id, self.config.adjacency_gap_threshold))
            }
            _ => None,
        };
        self.container
            .boxes()
            .iter()
            .filter(|other| other.id != cargo.id)
            .filter(|other| nearby.as_ref().is_none_or(|set| set.contains(&other.id)))
            .filter_map(|other| adjacency_between(cargo, other, &self.config))
            .collect()
    }

    /// Checks whether `a` and `b` can exchange their positions.
    ///
    /// Both boxes must stay on the floor, must not overlap each other and must
    /// not overlap any other box. Symmetric in `a` and `b`.
    pub fn can_swap(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let (Some(first), Some(second)) = (self.container.get(a), self.container.get(b)) else {
            return false;
        };
        let first_moved = first.at(second.position());
        let second_moved = second.at(first.position());

        if !self.container.within_bounds(&first_moved.bounds())
            || !self.container.within_bounds(&second_moved.bounds())
            || first_moved.overlaps_with(&second_moved)
        {
            return false;
        }
        !self
            .container
            .boxes()
            .iter()
            .filter(|other| other.id != a && other.id != b)
            .any(|other| other.overlaps_with(&first_moved) || other.overlaps_with(&second_moved))
    }

    /// Swaps with the configured policy.
    pub fn swap(&mut self, a: &str, b: &str) -> Result<SwapOutcome, InteractionError> {
        self.swap_with_policy(a, b, self.config.swap_policy)
    }

    /// Exchanges the positions of `a` and `b`.
    pub fn swap_with_policy(
        &mut self,
        a: &str,
        b: &str,
        policy: SwapPolicy,
    ) -> Result<SwapOutcome, InteractionError> {
        if let Some(active) = &self.drag {
            return Err(InteractionError::DragInProgress(active.id.clone()));
        }
        let pos_a = self
            .container
            .position_of(a)
            .ok_or_else(|| InteractionError::UnknownBox(a.to_string()))?;
        let pos_b = self
            .container
            .position_of(b)
            .ok_or_else(|| InteractionError::UnknownBox(b.to_string()))?;
        if a == b {
            return Ok(SwapOutcome::Rejected);
        }

        let feasible = self.can_swap(a, b);
        if !feasible && policy == SwapPolicy::Strict {
            log::debug!("swap of {} and {} rejected", a, b);
            return Ok(SwapOutcome::Rejected);
        }

        for (id, target) in [(a, pos_b), (b, pos_a)] {
            if let Some(cargo) = self.container.get_mut(id) {
                cargo.move_to(target.x, target.y);
                let bounds = cargo.bounds();
                if let Some(grid) = self.grid.as_mut() {
                    grid.update(id.to_string(), bounds);
                }
            }
        }

        let outcome = if feasible {
            SwapOutcome::Swapped
        } else {
            let involved = |id: &BoxId| id == a || id == b;
            let conflicts: Vec<(BoxId, BoxId)> = self
                .container
                .find_overlaps()
                .into_iter()
                .filter(|(x, y)| involved(x) || involved(y))
                .collect();
            let out_of_bounds: Vec<BoxId> = self
                .container
                .out_of_bounds()
                .into_iter()
                .filter(involved)
                .collect();
            log::warn!(
                "forced swap of {} and {} left {} overlaps and {} boxes out of bounds",
                a,
                b,
                conflicts.len(),
                out_of_bounds.len()
            );
            SwapOutcome::Forced {
                conflicts,
                out_of_bounds,
            }
        };

        let conflicts = match &outcome {
            SwapOutcome::Forced {
                conflicts,
                out_of_bounds,
            } => conflicts.len() + out_of_bounds.len(),
            _ => 0,
        };
        self.emit(PlacementEvent::Swapped {
            first: a.to_string(),
            second: b.to_string(),
            conflicts,
        });
        Ok(outcome)
    }

    /// Rotates a box by 90° if the turned footprint stays valid.
    pub fn try_rotate(&mut self, id: &str) -> Result<bool, InteractionError> {
        if let Some(active) = &self.drag {
            return Err(InteractionError::DragInProgress(active.id.clone()));
        }
        if !self.container.contains(id) {
            return Err(InteractionError::UnknownBox(id.to_string()));
        }
        if !self.container.try_rotate_box(id) {
            return Ok(false);
        }
        let Some(cargo) = self.container.get(id) else {
            return Ok(false);
        };
        let (bounds, rotated) = (cargo.bounds(), cargo.rotated);
        if let Some(grid) = self.grid.as_mut() {
            grid.update(id.to_string(), bounds);
        }
        self.emit(PlacementEvent::Rotated {
            id: id.to_string(),
            rotated,
        });
        Ok(true)
    }

    fn emit(&mut self, event: PlacementEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}

/// Adjacency of `other` as seen from `cargo`, if they share a long enough edge.
pub fn adjacency_between(
    cargo: &CargoBox,
    other: &CargoBox,
    config: &InteractionConfig,
) -> Option<Adjacency> {
    let a = cargo.bounds();
    let b = other.bounds();
    let x_overlap = overlap_1d(a.x1, a.x2, b.x1, b.x2);
    let y_overlap = overlap_1d(a.y1, a.y2, b.y1, b.y2);
    let x_gap = gap_1d(a.x1, a.x2, b.x1, b.x2);
    let y_gap = gap_1d(a.y1, a.y2, b.y1, b.y2);

    let side_by_side = y_overlap > config.adjacency_overlap_threshold
        && x_overlap <= 0.0
        && x_gap <= config.adjacency_gap_threshold;
    let stacked = x_overlap > config.adjacency_overlap_threshold
        && y_overlap <= 0.0
        && y_gap <= config.adjacency_gap_threshold;

    let (gap, shared_edge) = if side_by_side {
        (x_gap, y_overlap)
    } else if stacked {
        (y_gap, x_overlap)
    } else {
        return None;
    };

    let dx = other.center_x() - cargo.center_x();
    let dy = other.center_y() - cargo.center_y();
    let direction = if dx.abs() >= dy.abs() {
        if dx >= 0.0 { Direction::Right } else { Direction::Left }
    } else if dy >= 0.0 {
        Direction::Down
    } else {
        Direction::Up
    };

    Some(Adjacency {
        id: other.id.clone(),
        direction,
        gap,
        shared_edge,
    })
}

/// Overlaps and out-of-bounds boxes found by the monitor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct OverlapReport {
    #[schema(value_type = Vec<[String; 2]>)]
    pub overlaps: Vec<(BoxId, BoxId)>,
    pub out_of_bounds: Vec<BoxId>,
}

impl OverlapReport {
    pub fn of(container: &Container) -> Self {
        Self {
            overlaps: container.find_overlaps(),
            out_of_bounds: container.out_of_bounds(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.overlaps.is_empty() && self.out_of_bounds.is_empty()
    }
}

/// Periodic overlap check for containers that may hold forced placements.
#[derive(Clone, Debug)]
pub struct OverlapMonitor {
    interval: Duration,
    last_poll: Option<Instant>,
}

impl OverlapMonitor {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
        }
    }

    /// Checks the container if the poll interval has elapsed.
    ///
    /// # Returns
    /// `None` if the last check is too recent.
    pub fn poll(&mut self, container: &Container, now: Instant) -> Option<OverlapReport> {
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_poll = Some(now);
        let report = OverlapReport::of(container);
        if !report.is_clean() {
            log::warn!(
                "container '{}' has {} overlapping pairs and {} boxes out of bounds",
                container.name,
                report.overlaps.len(),
                report.out_of_bounds.len()
            );
        }
        Some(report)
    }
}

impl Default for OverlapMonitor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
