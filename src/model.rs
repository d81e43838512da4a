//! Data models for the container floor planner.
//!
//! This module defines the fundamental data structures of the placement core:
//! - `CargoBox`: A rectangular item with footprint, weight, position and rotation flag
//! - `Container`: The rectangular floor holding an ordered collection of boxes
//! - `BalanceReport`: The torque-based load balance of a container
//!
//! All structures implement the traits from the `types` module.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::geometry::intersects;
use crate::types::{
    BoundingBox, CenterOfMassCalculator, Dimensional, Point2, Positioned, Weighted, validation,
};

/// Stable identifier of a box. Unique within a project.
pub type BoxId = String;

/// Validation error for box and container data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidWeight(String),
    InvalidPosition(String),
    DuplicateId(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidWeight(msg) => write!(f, "Invalid weight: {}", msg),
            ValidationError::InvalidPosition(msg) => write!(f, "Invalid position: {}", msg),
            ValidationError::DuplicateId(id) => write!(f, "Duplicate box id: {}", id),
        }
    }
}

impl std::error::Error for ValidationError {}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    validation::validate_dimension(value, name).map_err(ValidationError::InvalidDimension)
}

fn validate_box_params(length: f64, width: f64, weight: f64) -> Result<(), ValidationError> {
    validate_dimension(length, "Length")?;
    validate_dimension(width, "Width")?;
    validation::validate_weight(weight).map_err(ValidationError::InvalidWeight)?;
    Ok(())
}

/// A rectangular cargo box on the container floor.
///
/// `length` and `width` refer to the un-rotated axes; `rotated` swaps the
/// effective footprint. `(x, y)` is the top-left corner of the effective
/// footprint in container coordinates (mm).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "BOX001", "length": 1200.0, "width": 800.0, "weight": 450.0,
    "height": null, "x": 0.0, "y": 0.0, "rotated": false
}))]
pub struct CargoBox {
    pub id: BoxId,
    pub length: f64,
    pub width: f64,
    pub weight: f64,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub rotated: bool,
}

impl CargoBox {
    /// Creates a new box at the origin with validation.
    ///
    /// # Parameters
    /// * `id` - Unique identifier
    /// * `length` - Length along the un-rotated X axis (mm)
    /// * `width` - Width along the un-rotated Y axis (mm)
    /// * `weight` - Weight in kg
    /// * `height` - Optional height (mm), not used for floor placement
    ///
    /// # Examples
    /// ```
    /// use stowplan::model::CargoBox;
    ///
    /// let ok = CargoBox::new("BOX001", 1200.0, 800.0, 450.0, None);
    /// assert!(ok.is_ok());
    ///
    /// let invalid = CargoBox::new("BOX002", -10.0, 800.0, 450.0, None);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        id: impl Into<BoxId>,
        length: f64,
        width: f64,
        weight: f64,
        height: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_box_params(length, width, weight)?;
        if let Some(h) = height {
            validate_dimension(h, "Height")?;
        }
        Ok(Self {
            id: id.into(),
            length,
            width,
            weight,
            height,
            x: 0.0,
            y: 0.0,
            rotated: false,
        })
    }

    /// Re-checks the invariants of a box that did not go through `new`
    /// (deserialized data).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_box_params(self.length, self.width, self.weight)?;
        if let Some(h) = self.height {
            validate_dimension(h, "Height")?;
        }
        validation::validate_coordinate(self.x, "X").map_err(ValidationError::InvalidPosition)?;
        validation::validate_coordinate(self.y, "Y").map_err(ValidationError::InvalidPosition)?;
        Ok(())
    }

    /// Effective extent along X, taking rotation into account.
    #[inline]
    pub fn actual_length(&self) -> f64 {
        if self.rotated { self.width } else { self.length }
    }

    /// Effective extent along Y, taking rotation into account.
    #[inline]
    pub fn actual_width(&self) -> f64 {
        if self.rotated { self.length } else { self.width }
    }

    /// Footprint area; independent of rotation.
    #[inline]
    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.x + self.actual_length() / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f64 {
        self.y + self.actual_width() / 2.0
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x(), self.center_y())
    }

    /// Bounding box `(x, y, x + actual_length, y + actual_width)`.
    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.x,
            self.y,
            self.x + self.actual_length(),
            self.y + self.actual_width(),
        )
    }

    /// Bounding box the box would have at another position.
    #[inline]
    pub fn bounds_at(&self, position: Point2) -> BoundingBox {
        BoundingBox::from_position_and_size(position, self.footprint())
    }

    /// Checks for overlap with another box. Touching edges do not count.
    pub fn overlaps_with(&self, other: &CargoBox) -> bool {
        intersects(self, other)
    }

    /// Every box may be turned by 90°.
    pub fn can_rotate(&self) -> bool {
        true
    }

    /// Toggles the 90° rotation.
    pub fn rotate(&mut self) {
        if self.can_rotate() {
            self.rotated = !self.rotated;
        }
    }

    /// Moves the box without any validity check.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Returns a copy of this box at another position.
    pub fn at(&self, position: Point2) -> Self {
        let mut moved = self.clone();
        moved.move_to(position.x, position.y);
        moved
    }
}

impl Dimensional for CargoBox {
    fn footprint(&self) -> Point2 {
        Point2::new(self.actual_length(), self.actual_width())
    }
}

impl Positioned for CargoBox {
    fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl Weighted for CargoBox {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl fmt::Display for CargoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Box({}, {}x{}, {}kg)",
            self.id, self.length, self.width, self.weight
        )
    }
}

/// Torque limits used to decide whether a load is balanced (kg·mm).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TorqueLimits {
    /// Limit for the net left/right (Y axis) torque.
    pub lateral: f64,
    /// Limit for the net front/rear (X axis) torque.
    pub longitudinal: f64,
}

impl TorqueLimits {
    /// 500 kg·m
    pub const DEFAULT_LATERAL: f64 = 500_000.0;
    /// 2000 kg·m
    pub const DEFAULT_LONGITUDINAL: f64 = 2_000_000.0;
}

impl Default for TorqueLimits {
    fn default() -> Self {
        Self {
            lateral: Self::DEFAULT_LATERAL,
            longitudinal: Self::DEFAULT_LONGITUDINAL,
        }
    }
}

/// Load balance of a container.
///
/// "left"/"right" are display labels for the Y axis (left = centroid below the
/// lateral center line), "front"/"rear" split the X axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceReport {
    pub left_weight: f64,
    pub right_weight: f64,
    pub front_weight: f64,
    pub rear_weight: f64,
    pub left_torque: f64,
    pub right_torque: f64,
    pub front_torque: f64,
    pub rear_torque: f64,
    /// Net lateral torque `|left_torque - right_torque|`.
    pub lr_torque: f64,
    /// Net longitudinal torque `|front_torque - rear_torque|`.
    pub fr_torque: f64,
    pub lr_torque_limit: f64,
    pub fr_torque_limit: f64,
    /// Weight-weighted centroid of the load (geometric center when empty).
    pub center_x: f64,
    pub center_y: f64,
    pub is_balanced: bool,
}

impl BalanceReport {
    fn empty(container: &Container, limits: TorqueLimits) -> Self {
        Self {
            left_weight: 0.0,
            right_weight: 0.0,
            front_weight: 0.0,
            rear_weight: 0.0,
            left_torque: 0.0,
            right_torque: 0.0,
            front_torque: 0.0,
            rear_torque: 0.0,
            lr_torque: 0.0,
            fr_torque: 0.0,
            lr_torque_limit: limits.lateral,
            fr_torque_limit: limits.longitudinal,
            center_x: container.length / 2.0,
            center_y: container.width / 2.0,
            is_balanced: true,
        }
    }

    /// Raw weight difference between the left and right halves (kg).
    pub fn lateral_weight_difference(&self) -> f64 {
        (self.left_weight - self.right_weight).abs()
    }

    /// Raw weight difference between the front and rear halves (kg).
    pub fn longitudinal_weight_difference(&self) -> f64 {
        (self.front_weight - self.rear_weight).abs()
    }

    pub fn lateral_within_limit(&self) -> bool {
        self.lr_torque <= self.lr_torque_limit
    }

    pub fn longitudinal_within_limit(&self) -> bool {
        self.fr_torque <= self.fr_torque_limit
    }

    /// Severity of the net lateral torque.
    pub fn lateral_status(&self) -> BalanceStatus {
        BalanceStatus::classify(self.lr_torque, self.lr_torque_limit)
    }

    /// Severity of the net longitudinal torque.
    pub fn longitudinal_status(&self) -> BalanceStatus {
        BalanceStatus::classify(self.fr_torque, self.fr_torque_limit)
    }

    /// Worse of the two axis severities.
    pub fn status(&self) -> BalanceStatus {
        self.lateral_status().max(self.longitudinal_status())
    }
}

/// Severity band of a net torque relative to its limit.
///
/// Ordered from harmless to critical, so `max` picks the worse band.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Ok,
    /// Above [`BalanceStatus::NEAR_LIMIT_RATIO`] of the limit.
    NearLimit,
    OverLimit,
}

impl BalanceStatus {
    pub const NEAR_LIMIT_RATIO: f64 = 0.8;

    pub fn classify(torque: f64, limit: f64) -> Self {
        if torque > limit {
            BalanceStatus::OverLimit
        } else if torque > limit * Self::NEAR_LIMIT_RATIO {
            BalanceStatus::NearLimit
        } else {
            BalanceStatus::Ok
        }
    }
}

/// A container floor with its placed boxes.
///
/// Boxes are kept in insertion order, which is also the display order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Container 1", "length": 11900.0, "width": 2300.0, "boxes": []
}))]
pub struct Container {
    pub name: String,
    pub length: f64,
    pub width: f64,
    #[serde(default)]
    boxes: Vec<CargoBox>,
}

impl Container {
    /// Standard 40ft floor length (mm).
    pub const DEFAULT_LENGTH: f64 = 11_900.0;
    /// Standard floor width (mm).
    pub const DEFAULT_WIDTH: f64 = 2_300.0;
    /// Step of the placement scan (mm).
    pub const DEFAULT_SEARCH_STEP: f64 = 50.0;

    /// Creates a new empty container with validation.
    ///
    /// # Parameters
    /// * `name` - Display name
    /// * `length` - Floor extent along X (mm)
    /// * `width` - Floor extent along Y (mm)
    pub fn new(name: impl Into<String>, length: f64, width: f64) -> Result<Self, ValidationError> {
        validate_dimension(length, "Container length")?;
        validate_dimension(width, "Container width")?;
        Ok(Self {
            name: name.into(),
            length,
            width,
            boxes: Vec::new(),
        })
    }

    /// Checks the floor dimensions and every member box.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.length, "Container length")?;
        validate_dimension(self.width, "Container width")?;
        for (idx, cargo) in self.boxes.iter().enumerate() {
            cargo.validate()?;
            if self.boxes[..idx].iter().any(|other| other.id == cargo.id) {
                return Err(ValidationError::DuplicateId(cargo.id.clone()));
            }
        }
        Ok(())
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// Sum of all box footprints.
    pub fn used_area(&self) -> f64 {
        self.boxes.iter().map(CargoBox::area).sum()
    }

    /// Used fraction of the floor (0.0 to 1.0).
    pub fn area_utilization(&self) -> f64 {
        let area = self.area();
        if area > 0.0 {
            self.used_area() / area
        } else {
            0.0
        }
    }

    /// Used fraction of the floor in percent (0.0 to 100.0).
    pub fn utilization_percent(&self) -> f64 {
        self.area_utilization() * 100.0
    }

    pub fn total_weight(&self) -> f64 {
        self.boxes.iter().map(|b| b.weight).sum()
    }

    /// Boxes in insertion order.
    pub fn boxes(&self) -> &[CargoBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.boxes.iter().any(|b| b.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&CargoBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// Mutable access for the placement engine; callers keep the invariants.
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut CargoBox> {
        self.boxes.iter_mut().find(|b| b.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<Point2> {
        self.get(id).map(Positioned::position)
    }

    /// The whole floor as a bounding box.
    pub fn floor_bounds(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.length, self.width)
    }

    /// Checks that the footprint lies within `[0, length] × [0, width]`.
    pub fn within_bounds(&self, bounds: &BoundingBox) -> bool {
        self.floor_bounds().contains(bounds)
    }

    /// Checks whether the box could lie on this floor at all, in either orientation.
    pub fn fits_floor(&self, cargo: &CargoBox) -> bool {
        let fits = |l: f64, w: f64| l <= self.length && w <= self.width;
        fits(cargo.length, cargo.width) || fits(cargo.width, cargo.length)
    }

    /// Adds a box at its current position.
    ///
    /// # Returns
    /// `true` if the box was appended; `false` (no mutation) if it would leave
    /// the floor, overlap another box or reuse an id already present.
    pub fn add_box(&mut self, cargo: CargoBox) -> bool {
        if self.contains(&cargo.id) || !self.can_place_box(&cargo, true) {
            return false;
        }
        self.boxes.push(cargo);
        true
    }

    /// Removes the box with the given id.
    ///
    /// # Returns
    /// The removed box, or `None` if it was not a member.
    pub fn remove_box(&mut self, id: &str) -> Option<CargoBox> {
        let idx = self.boxes.iter().position(|b| b.id == id)?;
        Some(self.boxes.remove(idx))
    }

    /// Checks if the box may stand at its current position.
    ///
    /// # Parameters
    /// * `cargo` - Box to check; may be a member or a candidate copy of one
    /// * `exclude_self` - Skip the member carrying the same id in the overlap scan
    pub fn can_place_box(&self, cargo: &CargoBox, exclude_self: bool) -> bool {
        if !self.within_bounds(&cargo.bounds()) {
            return false;
        }
        !self
            .boxes
            .iter()
            .filter(|existing| !(exclude_self && existing.id == cargo.id))
            .any(|existing| cargo.overlaps_with(existing))
    }

    /// Finds the first free position in row-major order (increasing `y`, then `x`).
    ///
    /// The scan moves in 50 mm steps, so positions that only exist at a finer
    /// granularity are not found. The box passed in is left untouched.
    pub fn find_placement_position(&self, cargo: &CargoBox) -> Option<(f64, f64)> {
        self.find_placement_position_with_step(cargo, Self::DEFAULT_SEARCH_STEP)
    }

    /// Like [`Container::find_placement_position`] with a custom scan step.
    pub fn find_placement_position_with_step(
        &self,
        cargo: &CargoBox,
        step: f64,
    ) -> Option<(f64, f64)> {
        if step <= 0.0 || !step.is_finite() {
            return None;
        }

        let max_y = (self.width - cargo.actual_width()).max(0.0).trunc();
        let max_x = (self.length - cargo.actual_length()).max(0.0).trunc();

        let mut candidate = cargo.clone();
        let mut row = 0u64;
        let mut y = 0.0;
        while y <= max_y {
            let mut col = 0u64;
            let mut x = 0.0;
            while x <= max_x {
                candidate.move_to(x, y);
                if self.can_place_box(&candidate, true) {
                    return Some((x, y));
                }
                col += 1;
                x = col as f64 * step;
            }
            row += 1;
            y = row as f64 * step;
        }
        None
    }

    /// Rotates a member box in place if the turned footprint is still valid.
    ///
    /// # Returns
    /// `true` if the box was rotated, `false` if it is unknown or the rotation
    /// was undone.
    pub fn try_rotate_box(&mut self, id: &str) -> bool {
        let Some(candidate) = self.get(id).map(|b| {
            let mut turned = b.clone();
            turned.rotate();
            turned
        }) else {
            return false;
        };
        if !self.can_place_box(&candidate, true) {
            return false;
        }
        if let Some(cargo) = self.get_mut(id) {
            cargo.rotate();
        }
        true
    }

    /// Load balance with the default torque limits.
    pub fn calculate_weight_balance(&self) -> BalanceReport {
        self.calculate_weight_balance_with(TorqueLimits::default())
    }

    /// Load balance based on each box's centroid and its torque around the
    /// center lines.
    ///
    /// X (length) splits front/rear, Y (width) splits left/right. Torque is
    /// weight × distance of the centroid to the respective center line.
    pub fn calculate_weight_balance_with(&self, limits: TorqueLimits) -> BalanceReport {
        if self.boxes.is_empty() {
            return BalanceReport::empty(self, limits);
        }

        let center_x_line = self.length / 2.0;
        let center_y_line = self.width / 2.0;

        let mut report = BalanceReport::empty(self, limits);
        let mut centroid = CenterOfMassCalculator::new();

        for cargo in &self.boxes {
            let cx = cargo.center_x();
            let cy = cargo.center_y();
            let fr_distance = (cx - center_x_line).abs();
            let lr_distance = (cy - center_y_line).abs();

            if cx < center_x_line {
                report.front_weight += cargo.weight;
                report.front_torque += cargo.weight * fr_distance;
            } else {
                report.rear_weight += cargo.weight;
                report.rear_torque += cargo.weight * fr_distance;
            }

            if cy < center_y_line {
                report.left_weight += cargo.weight;
                report.left_torque += cargo.weight * lr_distance;
            } else {
                report.right_weight += cargo.weight;
                report.right_torque += cargo.weight * lr_distance;
            }

            centroid.add_point(cx, cy, cargo.weight);
        }

        report.lr_torque = (report.left_torque - report.right_torque).abs();
        report.fr_torque = (report.front_torque - report.rear_torque).abs();

        if let Some((cx, cy)) = centroid.compute() {
            report.center_x = cx;
            report.center_y = cy;
        }

        report.is_balanced =
            report.lr_torque <= limits.lateral && report.fr_torque <= limits.longitudinal;
        report
    }

    /// All pairs of member boxes that overlap, in insertion order.
    pub fn find_overlaps(&self) -> Vec<(BoxId, BoxId)> {
        let mut pairs = Vec::new();
        for (i, a) in self.boxes.iter().enumerate() {
            for b in &self.boxes[i + 1..] {
                if a.overlaps_with(b) {
                    pairs.push((a.id.clone(), b.id.clone()));
                }
            }
        }
        pairs
    }

    /// Ids of member boxes that stick out of the floor.
    pub fn out_of_bounds(&self) -> Vec<BoxId> {
        self.boxes
            .iter()
            .filter(|b| !self.within_bounds(&b.bounds()))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Removes all boxes and hands them back.
    pub fn drain_boxes(&mut self) -> Vec<CargoBox> {
        std::mem::take(&mut self.boxes)
    }

    /// Empties the box collection.
    pub fn clear(&mut self) {
        self.boxes.clear();
    }
}

impl Default for Container {
    fn default() -> Self {
        Self {
            name: "Container".to_string(),
            length: Self::DEFAULT_LENGTH,
            width: Self::DEFAULT_WIDTH,
            boxes: Vec::new(),
        }
    }
}

impl Dimensional for Container {
    fn footprint(&self) -> Point2 {
        Point2::new(self.length, self.width)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Container({}, {} boxes, {:.1}% utilized)",
            self.name,
            self.boxes.len(),
            self.utilization_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON_GENERAL;

    fn cargo(id: &str, length: f64, width: f64, weight: f64) -> CargoBox {
        CargoBox::new(id, length, width, weight, None).unwrap()
    }

    fn cargo_at(id: &str, length: f64, width: f64, weight: f64, x: f64, y: f64) -> CargoBox {
        let mut b = cargo(id, length, width, weight);
        b.move_to(x, y);
        b
    }

    fn standard_container() -> Container {
        Container::new("Test", 11_900.0, 2_300.0).unwrap()
    }

    #[test]
    fn box_derived_values_follow_rotation() {
        let mut b = cargo_at("A", 1200.0, 800.0, 450.0, 100.0, 50.0);
        assert_eq!(b.actual_length(), 1200.0);
        assert_eq!(b.actual_width(), 800.0);
        assert_eq!(b.bounds(), BoundingBox::new(100.0, 50.0, 1300.0, 850.0));

        b.rotate();
        assert_eq!(b.actual_length(), 800.0);
        assert_eq!(b.actual_width(), 1200.0);
        assert_eq!(b.area(), 960_000.0);
        assert_eq!(b.center(), Point2::new(500.0, 650.0));
    }

    #[test]
    fn rotate_twice_restores_footprint() {
        let mut b = cargo("A", 1000.0, 600.0, 320.0);
        let before = (b.actual_length(), b.actual_width());
        b.rotate();
        b.rotate();
        assert_eq!((b.actual_length(), b.actual_width()), before);
        assert!(!b.rotated);
    }

    #[test]
    fn box_constructor_rejects_invalid_values() {
        assert!(matches!(
            CargoBox::new("X", 0.0, 10.0, 1.0, None),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            CargoBox::new("X", 10.0, 10.0, -1.0, None),
            Err(ValidationError::InvalidWeight(_))
        ));
        assert!(CargoBox::new("X", 10.0, 10.0, 1.0, Some(0.0)).is_err());
        assert!(Container::new("C", 0.0, 10.0).is_err());
    }

    #[test]
    fn add_box_then_can_place_is_true() {
        let mut container = standard_container();
        let b = cargo_at("A", 1200.0, 800.0, 450.0, 300.0, 200.0);
        assert!(container.add_box(b.clone()));
        assert!(container.can_place_box(&b, true));
        assert!(!container.can_place_box(&b, false));
    }

    #[test]
    fn add_box_rejects_invalid_placements_without_mutation() {
        let mut container = standard_container();
        assert!(container.add_box(cargo_at("A", 1200.0, 800.0, 450.0, 0.0, 0.0)));

        assert!(!container.add_box(cargo_at("B", 1000.0, 600.0, 320.0, 500.0, 500.0)));
        assert!(!container.add_box(cargo_at("C", 1000.0, 600.0, 320.0, 11_000.0, 0.0)));
        assert!(!container.add_box(cargo_at("D", 1000.0, 600.0, 320.0, -1.0, 0.0)));
        assert!(!container.add_box(cargo_at("A", 100.0, 100.0, 10.0, 5000.0, 0.0)));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn remove_box_by_identity() {
        let mut container = standard_container();
        container.add_box(cargo_at("A", 100.0, 100.0, 10.0, 0.0, 0.0));
        assert!(container.remove_box("missing").is_none());
        let removed = container.remove_box("A").unwrap();
        assert_eq!(removed.id, "A");
        assert!(container.is_empty());
    }

    #[test]
    fn three_box_scenario() {
        let mut container = standard_container();
        assert!(container.add_box(cargo_at("BOX001", 1200.0, 800.0, 450.0, 0.0, 0.0)));
        assert!(container.add_box(cargo_at("BOX002", 1000.0, 600.0, 320.0, 1200.0, 0.0)));

        let third = cargo_at("BOX003", 1500.0, 1000.0, 680.0, 0.0, 800.0);
        assert!(container.can_place_box(&third, true));
        assert!(!container.can_place_box(&third.at(Point2::zero()), true));
    }

    #[test]
    fn placement_search_starts_at_origin() {
        let container = standard_container();
        let b = cargo("BOX001", 1200.0, 800.0, 450.0);
        assert_eq!(container.find_placement_position(&b), Some((0.0, 0.0)));
    }

    #[test]
    fn placement_search_fills_rows_first() {
        let mut container = standard_container();
        container.add_box(cargo_at("A", 1200.0, 800.0, 450.0, 0.0, 0.0));

        let mut b = cargo("B", 1000.0, 600.0, 320.0);
        b.move_to(777.0, 333.0);
        assert_eq!(container.find_placement_position(&b), Some((1200.0, 0.0)));
        assert_eq!((b.x, b.y), (777.0, 333.0));
    }

    #[test]
    fn placement_search_reports_no_position() {
        let container = Container::new("Small", 1000.0, 1000.0).unwrap();
        let b = cargo("Big", 1200.0, 800.0, 10.0);
        assert_eq!(container.find_placement_position(&b), None);

        let mut full = Container::new("Full", 1000.0, 1000.0).unwrap();
        full.add_box(cargo_at("Filler", 1000.0, 1000.0, 10.0, 0.0, 0.0));
        assert_eq!(full.find_placement_position(&cargo("B", 10.0, 10.0, 1.0)), None);
    }

    #[test]
    fn placement_search_reaches_last_step_below_the_edge() {
        // max_y = 470, so the last scanned row is y = 450.
        let mut container = Container::new("Strip", 1000.0, 570.0).unwrap();
        container.add_box(cargo_at("Filler", 1000.0, 450.0, 10.0, 0.0, 0.0));
        let b = cargo("B", 100.0, 100.0, 1.0);
        assert_eq!(container.find_placement_position(&b), Some((0.0, 450.0)));

        let mut blocked = Container::new("Blocked", 1000.0, 570.0).unwrap();
        blocked.add_box(cargo_at("Filler", 1000.0, 460.0, 10.0, 0.0, 0.0));
        assert_eq!(blocked.find_placement_position(&b), None);
    }

    #[test]
    fn placement_search_misses_positions_off_the_step() {
        // The only gap is 1020 mm wide starting at x = 990; the 50 mm scan never hits it.
        let mut container = Container::new("Gap", 3000.0, 1000.0).unwrap();
        container.add_box(cargo_at("L", 990.0, 1000.0, 10.0, 0.0, 0.0));
        container.add_box(cargo_at("R", 990.0, 1000.0, 10.0, 2010.0, 0.0));
        let b = cargo("B", 1020.0, 1000.0, 10.0);
        assert_eq!(container.find_placement_position(&b), None);
        assert_eq!(
            container.find_placement_position_with_step(&b, 10.0),
            Some((990.0, 0.0))
        );
    }

    #[test]
    fn balance_status_bands() {
        assert_eq!(BalanceStatus::classify(0.0, 500_000.0), BalanceStatus::Ok);
        assert_eq!(BalanceStatus::classify(400_000.0, 500_000.0), BalanceStatus::Ok);
        assert_eq!(BalanceStatus::classify(400_001.0, 500_000.0), BalanceStatus::NearLimit);
        assert_eq!(BalanceStatus::classify(500_000.0, 500_000.0), BalanceStatus::NearLimit);
        assert_eq!(BalanceStatus::classify(500_001.0, 500_000.0), BalanceStatus::OverLimit);
    }

    #[test]
    fn report_status_takes_worse_axis() {
        let mut container = standard_container();
        // Centroid y = 250, 900 mm off the lateral line: 450 kg × 900 = 405 000.
        container.add_box(cargo_at("A", 1000.0, 500.0, 450.0, 5450.0, 0.0));
        let report = container.calculate_weight_balance();
        assert_eq!(report.fr_torque, 0.0);
        assert_eq!(report.longitudinal_status(), BalanceStatus::Ok);
        assert_eq!(report.lateral_status(), BalanceStatus::NearLimit);
        assert_eq!(report.status(), BalanceStatus::NearLimit);
        assert!(report.is_balanced);

        container.add_box(cargo_at("B", 1000.0, 500.0, 450.0, 6450.0, 0.0));
        let report = container.calculate_weight_balance();
        assert_eq!(report.status(), BalanceStatus::OverLimit);
        assert!(!report.is_balanced);
    }

    #[test]
    fn empty_container_is_balanced() {
        let container = standard_container();
        let report = container.calculate_weight_balance();
        assert_eq!(report.left_weight, 0.0);
        assert_eq!(report.right_weight, 0.0);
        assert_eq!(report.front_weight, 0.0);
        assert_eq!(report.rear_weight, 0.0);
        assert_eq!(report.left_torque, 0.0);
        assert_eq!(report.right_torque, 0.0);
        assert_eq!(report.front_torque, 0.0);
        assert_eq!(report.rear_torque, 0.0);
        assert!(report.is_balanced);
        assert_eq!(report.center_x, 5950.0);
        assert_eq!(report.center_y, 1150.0);
        assert_eq!(report.lr_torque_limit, 500_000.0);
        assert_eq!(report.fr_torque_limit, 2_000_000.0);
    }

    #[test]
    fn centered_box_has_zero_torque() {
        let mut container = standard_container();
        // Centroid at (5950, 1150).
        container.add_box(cargo_at("C", 1000.0, 1000.0, 600.0, 5450.0, 650.0));
        let report = container.calculate_weight_balance();
        assert_eq!(report.left_torque, 0.0);
        assert_eq!(report.right_torque, 0.0);
        assert_eq!(report.front_torque, 0.0);
        assert_eq!(report.rear_torque, 0.0);
        assert!(report.is_balanced);
        // Centroid on both center lines counts as rear/right.
        assert_eq!(report.rear_weight, 600.0);
        assert_eq!(report.right_weight, 600.0);
        assert!((report.center_x - 5950.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn heavy_boxes_on_one_side_unbalance_the_load() {
        let mut container = standard_container();
        container.add_box(cargo_at("H1", 1000.0, 800.0, 1000.0, 0.0, 0.0));
        container.add_box(cargo_at("H2", 1000.0, 800.0, 1000.0, 1000.0, 0.0));

        let report = container.calculate_weight_balance();
        // Centroid y = 400, center line 1150: 750 mm lever per box.
        assert!((report.left_torque - 1_500_000.0).abs() < EPSILON_GENERAL);
        assert_eq!(report.right_torque, 0.0);
        assert!(report.lr_torque > 500_000.0);
        assert!(!report.lateral_within_limit());
        assert!(!report.is_balanced);
        assert_eq!(report.front_weight, 2000.0);
        assert_eq!(report.lateral_weight_difference(), 2000.0);
    }

    #[test]
    fn balance_centroid_is_weight_weighted() {
        let mut container = Container::new("C", 1000.0, 1000.0).unwrap();
        container.add_box(cargo_at("A", 100.0, 100.0, 300.0, 0.0, 0.0));
        container.add_box(cargo_at("B", 100.0, 100.0, 100.0, 800.0, 0.0));
        let report = container.calculate_weight_balance();
        // (50*300 + 850*100) / 400 = 250
        assert!((report.center_x - 250.0).abs() < EPSILON_GENERAL);
        assert!((report.center_y - 50.0).abs() < EPSILON_GENERAL);
        assert!((report.front_torque - 300.0 * 450.0).abs() < EPSILON_GENERAL);
        assert!((report.rear_torque - 100.0 * 350.0).abs() < EPSILON_GENERAL);
        assert!((report.fr_torque - 100_000.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn custom_limits_are_reported() {
        let mut container = standard_container();
        container.add_box(cargo_at("A", 100.0, 100.0, 10.0, 0.0, 0.0));
        let limits = TorqueLimits {
            lateral: 1.0,
            longitudinal: 1.0,
        };
        let report = container.calculate_weight_balance_with(limits);
        assert_eq!(report.lr_torque_limit, 1.0);
        assert!(!report.is_balanced);
    }

    #[test]
    fn try_rotate_box_respects_neighbors() {
        let mut container = Container::new("C", 3000.0, 2000.0).unwrap();
        container.add_box(cargo_at("A", 1000.0, 500.0, 10.0, 0.0, 0.0));
        container.add_box(cargo_at("B", 1000.0, 500.0, 10.0, 0.0, 600.0));

        assert!(!container.try_rotate_box("A"));
        assert!(!container.get("A").unwrap().rotated);

        assert!(container.try_rotate_box("B"));
        assert!(container.get("B").unwrap().rotated);
        assert!(!container.try_rotate_box("missing"));
    }

    #[test]
    fn overlap_and_bounds_reports() {
        let mut container = Container::new("C", 1000.0, 1000.0).unwrap();
        container.add_box(cargo_at("A", 500.0, 500.0, 10.0, 0.0, 0.0));
        container.add_box(cargo_at("B", 500.0, 500.0, 10.0, 500.0, 0.0));
        assert!(container.find_overlaps().is_empty());

        container.get_mut("B").unwrap().move_to(400.0, 0.0);
        container.get_mut("A").unwrap().move_to(-10.0, 0.0);
        assert_eq!(
            container.find_overlaps(),
            vec![("A".to_string(), "B".to_string())]
        );
        assert_eq!(container.out_of_bounds(), vec!["A".to_string()]);
    }

    #[test]
    fn utilization_and_weight() {
        let mut container = Container::new("C", 1000.0, 1000.0).unwrap();
        container.add_box(cargo_at("A", 500.0, 500.0, 10.0, 0.0, 0.0));
        container.add_box(cargo_at("B", 500.0, 500.0, 15.0, 500.0, 0.0));
        assert_eq!(container.used_area(), 500_000.0);
        assert!((container.area_utilization() - 0.5).abs() < EPSILON_GENERAL);
        assert!((container.utilization_percent() - 50.0).abs() < EPSILON_GENERAL);
        assert_eq!(container.total_weight(), 25.0);
        assert_eq!(
            container.to_string(),
            "Container(C, 2 boxes, 50.0% utilized)"
        );

        container.clear();
        assert!(container.is_empty());
    }

    #[test]
    fn fits_floor_checks_both_orientations() {
        let container = Container::new("C", 1000.0, 500.0).unwrap();
        assert!(container.fits_floor(&cargo("A", 400.0, 900.0, 1.0)));
        assert!(!container.fits_floor(&cargo("B", 600.0, 1100.0, 1.0)));
    }

    #[test]
    fn container_validate_detects_duplicates() {
        let json = r#"{
            "name": "C", "length": 1000.0, "width": 1000.0,
            "boxes": [
                {"id": "A", "length": 10.0, "width": 10.0, "weight": 1.0},
                {"id": "A", "length": 10.0, "width": 10.0, "weight": 1.0, "x": 50.0}
            ]
        }"#;
        let container: Container = serde_json::from_str(json).unwrap();
        assert_eq!(
            container.validate(),
            Err(ValidationError::DuplicateId("A".to_string()))
        );
    }
}
