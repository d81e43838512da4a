//! Common types and traits for floor geometry.
//!
//! This module defines the small value types shared by the model, the spatial
//! index and the interaction engine, plus the trait abstractions that let them
//! treat boxes uniformly.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for dimension and weight comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Minimum positional change (mm) that counts as a real move at the end of a drag.
pub const MOVE_EPSILON: f64 = 0.1;

/// Represents a point or an offset on the container floor (mm).
///
/// # Examples
/// ```
/// use stowplan::types::Point2;
///
/// let position = Point2::new(100.0, 200.0);
/// let footprint = Point2::new(1200.0, 800.0);
/// let center = position + footprint * 0.5;
/// assert_eq!(center, Point2::new(700.0, 600.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates the origin.
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Calculates the Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Checks whether both axes differ from `other` by at most `tolerance`.
    #[inline]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Point2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl From<(f64, f64)> for Point2 {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

impl From<Point2> for (f64, f64) {
    #[inline]
    fn from(point: Point2) -> Self {
        point.as_tuple()
    }
}

/// Axis-aligned rectangle `(x1, y1, x2, y2)` on the container floor.
///
/// Intervals are half-open: rectangles that only share an edge do not intersect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from its corner coordinates.
    #[inline]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a bounding box from a position and a footprint.
    #[inline]
    pub fn from_position_and_size(position: Point2, size: Point2) -> Self {
        Self::new(
            position.x,
            position.y,
            position.x + size.x,
            position.y + size.y,
        )
    }

    /// Checks if two bounding boxes intersect with a non-empty interior.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.x2 <= other.x1 || self.x1 >= other.x2 || self.y2 <= other.y1 || self.y1 >= other.y2)
    }

    /// Checks if a point lies inside or on the border of the box.
    #[inline]
    pub fn contains_point(&self, point: &Point2) -> bool {
        self.x1 <= point.x && point.x <= self.x2 && self.y1 <= point.y && point.y <= self.y2
    }

    /// Checks if `other` lies completely within this box.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Grows the box by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(
            self.x1 - margin,
            self.y1 - margin,
            self.x2 + margin,
            self.y2 + margin,
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Trait for objects with a rectangular footprint.
pub trait Dimensional {
    /// Returns the effective footprint `(length along X, width along Y)`.
    fn footprint(&self) -> Point2;

    /// Calculates the footprint area.
    fn footprint_area(&self) -> f64 {
        let size = self.footprint();
        size.x * size.y
    }
}

/// Trait for objects with a position on the floor.
pub trait Positioned {
    /// Returns the position (top-left corner reference).
    fn position(&self) -> Point2;
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight(&self) -> f64;
}

/// Validation functions shared by the model constructors.
pub mod validation {

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates a weight.
    pub fn validate_weight(value: f64) -> Result<(), String> {
        if value.is_nan() {
            return Err("Weight must not be NaN".to_string());
        }
        if value.is_infinite() {
            return Err("Weight must not be infinite".to_string());
        }
        if value <= 0.0 {
            return Err(format!("Weight must be positive, got: {}", value));
        }
        Ok(())
    }

    /// Validates a position coordinate (must be finite, may be negative).
    pub fn validate_coordinate(value: f64, name: &str) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{} must be a finite number, got: {}", name, value));
        }
        Ok(())
    }
}

/// Center of mass calculation helper.
///
/// Accumulates weighted positions for center of mass calculation.
#[derive(Clone, Debug, Default)]
pub struct CenterOfMassCalculator {
    weighted_x: f64,
    weighted_y: f64,
    total_weight: f64,
}

impl CenterOfMassCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a weighted point.
    pub fn add_point(&mut self, x: f64, y: f64, weight: f64) {
        self.weighted_x += x * weight;
        self.weighted_y += y * weight;
        self.total_weight += weight;
    }

    /// Total weight accumulated so far.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Calculates the center of mass.
    ///
    /// # Returns
    /// `Some((x, y))` for a valid center of mass, `None` if no weight is present
    pub fn compute(&self) -> Option<(f64, f64)> {
        if self.total_weight <= 0.0 {
            None
        } else {
            Some((
                self.weighted_x / self.total_weight,
                self.weighted_y / self.total_weight,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_operations() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(4.0, 6.0);

        assert_eq!(a + b, Point2::new(5.0, 8.0));
        assert_eq!(b - a, Point2::new(3.0, 4.0));
        assert_eq!(a * 2.0, Point2::new(2.0, 4.0));
        assert!((a.distance_to(&b) - 5.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_bounding_box_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_bounding_box_touching_edges_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let right = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        let below = BoundingBox::new(0.0, 10.0, 10.0, 20.0);
        let corner = BoundingBox::new(10.0, 10.0, 20.0, 20.0);

        assert!(!a.intersects(&right));
        assert!(!a.intersects(&below));
        assert!(!a.intersects(&corner));
    }

    #[test]
    fn test_bounding_box_contains() {
        let floor = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        assert!(floor.contains(&BoundingBox::new(0.0, 0.0, 100.0, 50.0)));
        assert!(!floor.contains(&BoundingBox::new(-1.0, 0.0, 10.0, 10.0)));
        assert!(floor.contains_point(&Point2::new(100.0, 50.0)));
        assert_eq!(
            floor.expanded(5.0),
            BoundingBox::new(-5.0, -5.0, 105.0, 55.0)
        );
    }

    #[test]
    fn test_center_of_mass_calculator() {
        let mut calc = CenterOfMassCalculator::new();
        assert!(calc.compute().is_none());

        calc.add_point(0.0, 0.0, 10.0);
        calc.add_point(10.0, 0.0, 10.0);

        let center = calc.compute().unwrap();
        assert!((center.0 - 5.0).abs() < EPSILON_GENERAL);
        assert!((center.1 - 0.0).abs() < EPSILON_GENERAL);
        assert!((calc.total_weight() - 20.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_validation_dimension() {
        assert!(validation::validate_dimension(10.0, "Length").is_ok());
        assert!(validation::validate_dimension(0.0, "Length").is_err());
        assert!(validation::validate_dimension(-1.0, "Length").is_err());
        assert!(validation::validate_dimension(f64::NAN, "Length").is_err());
        assert!(validation::validate_dimension(f64::INFINITY, "Length").is_err());
    }

    #[test]
    fn test_validation_weight() {
        assert!(validation::validate_weight(10.0).is_ok());
        assert!(validation::validate_weight(0.0).is_err());
        assert!(validation::validate_weight(-1.0).is_err());
    }

    #[test]
    fn test_validation_coordinate() {
        assert!(validation::validate_coordinate(-25.0, "X").is_ok());
        assert!(validation::validate_coordinate(f64::NAN, "X").is_err());
    }
}
