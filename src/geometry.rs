//! Geometrische Hilfsfunktionen für 2D-Kollisionserkennung auf der Ladefläche.
//!
//! Dieses Modul bietet Funktionen zur Überprüfung von Überschneidungen zwischen
//! platzierten Kisten, zur Abstandsberechnung zwischen Rechtecken und zum
//! Einrasten von Positionen auf ein Raster.

use crate::model::CargoBox;
use crate::types::{BoundingBox, Point2};

/// Prüft, ob zwei Kisten sich auf der Ladefläche überschneiden.
///
/// Verwendet Axis-Aligned Bounding Box (AABB) Kollisionserkennung mit halboffenen
/// Intervallen: Kisten, die sich nur an einer Kante berühren, überschneiden sich NICHT.
///
/// # Parameter
/// * `a` - Erste Kiste
/// * `b` - Zweite Kiste
///
/// # Rückgabewert
/// `true` wenn sich die Kisten überschneiden, sonst `false`
pub fn intersects(a: &CargoBox, b: &CargoBox) -> bool {
    a.bounds().intersects(&b.bounds())
}

/// Berechnet die Überlappung zweier Intervalle in einer Dimension.
///
/// # Parameter
/// * `a1` - Start des ersten Intervalls
/// * `a2` - Ende des ersten Intervalls
/// * `b1` - Start des zweiten Intervalls
/// * `b2` - Ende des zweiten Intervalls
///
/// # Rückgabewert
/// Länge der Überlappung, mindestens 0.0
///
/// # Beispiel
/// ```
/// use stowplan::geometry::overlap_1d;
///
/// let overlap = overlap_1d(0.0, 5.0, 3.0, 8.0);
/// assert_eq!(overlap, 2.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Abstand zwischen zwei Intervallen in einer Dimension.
///
/// Liefert 0.0, wenn sich die Intervalle überlappen oder berühren.
pub fn gap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (b1 - a2).max(a1 - b2).max(0.0)
}

/// Berechnet den freien Abstand (nicht den Mittelpunktabstand) zwischen zwei Rechtecken.
///
/// Pro Achse wird `max(0, max(bMin - aMax, aMin - bMax))` gebildet, die beiden
/// Achsen werden euklidisch kombiniert.
///
/// # Rückgabewert
/// Abstand in mm, 0.0 bei Berührung oder Überschneidung
pub fn clearance(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let dx = gap_1d(a.x1, a.x2, b.x1, b.x2);
    let dy = gap_1d(a.y1, a.y2, b.y1, b.y2);
    (dx * dx + dy * dy).sqrt()
}

/// Berechnet die Überlappungsfläche zweier Rechtecke.
pub fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
    overlap_1d(a.x1, a.x2, b.x1, b.x2) * overlap_1d(a.y1, a.y2, b.y1, b.y2)
}

/// Rastet einen Wert auf das nächste Vielfache der Rasterweite ein.
///
/// # Parameter
/// * `value` - Rohwert in mm
/// * `resolution` - Rasterweite in mm (Werte <= 0 lassen den Wert unverändert)
pub fn snap_to_grid(value: f64, resolution: f64) -> f64 {
    if resolution <= 0.0 {
        return value;
    }
    (value / resolution).round() * resolution
}

/// Rastet beide Achsen eines Punktes unabhängig voneinander ein.
pub fn snap_point(point: Point2, resolution: f64) -> Point2 {
    Point2::new(
        snap_to_grid(point.x, resolution),
        snap_to_grid(point.y, resolution),
    )
}

/// Prüft, ob ein Punkt innerhalb einer Kiste liegt (Ränder eingeschlossen).
pub fn point_inside(point: Point2, cargo: &CargoBox) -> bool {
    cargo.bounds().contains_point(&point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(id: &str, length: f64, width: f64, x: f64, y: f64) -> CargoBox {
        let mut cargo = CargoBox::new(id, length, width, 100.0, None).unwrap();
        cargo.move_to(x, y);
        cargo
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = placed("A", 100.0, 100.0, 0.0, 0.0);
        let b = placed("B", 100.0, 100.0, 150.0, 0.0);
        assert!(!intersects(&a, &b));
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = placed("A", 100.0, 100.0, 0.0, 0.0);
        let b = placed("B", 100.0, 100.0, 100.0, 0.0);
        let c = placed("C", 100.0, 100.0, 0.0, 100.0);
        assert!(!intersects(&a, &b));
        assert!(!intersects(&a, &c));
    }

    #[test]
    fn strictly_overlapping_boxes_intersect() {
        let a = placed("A", 100.0, 100.0, 0.0, 0.0);
        let b = placed("B", 100.0, 100.0, 99.0, 99.0);
        assert!(intersects(&a, &b));
        assert!(intersects(&b, &a));
    }

    #[test]
    fn clearance_uses_edges_not_centers() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let right = BoundingBox::new(130.0, 0.0, 200.0, 100.0);
        let diagonal = BoundingBox::new(130.0, 140.0, 200.0, 200.0);
        let touching = BoundingBox::new(100.0, 50.0, 200.0, 100.0);

        assert!((clearance(&a, &right) - 30.0).abs() < 1e-9);
        assert!((clearance(&a, &diagonal) - 50.0).abs() < 1e-9);
        assert_eq!(clearance(&a, &touching), 0.0);
    }

    #[test]
    fn snapping_rounds_to_nearest_multiple() {
        assert_eq!(snap_to_grid(104.0, 10.0), 100.0);
        assert_eq!(snap_to_grid(106.0, 10.0), 110.0);
        assert_eq!(snap_to_grid(103.0, 5.0), 105.0);
        assert_eq!(snap_to_grid(103.4, 1.0), 103.0);
        assert_eq!(snap_to_grid(-14.0, 10.0), -10.0);
        assert_eq!(snap_to_grid(42.0, 0.0), 42.0);
        assert_eq!(
            snap_point(Point2::new(12.0, 27.0), 10.0),
            Point2::new(10.0, 30.0)
        );
    }

    #[test]
    fn overlap_helpers() {
        assert_eq!(overlap_1d(0.0, 10.0, 20.0, 30.0), 0.0);
        assert_eq!(gap_1d(0.0, 10.0, 20.0, 30.0), 10.0);
        assert_eq!(gap_1d(20.0, 30.0, 0.0, 10.0), 10.0);
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(overlap_area(&a, &b), 25.0);
    }

    #[test]
    fn point_inside_includes_edges() {
        let a = placed("A", 100.0, 50.0, 10.0, 10.0);
        assert!(point_inside(Point2::new(110.0, 60.0), &a));
        assert!(!point_inside(Point2::new(111.0, 60.0), &a));
    }
}
