//! End-to-end scenarios across the model, the engine and the workspace.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::interaction::{
    DragOutcome, InteractionConfig, PlacementEngine, PlacementEvent, SwapOutcome, SwapPolicy,
};
use crate::model::{CargoBox, Container};
use crate::optimizer::{PlacementConfig, PlacementProgress, place_all};
use crate::project::{Project, sample_boxes};
use crate::spatial_grid::SpatialGrid;
use crate::types::{BoundingBox, Point2};

fn cargo_at(id: &str, length: f64, width: f64, weight: f64, x: f64, y: f64) -> CargoBox {
    let mut cargo = CargoBox::new(id, length, width, weight, None).expect("valid box");
    cargo.move_to(x, y);
    cargo
}

fn standard_container() -> Container {
    Container::new("Scenario", Container::DEFAULT_LENGTH, Container::DEFAULT_WIDTH)
        .expect("valid container")
}

fn recorder(engine: &mut PlacementEngine) -> Rc<RefCell<Vec<PlacementEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

#[test]
fn third_box_fits_below_the_first_row() {
    let mut container = standard_container();
    assert!(container.add_box(cargo_at("BOX001", 1200.0, 800.0, 450.0, 0.0, 0.0)));
    assert!(container.add_box(cargo_at("BOX002", 1000.0, 600.0, 320.0, 1200.0, 0.0)));

    let below = cargo_at("BOX003", 1500.0, 1000.0, 680.0, 0.0, 800.0);
    assert!(container.can_place_box(&below, false));

    let on_top = cargo_at("BOX003", 1500.0, 1000.0, 680.0, 0.0, 0.0);
    assert!(!container.can_place_box(&on_top, false));

    assert_eq!(
        container.find_placement_position(&on_top),
        Some((2200.0, 0.0))
    );
}

#[test]
fn first_box_lands_in_the_corner_of_an_empty_container() {
    let container = standard_container();
    let cargo = CargoBox::new("BOX001", 1200.0, 800.0, 450.0, None).expect("valid box");
    assert_eq!(container.find_placement_position(&cargo), Some((0.0, 0.0)));
}

#[test]
fn centred_load_is_balanced_and_lopsided_load_is_not() {
    let mut centred = standard_container();
    let (length, width) = (1000.0, 1000.0);
    let x = (Container::DEFAULT_LENGTH - length) / 2.0;
    let y = (Container::DEFAULT_WIDTH - width) / 2.0;
    assert!(centred.add_box(cargo_at("MID", length, width, 600.0, x, y)));
    let report = centred.calculate_weight_balance();
    assert_eq!(report.lr_torque, 0.0);
    assert_eq!(report.fr_torque, 0.0);
    assert!(report.is_balanced);

    let mut lopsided = standard_container();
    assert!(lopsided.add_box(cargo_at("L1", 1000.0, 500.0, 1000.0, 0.0, 0.0)));
    assert!(lopsided.add_box(cargo_at("L2", 1000.0, 500.0, 1000.0, 1000.0, 0.0)));
    let report = lopsided.calculate_weight_balance();
    assert_eq!(report.left_weight, 2000.0);
    assert_eq!(report.front_weight, 2000.0);
    assert!(report.lr_torque > report.lr_torque_limit);
    assert!(!report.is_balanced);
}

#[test]
fn grid_queries_match_an_exhaustive_scan() {
    let mut container = standard_container();
    for (idx, cargo) in sample_boxes().into_iter().enumerate() {
        let x = (idx % 5) as f64 * 2000.0;
        let y = (idx / 5) as f64 * 1150.0;
        assert!(container.add_box(cargo_at(
            &cargo.id,
            cargo.length.min(1900.0),
            cargo.width.min(1100.0),
            cargo.weight,
            x,
            y
        )));
    }

    let grid = SpatialGrid::from_container(&container, 1000.0);
    assert!(grid.is_consistent());

    let regions = [
        BoundingBox::new(0.0, 0.0, 500.0, 500.0),
        BoundingBox::new(1800.0, 900.0, 4200.0, 1400.0),
        BoundingBox::new(9000.0, 1500.0, 11900.0, 2300.0),
    ];
    for region in regions {
        let mut indexed: Vec<String> = grid
            .query(&region)
            .into_iter()
            .filter(|id| container.get(id).is_some_and(|b| b.bounds().intersects(&region)))
            .collect();
        indexed.sort();
        let mut scanned: Vec<String> = container
            .boxes()
            .iter()
            .filter(|b| b.bounds().intersects(&region))
            .map(|b| b.id.clone())
            .collect();
        scanned.sort();
        assert_eq!(indexed, scanned);
    }
}

#[test]
fn swap_feasibility_is_symmetric() {
    let mut container = standard_container();
    assert!(container.add_box(cargo_at("A", 1000.0, 1000.0, 100.0, 0.0, 0.0)));
    assert!(container.add_box(cargo_at("B", 1200.0, 1000.0, 200.0, 1020.0, 0.0)));
    assert!(container.add_box(cargo_at("C", 500.0, 500.0, 50.0, 2500.0, 0.0)));
    let engine = PlacementEngine::new(container);

    for (a, b) in [("A", "B"), ("A", "C"), ("B", "C")] {
        assert_eq!(engine.can_swap(a, b), engine.can_swap(b, a));
    }
}

#[test]
fn strict_swap_keeps_the_floor_valid() {
    let mut container = standard_container();
    assert!(container.add_box(cargo_at("A", 1000.0, 1000.0, 100.0, 0.0, 0.0)));
    assert!(container.add_box(cargo_at("B", 1000.0, 1000.0, 200.0, 1000.0, 0.0)));
    let mut engine = PlacementEngine::new(container);

    let outcome = engine
        .swap_with_policy("A", "B", SwapPolicy::Strict)
        .expect("both boxes exist");
    assert_eq!(outcome, SwapOutcome::Swapped);
    assert_eq!(
        engine.container().position_of("A"),
        Some(Point2::new(1000.0, 0.0))
    );
    assert!(engine.container().find_overlaps().is_empty());
}

#[test]
fn indexed_and_exhaustive_engines_agree_on_drag_outcomes() {
    let build = || {
        let mut container = standard_container();
        assert!(container.add_box(cargo_at("A", 1000.0, 1000.0, 100.0, 0.0, 0.0)));
        assert!(container.add_box(cargo_at("B", 1000.0, 1000.0, 100.0, 3000.0, 0.0)));
        assert!(container.add_box(cargo_at("C", 800.0, 800.0, 100.0, 1500.0, 1300.0)));
        container
    };
    let mut indexed = PlacementEngine::new(build());
    let mut exhaustive = PlacementEngine::new(build()).without_index();
    assert!(indexed.grid().is_some());
    assert!(exhaustive.grid().is_none());

    let now = Instant::now();
    let moves = [
        (523.0, 17.0),
        (1960.0, 3.0),
        (2100.0, 40.0),
        (1480.0, 1250.0),
        (-300.0, 0.0),
    ];
    for engine in [&mut indexed, &mut exhaustive] {
        engine.begin_drag("A", now).expect("box exists");
    }
    for (dx, dy) in moves {
        let a = indexed.drag_by(dx, dy, now).expect("drag active");
        let b = exhaustive.drag_by(dx, dy, now).expect("drag active");
        assert_eq!(a, b, "outcomes differ for delta ({}, {})", dx, dy);
    }
    let a = indexed.end_drag(now).expect("drag active");
    let b = exhaustive.end_drag(now).expect("drag active");
    assert_eq!(a.to, b.to);
    assert_eq!(indexed.container(), exhaustive.container());
    assert!(indexed.container().find_overlaps().is_empty());
}

#[test]
fn drag_notifications_are_throttled_but_the_end_is_always_reported() {
    let mut container = standard_container();
    assert!(container.add_box(cargo_at("A", 1000.0, 1000.0, 100.0, 0.0, 0.0)));
    let config = InteractionConfig::builder()
        .notify_interval(Duration::from_millis(100))
        .build();
    let mut engine = PlacementEngine::with_config(container, config);
    let events = recorder(&mut engine);

    let start = Instant::now();
    engine.begin_drag("A", start).expect("box exists");
    for (offset_ms, dx) in [(0, 200.0), (20, 400.0), (60, 600.0), (90, 800.0), (150, 1000.0)] {
        let outcome = engine
            .drag_by(dx, 0.0, start + Duration::from_millis(offset_ms))
            .expect("drag active");
        assert!(matches!(outcome, DragOutcome::Valid(_)));
    }
    let summary = engine
        .end_drag(start + Duration::from_millis(160))
        .expect("drag active");
    assert!(summary.moved);
    assert_eq!(summary.to, Point2::new(1000.0, 0.0));

    let events = events.borrow();
    let dragged = events
        .iter()
        .filter(|e| matches!(e, PlacementEvent::Dragged { .. }))
        .count();
    assert_eq!(dragged, 2);
    assert!(matches!(
        events.last(),
        Some(PlacementEvent::DragEnded { .. })
    ));
}

#[test]
fn cancelled_drag_returns_the_box_to_its_anchor() {
    let mut container = standard_container();
    assert!(container.add_box(cargo_at("A", 1000.0, 1000.0, 100.0, 100.0, 100.0)));
    let mut engine = PlacementEngine::new(container);
    let now = Instant::now();

    engine.begin_drag("A", now).expect("box exists");
    engine.drag_by(2000.0, 500.0, now).expect("drag active");
    let anchor = engine.cancel_drag().expect("drag active");

    assert_eq!(anchor, Point2::new(100.0, 100.0));
    assert_eq!(engine.container().position_of("A"), Some(anchor));
    assert!(!engine.is_dragging());
}

#[test]
fn auto_placement_reports_every_box_once() {
    let boxes = sample_boxes();
    let total = boxes.len();
    let mut events = Vec::new();
    let result = place_all(
        standard_container(),
        boxes,
        PlacementConfig::default(),
        |event| events.push(event.clone()),
    );

    assert_eq!(events.len(), total + 1);
    assert!(matches!(
        events.last(),
        Some(PlacementProgress::Finished { .. })
    ));
    assert_eq!(result.placed_count() + result.unplaced_count(), total);
    assert!(result.container.find_overlaps().is_empty());
    assert!(result.container.out_of_bounds().is_empty());
}

#[test]
fn project_round_trips_through_a_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("plan.json");

    let mut project = Project::new("Roundtrip");
    project.set_pending(sample_boxes()).expect("unique sample ids");
    project
        .place_all_pending(0, PlacementConfig::default())
        .expect("container exists");
    let second = project
        .add_container(Some("Overflow"), 6000.0, 2300.0)
        .expect("valid container");
    assert_eq!(second, 1);
    project.save(&path).expect("saved");

    let loaded = Project::load(&path).expect("loaded");
    assert_eq!(loaded, project);
    assert_eq!(loaded.summary(), project.summary());
    assert!(loaded.validate().is_ok());
}
