//! Automatische Platzierung einer Kistenliste auf einer Ladefläche.
//!
//! Dieser Modul implementiert die gierige Massenplatzierung, die der Benutzer für
//! die Liste der noch nicht platzierten Kisten auslösen kann:
//! - Große Grundflächen zuerst (dann schwer vor leicht)
//! - Erste freie Position im zeilenweisen Raster-Scan
//! - Gedrehte Ausrichtung als Rückfall
//!
//! Das Ergebnis ist nicht optimal; der Scan findet nur Positionen auf dem Raster.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{BalanceReport, CargoBox, Container, TorqueLimits};

/// Konfiguration für die automatische Platzierung.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Schrittweite des Positionsrasters in mm (kleinere Werte = genauer, aber langsamer)
    pub search_step: f64,
    /// Gedrehte Ausrichtung versuchen, wenn die aktuelle nicht passt
    pub allow_rotation: bool,
    /// Grenzwerte für die Balance-Auswertung des Ergebnisses
    pub torque_limits: TorqueLimits,
}

impl PlacementConfig {
    pub const DEFAULT_SEARCH_STEP: f64 = Container::DEFAULT_SEARCH_STEP;
    pub const DEFAULT_ALLOW_ROTATION: bool = true;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PlacementConfigBuilder {
        PlacementConfigBuilder::default()
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            search_step: Self::DEFAULT_SEARCH_STEP,
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
            torque_limits: TorqueLimits::default(),
        }
    }
}

/// Builder-Pattern für PlacementConfig.
#[derive(Clone, Debug, Default)]
pub struct PlacementConfigBuilder {
    config: PlacementConfig,
}

impl PlacementConfigBuilder {
    /// Setzt die Raster-Schrittweite.
    pub fn search_step(mut self, step: f64) -> Self {
        self.config.search_step = step;
        self
    }

    /// Erlaubt oder verbietet die gedrehte Ausrichtung.
    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.config.allow_rotation = allow;
        self
    }

    /// Setzt die Drehmoment-Grenzwerte.
    pub fn torque_limits(mut self, limits: TorqueLimits) -> Self {
        self.config.torque_limits = limits;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> PlacementConfig {
        self.config
    }
}

/// Ergebnis der automatischen Platzierung.
#[derive(Clone, Debug)]
pub struct PlacementResult {
    pub container: Container,
    pub placed: Vec<String>,
    pub unplaced: Vec<UnplacedBox>,
    pub torque_limits: TorqueLimits,
}

impl PlacementResult {
    /// Gibt an, ob alle Kisten platziert wurden.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Flächenauslastung der Ladefläche in Prozent.
    pub fn utilization_percent(&self) -> f64 {
        self.container.utilization_percent()
    }

    /// Gewichtsbalance der beladenen Fläche.
    pub fn balance(&self) -> BalanceReport {
        self.container
            .calculate_weight_balance_with(self.torque_limits)
    }
}

/// Kiste, die nicht platziert werden konnte.
#[derive(Clone, Debug)]
pub struct UnplacedBox {
    pub cargo: CargoBox,
    pub reason: UnplacedReason,
}

/// Gründe, warum eine Kiste nicht platziert werden konnte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnplacedReason {
    DimensionsExceedContainer,
    NoFreePosition,
    DuplicateId,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::DimensionsExceedContainer => "dimensions_exceed_container",
            UnplacedReason::NoFreePosition => "no_free_position",
            UnplacedReason::DuplicateId => "duplicate_id",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::DimensionsExceedContainer => {
                write!(f, "Kiste ist in keiner Ausrichtung kleiner als die Ladefläche")
            }
            UnplacedReason::NoFreePosition => {
                write!(f, "Keine freie Position auf dem Suchraster gefunden")
            }
            UnplacedReason::DuplicateId => {
                write!(f, "Eine Kiste mit dieser ID steht bereits auf der Ladefläche")
            }
        }
    }
}

/// Ereignisse während der Platzierung, um Live-Visualisierung zu ermöglichen.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PlacementProgress {
    /// Eine Kiste wurde platziert.
    BoxPlaced {
        id: String,
        x: f64,
        y: f64,
        rotated: bool,
        total_weight: f64,
        utilization_percent: f64,
    },
    /// Eine Kiste konnte nicht platziert werden.
    BoxRejected {
        id: String,
        weight: f64,
        reason_code: String,
        reason_text: String,
    },
    /// Platzierung abgeschlossen.
    Finished {
        placed: usize,
        unplaced: usize,
        utilization_percent: f64,
    },
}

/// Platziert Kisten mit der Standardkonfiguration.
///
/// # Parameter
/// * `container` - Ladefläche, bereits platzierte Kisten bleiben stehen
/// * `boxes` - Zu platzierende Kisten
///
/// # Rückgabewert
/// `PlacementResult` mit der beladenen Fläche und ggf. nicht platzierten Kisten
pub fn place_boxes(container: Container, boxes: Vec<CargoBox>) -> PlacementResult {
    place_boxes_with_config(container, boxes, PlacementConfig::default())
}

/// Wie `place_boxes`, aber mit anpassbaren Parametern.
pub fn place_boxes_with_config(
    container: Container,
    boxes: Vec<CargoBox>,
    config: PlacementConfig,
) -> PlacementResult {
    place_all(container, boxes, config, |_| {})
}

/// Platzierung mit Live-Progress Callback.
///
/// Ruft für jede Kiste genau ein Ereignis auf und zum Schluss `Finished`
/// (geeignet für SSE).
///
/// # Parameter
/// * `container` - Ladefläche
/// * `boxes` - Zu platzierende Kisten
/// * `config` - Konfigurationsparameter
/// * `on_event` - Callback für Fortschrittsereignisse
pub fn place_all(
    container: Container,
    boxes: Vec<CargoBox>,
    config: PlacementConfig,
    mut on_event: impl FnMut(&PlacementProgress),
) -> PlacementResult {
    let mut container = container;
    let mut placed = Vec::new();
    let mut unplaced = Vec::new();

    // Sortierung: große Grundfläche zuerst, dann schwer vor leicht
    let mut boxes = boxes;
    boxes.sort_by(|a, b| {
        b.area()
            .partial_cmp(&a.area())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal))
            .then_with(|| a.id.cmp(&b.id))
    });

    for cargo in boxes {
        match place_one(&mut container, cargo, &config) {
            Ok(()) => {
                let Some(stored) = container.boxes().last() else {
                    continue;
                };
                on_event(&PlacementProgress::BoxPlaced {
                    id: stored.id.clone(),
                    x: stored.x,
                    y: stored.y,
                    rotated: stored.rotated,
                    total_weight: container.total_weight(),
                    utilization_percent: container.utilization_percent(),
                });
                placed.push(stored.id.clone());
            }
            Err((cargo, reason)) => {
                log::debug!("{} rejected: {}", cargo.id, reason.code());
                on_event(&PlacementProgress::BoxRejected {
                    id: cargo.id.clone(),
                    weight: cargo.weight,
                    reason_code: reason.code().to_string(),
                    reason_text: reason.to_string(),
                });
                unplaced.push(UnplacedBox { cargo, reason });
            }
        }
    }

    on_event(&PlacementProgress::Finished {
        placed: placed.len(),
        unplaced: unplaced.len(),
        utilization_percent: container.utilization_percent(),
    });

    PlacementResult {
        container,
        placed,
        unplaced,
        torque_limits: config.torque_limits,
    }
}

/// Sucht eine Position für eine einzelne Kiste und stellt sie ab.
///
/// Versucht zuerst die aktuelle Ausrichtung, danach (falls erlaubt) die gedrehte.
///
/// # Rückgabewert
/// `Ok(())` wenn die Kiste hinzugefügt wurde, sonst die Kiste mit dem Grund
pub fn place_one(
    container: &mut Container,
    cargo: CargoBox,
    config: &PlacementConfig,
) -> Result<(), (CargoBox, UnplacedReason)> {
    if container.contains(&cargo.id) {
        return Err((cargo, UnplacedReason::DuplicateId));
    }

    let fits_as_is =
        cargo.actual_length() <= container.length && cargo.actual_width() <= container.width;
    let fits = if config.allow_rotation {
        container.fits_floor(&cargo)
    } else {
        fits_as_is
    };
    if !fits {
        return Err((cargo, UnplacedReason::DimensionsExceedContainer));
    }

    let mut cargo = cargo;
    let mut position = container.find_placement_position_with_step(&cargo, config.search_step);
    if position.is_none() && config.allow_rotation {
        cargo.rotate();
        position = container.find_placement_position_with_step(&cargo, config.search_step);
        if position.is_none() {
            cargo.rotate();
        }
    }

    match position {
        Some((x, y)) => {
            cargo.move_to(x, y);
            if container.add_box(cargo.clone()) {
                Ok(())
            } else {
                Err((cargo, UnplacedReason::NoFreePosition))
            }
        }
        None => Err((cargo, UnplacedReason::NoFreePosition)),
    }
}
