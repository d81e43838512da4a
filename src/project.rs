//! Project files and the multi-container workspace.
//!
//! A project holds any number of container floors plus a pool of pending boxes
//! that are not placed yet. Every box belongs to exactly one of them. Projects are
//! stored as pretty-printed JSON:
//!
//! ```json
//! {
//!   "project_info": { "name": "...", "version": "1.0", "created_time": "...", "description": "..." },
//!   "containers": [ { "name": "...", "length": 11900.0, "width": 2300.0, "boxes": [] } ],
//!   "pending_boxes": []
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use utoipa::ToSchema;

use crate::model::{BoxId, CargoBox, Container, ValidationError};
use crate::optimizer::{self, PlacementConfig, PlacementResult};
use crate::types::Point2;

/// Current project file format version.
pub const PROJECT_VERSION: &str = "1.0";

/// Number of auto-save files kept per directory.
pub const AUTO_SAVE_KEEP: usize = 10;

const AUTO_SAVE_PREFIX: &str = "auto_save_";
const AUTO_SAVE_SUFFIX: &str = ".json";

/// Errors while loading, saving or editing a project.
#[derive(Debug)]
pub enum ProjectError {
    Io(io::Error),
    Json(serde_json::Error),
    Invalid(ValidationError),
    UnknownContainer(usize),
    UnknownBox(BoxId),
    LastContainer,
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Io(err) => write!(f, "I/O error: {}", err),
            ProjectError::Json(err) => write!(f, "Invalid project JSON: {}", err),
            ProjectError::Invalid(err) => write!(f, "Invalid project data: {}", err),
            ProjectError::UnknownContainer(index) => write!(f, "No container at index {}", index),
            ProjectError::UnknownBox(id) => write!(f, "Unknown box: {}", id),
            ProjectError::LastContainer => write!(f, "The last container cannot be closed"),
        }
    }
}

impl std::error::Error for ProjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectError::Io(err) => Some(err),
            ProjectError::Json(err) => Some(err),
            ProjectError::Invalid(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ProjectError {
    fn from(err: io::Error) -> Self {
        ProjectError::Io(err)
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(err: serde_json::Error) -> Self {
        ProjectError::Json(err)
    }
}

impl From<ValidationError> for ProjectError {
    fn from(err: ValidationError) -> Self {
        ProjectError::Invalid(err)
    }
}

/// Descriptive header of a project file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectInfo {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub description: String,
}

fn default_project_name() -> String {
    "Untitled project".to_string()
}

fn default_version() -> String {
    PROJECT_VERSION.to_string()
}

impl ProjectInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            version: default_version(),
            created_time: String::new(),
            description: "Container floor plan".to_string(),
        }
    }
}

/// On-disk shape of a project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectFile {
    pub project_info: ProjectInfo,
    pub containers: Vec<Container>,
    pub pending_boxes: Vec<CargoBox>,
}

/// Counts and weights across the whole project.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ProjectSummary {
    pub containers: usize,
    pub placed_boxes: usize,
    pub pending_boxes: usize,
    pub placed_weight: f64,
    pub pending_weight: f64,
    pub average_utilization_percent: f64,
}

/// Weight filter for the pending pool.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeightClass {
    #[default]
    All,
    /// Below 500 kg.
    Light,
    /// 500 kg up to and including 1000 kg.
    Medium,
    /// Above 1000 kg.
    Heavy,
}

impl WeightClass {
    pub const LIGHT_BELOW: f64 = 500.0;
    pub const HEAVY_ABOVE: f64 = 1000.0;

    pub fn contains(&self, weight: f64) -> bool {
        match self {
            WeightClass::All => true,
            WeightClass::Light => weight < Self::LIGHT_BELOW,
            WeightClass::Medium => (Self::LIGHT_BELOW..=Self::HEAVY_ABOVE).contains(&weight),
            WeightClass::Heavy => weight > Self::HEAVY_ABOVE,
        }
    }
}

/// Count and total weight of a set of boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct BoxStats {
    pub count: usize,
    pub total_weight: f64,
}

impl BoxStats {
    pub fn of<'a>(boxes: impl IntoIterator<Item = &'a CargoBox>) -> Self {
        boxes.into_iter().fold(Self::default(), |stats, cargo| Self {
            count: stats.count + 1,
            total_weight: stats.total_weight + cargo.weight,
        })
    }
}

/// Case-insensitive match on the id or on the `"<length>x<width>"` label.
fn matches_search(cargo: &CargoBox, needle: &str) -> bool {
    needle.is_empty()
        || cargo.id.to_lowercase().contains(needle)
        || format!("{}x{}", cargo.length, cargo.width).contains(needle)
}

/// Workspace of container floors and the pending pool.
#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub info: ProjectInfo,
    containers: Vec<Container>,
    pending: Vec<CargoBox>,
}

impl Project {
    /// Creates a project with a single standard container.
    pub fn new(name: impl Into<String>) -> Self {
        let mut project = Self {
            info: ProjectInfo::new(name),
            containers: Vec::new(),
            pending: Vec::new(),
        };
        let mut first = Container::default();
        first.name = project.next_container_name();
        project.containers.push(first);
        project
    }

    /// Builds a workspace from file data after validating it.
    pub fn from_file(file: ProjectFile) -> Result<Self, ProjectError> {
        let project = Self {
            info: file.project_info,
            containers: file.containers,
            pending: file.pending_boxes,
        };
        project.validate()?;
        Ok(project)
    }

    pub fn to_file(&self) -> ProjectFile {
        ProjectFile {
            project_info: self.info.clone(),
            containers: self.containers.clone(),
            pending_boxes: self.pending.clone(),
        }
    }

    /// Reads and validates a project file.
    ///
    /// Overlapping or out-of-bounds boxes are kept as stored and only logged.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let file: ProjectFile = serde_json::from_str(&raw)?;
        let project = Self::from_file(file)?;

        for container in &project.containers {
            for (a, b) in container.find_overlaps() {
                log::warn!("{}: boxes {} and {} overlap", container.name, a, b);
            }
            for id in container.out_of_bounds() {
                log::warn!("{}: box {} lies outside the floor", container.name, id);
            }
        }
        log::debug!(
            "loaded project '{}' from {} with {} containers",
            project.info.name,
            path.display(),
            project.containers.len()
        );
        Ok(project)
    }

    /// Writes the project atomically: the JSON goes to a temporary file in the
    /// target directory which then replaces the target.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.to_file())?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(path).map_err(|err| ProjectError::Io(err.error))?;
        Ok(())
    }

    /// Saves a timestamped copy into `dir` and keeps the newest [`AUTO_SAVE_KEEP`].
    ///
    /// # Returns
    /// Path of the written file
    pub fn auto_save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ProjectError> {
        self.auto_save_keeping(dir, AUTO_SAVE_KEEP)
    }

    /// Like [`Project::auto_save`] with a custom number of kept files.
    pub fn auto_save_keeping(
        &self,
        dir: impl AsRef<Path>,
        keep: usize,
    ) -> Result<PathBuf, ProjectError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        // Names sort chronologically; a collision moves to the next free stamp.
        let latest = auto_save_files(dir)?.into_iter().next_back();
        let mut path = auto_save_path(dir, stamp);
        while path.exists() || latest.as_ref().is_some_and(|last| path <= *last) {
            stamp += 1;
            path = auto_save_path(dir, stamp);
        }

        self.save(&path)?;
        let removed = cleanup_auto_saves(dir, keep)?;
        log::debug!(
            "auto-saved '{}' to {}, removed {} old copies",
            self.info.name,
            path.display(),
            removed
        );
        Ok(path)
    }

    /// Checks all dimensions and weights and that every id occurs once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for container in &self.containers {
            container.validate()?;
            for cargo in container.boxes() {
                if !seen.insert(cargo.id.as_str()) {
                    return Err(ValidationError::DuplicateId(cargo.id.clone()));
                }
            }
        }
        for cargo in &self.pending {
            cargo.validate()?;
            if !seen.insert(cargo.id.as_str()) {
                return Err(ValidationError::DuplicateId(cargo.id.clone()));
            }
        }
        Ok(())
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container(&self, index: usize) -> Result<&Container, ProjectError> {
        self.containers
            .get(index)
            .ok_or(ProjectError::UnknownContainer(index))
    }

    fn container_mut(&mut self, index: usize) -> Result<&mut Container, ProjectError> {
        self.containers
            .get_mut(index)
            .ok_or(ProjectError::UnknownContainer(index))
    }

    /// Hands a container to the caller, e.g. to bind it to a placement engine.
    pub fn take_container(&mut self, index: usize) -> Result<Container, ProjectError> {
        let container = self.container_mut(index)?;
        let mut placeholder = Container::default();
        placeholder.name = container.name.clone();
        placeholder.length = container.length;
        placeholder.width = container.width;
        Ok(std::mem::replace(container, placeholder))
    }

    /// Puts a container back at `index`, replacing whatever is there.
    pub fn restore_container(
        &mut self,
        index: usize,
        container: Container,
    ) -> Result<(), ProjectError> {
        *self.container_mut(index)? = container;
        Ok(())
    }

    pub fn pending(&self) -> &[CargoBox] {
        &self.pending
    }

    /// Replaces the pending pool, e.g. after an import.
    ///
    /// Every box must be valid and carry an id that is unique within `boxes` and
    /// not placed in any container. On error the pool is left unchanged.
    pub fn set_pending(&mut self, boxes: Vec<CargoBox>) -> Result<(), ProjectError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for cargo in &boxes {
            cargo.validate()?;
            let placed = self.containers.iter().any(|c| c.contains(&cargo.id));
            if placed || !seen.insert(cargo.id.as_str()) {
                return Err(ValidationError::DuplicateId(cargo.id.clone()).into());
            }
        }
        self.pending = boxes;
        Ok(())
    }

    /// Appends a box to the pending pool unless its id is already used.
    pub fn add_pending(&mut self, cargo: CargoBox) -> Result<(), ProjectError> {
        cargo.validate()?;
        if self.contains_box(&cargo.id) {
            return Err(ValidationError::DuplicateId(cargo.id).into());
        }
        self.pending.push(cargo);
        Ok(())
    }

    /// Pending boxes matching a search text and weight class, heaviest first.
    pub fn filter_pending(&self, search: &str, class: WeightClass) -> Vec<&CargoBox> {
        let needle = search.trim().to_lowercase();
        let mut found: Vec<&CargoBox> = self
            .pending
            .iter()
            .filter(|cargo| class.contains(cargo.weight) && matches_search(cargo, &needle))
            .collect();
        found.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        found
    }

    pub fn pending_stats(&self) -> BoxStats {
        BoxStats::of(&self.pending)
    }

    pub fn contains_box(&self, id: &str) -> bool {
        self.pending.iter().any(|b| b.id == id) || self.containers.iter().any(|c| c.contains(id))
    }

    fn next_container_name(&self) -> String {
        format!("Container {}", self.containers.len() + 1)
    }

    /// Appends a new empty container.
    ///
    /// # Returns
    /// Index of the new container
    pub fn add_container(
        &mut self,
        name: Option<&str>,
        length: f64,
        width: f64,
    ) -> Result<usize, ProjectError> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.next_container_name());
        let container = Container::new(name, length, width)?;
        self.containers.push(container);
        Ok(self.containers.len() - 1)
    }

    /// Removes a container; its boxes go back to the pending pool.
    pub fn close_container(&mut self, index: usize) -> Result<Container, ProjectError> {
        if index >= self.containers.len() {
            return Err(ProjectError::UnknownContainer(index));
        }
        if self.containers.len() == 1 {
            return Err(ProjectError::LastContainer);
        }
        let mut container = self.containers.remove(index);
        self.pending.extend(container.drain_boxes());
        Ok(container)
    }

    /// Empties a container; its boxes go back to the pending pool.
    ///
    /// # Returns
    /// Number of boxes returned
    pub fn clear_container(&mut self, index: usize) -> Result<usize, ProjectError> {
        let boxes = self.container_mut(index)?.drain_boxes();
        let count = boxes.len();
        self.pending.extend(boxes);
        Ok(count)
    }

    /// Moves a placed box back to the pending pool.
    pub fn return_to_pending(&mut self, index: usize, id: &str) -> Result<(), ProjectError> {
        let cargo = self
            .container_mut(index)?
            .remove_box(id)
            .ok_or_else(|| ProjectError::UnknownBox(id.to_string()))?;
        self.pending.push(cargo);
        Ok(())
    }

    /// Places a pending box at the first free position of a container.
    ///
    /// # Returns
    /// The chosen position, or `None` if the box stays pending
    pub fn place_pending(
        &mut self,
        index: usize,
        id: &str,
        config: &PlacementConfig,
    ) -> Result<Option<Point2>, ProjectError> {
        if index >= self.containers.len() {
            return Err(ProjectError::UnknownContainer(index));
        }
        let slot = self
            .pending
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ProjectError::UnknownBox(id.to_string()))?;
        let cargo = self.pending.remove(slot);
        let outcome = optimizer::place_one(&mut self.containers[index], cargo, config);

        match outcome {
            Ok(()) => Ok(self.containers[index].position_of(id)),
            Err((cargo, reason)) => {
                log::debug!("{} stays pending: {}", id, reason.code());
                self.pending.insert(slot, cargo);
                Ok(None)
            }
        }
    }

    /// Places the whole pending pool into a container; unplaced boxes stay pending.
    pub fn place_all_pending(
        &mut self,
        index: usize,
        config: PlacementConfig,
    ) -> Result<PlacementResult, ProjectError> {
        let container = self.take_container(index)?;
        let boxes = std::mem::take(&mut self.pending);
        let result = optimizer::place_all(container, boxes, config, |_| {});
        self.pending = result.unplaced.iter().map(|u| u.cargo.clone()).collect();
        self.restore_container(index, result.container.clone())?;
        Ok(result)
    }

    pub fn summary(&self) -> ProjectSummary {
        let placed_boxes = self.containers.iter().map(Container::len).sum();
        let placed_weight = self.containers.iter().map(Container::total_weight).sum();
        let average_utilization_percent = if self.containers.is_empty() {
            0.0
        } else {
            self.containers
                .iter()
                .map(Container::utilization_percent)
                .sum::<f64>()
                / self.containers.len() as f64
        };
        ProjectSummary {
            containers: self.containers.len(),
            placed_boxes,
            pending_boxes: self.pending.len(),
            placed_weight,
            pending_weight: self.pending.iter().map(|b| b.weight).sum(),
            average_utilization_percent,
        }
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new(default_project_name())
    }
}

fn auto_save_path(dir: &Path, stamp: u128) -> PathBuf {
    dir.join(format!("{AUTO_SAVE_PREFIX}{stamp:020}{AUTO_SAVE_SUFFIX}"))
}

/// Auto-save files in `dir`, oldest first.
fn auto_save_files(dir: &Path) -> Result<Vec<PathBuf>, ProjectError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_auto_save = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(AUTO_SAVE_PREFIX) && name.ends_with(AUTO_SAVE_SUFFIX)
            });
        if is_auto_save && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Deletes all but the newest `keep` auto-save files in `dir`.
///
/// # Returns
/// Number of deleted files
pub fn cleanup_auto_saves(dir: impl AsRef<Path>, keep: usize) -> Result<usize, ProjectError> {
    let files = auto_save_files(dir.as_ref())?;
    let excess = files.len().saturating_sub(keep);
    for old in &files[..excess] {
        fs::remove_file(old)?;
    }
    Ok(excess)
}

fn sample(id: &str, length: f64, width: f64, weight: f64) -> CargoBox {
    CargoBox {
        id: id.to_string(),
        length,
        width,
        weight,
        height: None,
        x: 0.0,
        y: 0.0,
        rotated: false,
    }
}

/// The ten demo boxes BOX001 to BOX010.
pub fn sample_boxes() -> Vec<CargoBox> {
    vec![
        sample("BOX001", 1200.0, 800.0, 450.0),
        sample("BOX002", 1000.0, 600.0, 320.0),
        sample("BOX003", 1500.0, 1000.0, 680.0),
        sample("BOX004", 800.0, 600.0, 280.0),
        sample("BOX005", 1100.0, 900.0, 520.0),
        sample("BOX006", 900.0, 700.0, 380.0),
        sample("BOX007", 1300.0, 800.0, 590.0),
        sample("BOX008", 700.0, 500.0, 240.0),
        sample("BOX009", 1400.0, 1100.0, 720.0),
        sample("BOX010", 950.0, 650.0, 410.0),
    ]
}
