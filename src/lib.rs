//! Floor-plan cargo placement for shipping containers.
//!
//! Boxes are placed on a 2D container floor, checked for overlap and bounds,
//! rearranged interactively and evaluated for weight balance.

pub mod advice;
pub mod api;
pub mod config;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod optimizer;
pub mod project;
#[cfg(test)]
mod scenarios;
pub mod spatial_grid;
pub mod types;
