//! Grid maps built from images, and shortest paths over them.
//!
//! An image is cut into square cells, each cell is tagged [`Cell::Road`] or [`Cell::Wall`] from
//! its average colour, and [`PathFinder`] runs A* over the resulting [`GridMap`] with 4-connected
//! moves.

pub mod classify;
pub mod error;
pub mod find;
pub mod grid;

pub use classify::{build_grid, grid_from_rgba, PixelBlock, TerrainClassifier};
pub use error::GridError;
pub use find::*;
pub use grid::*;
