use std::path::PathBuf;

use thiserror::Error;

use crate::grid::ColorId;

/// Reasons a session refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid width {width} outside {min}..={max}")]
    WidthOutOfRange { width: usize, min: usize, max: usize },
    #[error("grid height {height} outside {min}..={max}")]
    HeightOutOfRange { height: usize, min: usize, max: usize },
    #[error("minimum chain length {length} outside {min}..={max}")]
    MinChainOutOfRange { length: usize, min: usize, max: usize },
    #[error("minimum chain length {length} exceeds the {cells} cells of the grid")]
    UnreachableChain { length: usize, cells: usize },
    #[error("moves per game {moves} outside {min}..={max}")]
    MovesOutOfRange { moves: u32, min: u32, max: u32 },
    #[error("palette needs at least 2 colours, got {len}")]
    PaletteTooSmall { len: usize },
    #[error("palette lists colour {0:?} more than once")]
    DuplicateColor(ColorId),
    #[error("grid is {actual_width}x{actual_height} but config expects {width}x{height}")]
    GridShapeMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
