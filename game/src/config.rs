use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{ColorId, MAX_GRID_HEIGHT, MAX_GRID_WIDTH, MIN_GRID_HEIGHT, MIN_GRID_WIDTH};

pub const MIN_CHAIN_LENGTH: usize = 1;
pub const MAX_CHAIN_LENGTH: usize = 10;
pub const MIN_MOVES_PER_GAME: u32 = 1;
pub const MAX_MOVES_PER_GAME: u32 = 99;

pub const DEFAULT_GRID_WIDTH: usize = 8;
pub const DEFAULT_GRID_HEIGHT: usize = 6;
pub const DEFAULT_MIN_CHAIN_LENGTH: usize = 3;
pub const DEFAULT_MOVES_PER_GAME: u32 = 20;
pub const DEFAULT_PALETTE_SIZE: u8 = 5;

/// Level-design parameters for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_min_chain_length")]
    pub min_chain_length: usize,
    #[serde(default = "default_moves_per_game")]
    pub moves_per_game: u32,
    #[serde(default = "default_palette")]
    pub palette: Vec<ColorId>,
    /// Fixed RNG seed; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_width() -> usize {
    DEFAULT_GRID_WIDTH
}

fn default_height() -> usize {
    DEFAULT_GRID_HEIGHT
}

fn default_min_chain_length() -> usize {
    DEFAULT_MIN_CHAIN_LENGTH
}

fn default_moves_per_game() -> u32 {
    DEFAULT_MOVES_PER_GAME
}

fn default_palette() -> Vec<ColorId> {
    (0..DEFAULT_PALETTE_SIZE).map(ColorId).collect()
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            min_chain_length: default_min_chain_length(),
            moves_per_game: default_moves_per_game(),
            palette: default_palette(),
            seed: None,
        }
    }
}

impl GridConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_GRID_WIDTH..=MAX_GRID_WIDTH).contains(&self.width) {
            return Err(ConfigError::WidthOutOfRange {
                width: self.width,
                min: MIN_GRID_WIDTH,
                max: MAX_GRID_WIDTH,
            });
        }
        if !(MIN_GRID_HEIGHT..=MAX_GRID_HEIGHT).contains(&self.height) {
            return Err(ConfigError::HeightOutOfRange {
                height: self.height,
                min: MIN_GRID_HEIGHT,
                max: MAX_GRID_HEIGHT,
            });
        }
        if !(MIN_CHAIN_LENGTH..=MAX_CHAIN_LENGTH).contains(&self.min_chain_length) {
            return Err(ConfigError::MinChainOutOfRange {
                length: self.min_chain_length,
                min: MIN_CHAIN_LENGTH,
                max: MAX_CHAIN_LENGTH,
            });
        }
        let cells = self.width * self.height;
        if self.min_chain_length > cells {
            return Err(ConfigError::UnreachableChain {
                length: self.min_chain_length,
                cells,
            });
        }
        if !(MIN_MOVES_PER_GAME..=MAX_MOVES_PER_GAME).contains(&self.moves_per_game) {
            return Err(ConfigError::MovesOutOfRange {
                moves: self.moves_per_game,
                min: MIN_MOVES_PER_GAME,
                max: MAX_MOVES_PER_GAME,
            });
        }
        if self.palette.len() < 2 {
            return Err(ConfigError::PaletteTooSmall {
                len: self.palette.len(),
            });
        }
        let mut seen = HashSet::new();
        for &color in &self.palette {
            if !seen.insert(color) {
                return Err(ConfigError::DuplicateColor(color));
            }
        }
        Ok(())
    }
}

/// Locates and persists the rules file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("MATCHGRID_CONFIG_PATH") {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("matchgrid");
        path.push("config.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(&self) -> Result<GridConfig, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(GridConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice::<GridConfig>(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &GridConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}
