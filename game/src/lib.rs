pub mod cascade;
pub mod coloring;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod grid;
pub mod hint;
pub mod progress;
pub mod rebuild;
pub mod selection;
pub mod session;

pub use config::{ConfigStore, GridConfig};
pub use error::ConfigError;
pub use events::{EventBus, EventLog, GridEvent, GridObserver};
pub use grid::{Cell, CellId, ColorId, Grid, GridSnapshot, Position};
pub use session::{MatchSession, SessionSnapshot};
