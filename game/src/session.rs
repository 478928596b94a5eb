use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::cascade::{Cascade, CascadeStep};
use crate::coloring::ColorEnforcer;
use crate::config::GridConfig;
use crate::error::ConfigError;
use crate::events::{EventBus, GridEvent, GridObserver};
use crate::grid::{Grid, GridSnapshot, Position};
use crate::progress::ProgressTracker;
use crate::rebuild::RebuildController;
use crate::selection::{CommitOutcome, SelectionController, SelectionOutcome, SelectionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub grid: GridSnapshot,
    pub score: u32,
    pub moves_remaining: u32,
    pub initial_moves: u32,
}

/// One game: the grid plus every component that mutates it.
///
/// The host forwards pointer input and pulls cascade steps; all mutation goes
/// through this type, one call at a time.
#[derive(Debug)]
pub struct MatchSession {
    config: GridConfig,
    grid: Grid,
    enforcer: ColorEnforcer,
    rng: StdRng,
    selection: SelectionController,
    progress: ProgressTracker,
    rebuild: RebuildController,
    cascade: Option<Cascade>,
    events: EventBus,
}

impl MatchSession {
    /// Validates `config`, populates a fresh run-free grid and wires `observers`
    /// in the given order.
    pub fn new(config: GridConfig, observers: Vec<Box<dyn GridObserver>>) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(config.width, config.height);
        let mut session = Self::assemble(config, grid, observers)?;
        session
            .enforcer
            .populate(&mut session.grid, &mut session.rng, &mut session.events);
        tracing::debug!(
            width = session.config.width,
            height = session.config.height,
            "session started"
        );
        Ok(session)
    }

    /// Starts from a prepared grid (tests, puzzles, replays). The grid is used
    /// as-is; empty slots stay empty until the first cascade refills them.
    pub fn with_grid(
        config: GridConfig,
        grid: Grid,
        observers: Vec<Box<dyn GridObserver>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if grid.width() != config.width || grid.height() != config.height {
            return Err(ConfigError::GridShapeMismatch {
                width: config.width,
                height: config.height,
                actual_width: grid.width(),
                actual_height: grid.height(),
            });
        }
        Self::assemble(config, grid, observers)
    }

    fn assemble(
        config: GridConfig,
        grid: Grid,
        observers: Vec<Box<dyn GridObserver>>,
    ) -> Result<Self, ConfigError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            enforcer: ColorEnforcer::new(config.palette.clone())?,
            selection: SelectionController::new(config.min_chain_length),
            progress: ProgressTracker::new(config.moves_per_game),
            rebuild: RebuildController::new(),
            cascade: None,
            events: EventBus::new(observers),
            rng,
            grid,
            config,
        })
    }

    pub fn subscribe(&mut self, observer: Box<dyn GridObserver>) {
        self.events.subscribe(observer);
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn score(&self) -> u32 {
        self.progress.score()
    }

    pub fn moves_remaining(&self) -> u32 {
        self.progress.moves_remaining()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn chain(&self) -> &[Position] {
        self.selection.chain().cells()
    }

    pub fn rebuild_controller(&self) -> &RebuildController {
        &self.rebuild
    }

    pub fn is_resolving(&self) -> bool {
        self.cascade.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            grid: self.grid.snapshot(),
            score: self.progress.score(),
            moves_remaining: self.progress.moves_remaining(),
            initial_moves: self.progress.initial_moves(),
        }
    }

    /// Pointer pressed or dragged over `cell`: starts a chain from Idle,
    /// otherwise tries to extend or backtrack it.
    pub fn pointer_down(&mut self, cell: Position) -> SelectionOutcome {
        match self.selection.state() {
            SelectionState::Idle => self.selection.begin(&self.grid, cell),
            _ => self.selection.extend(&self.grid, cell),
        }
    }

    /// Pointer released: commits the chain. A successful clear either starts a
    /// cascade (pull it with [`Self::cascade_steps`] or [`Self::settle`]) or,
    /// on the last move, rebuilds the grid immediately.
    pub fn pointer_up(&mut self) -> CommitOutcome {
        let outcome = self
            .selection
            .commit(&mut self.grid, &mut self.progress, &mut self.events);

        if let CommitOutcome::Cleared { rebuild, .. } = &outcome {
            if rebuild.is_some() {
                self.run_rebuild();
            } else {
                self.start_cascade();
            }
        }
        outcome
    }

    /// Host-side cancel (pointer left the board, focus lost).
    pub fn cancel_selection(&mut self) -> bool {
        self.selection.cancel()
    }

    /// Manual reshuffle input. Ignored while a cascade or rebuild is running.
    pub fn reshuffle(&mut self) -> bool {
        if self.cascade.is_some() || self.rebuild.is_rebuilding() {
            return false;
        }
        self.selection.cancel();
        self.rebuild
            .reshuffle(&mut self.grid, &self.enforcer, &mut self.rng, &mut self.events);
        true
    }

    /// Performs one cascade phase and returns it, or `None` when no cascade is
    /// pending. The final step is `Settled`, or `Aborted` if the round guard
    /// stopped a cascade that still had matches.
    pub fn advance_cascade(&mut self) -> Option<CascadeStep> {
        let cascade = self.cascade.as_mut()?;
        let step = cascade.step(
            &mut self.grid,
            &self.enforcer,
            &mut self.rng,
            &mut self.progress,
            &mut self.events,
        );
        if step.is_none() || cascade.is_finished() {
            self.finish_cascade();
        }
        step
    }

    /// Lazy view over the pending cascade. Each item is computed on demand;
    /// once exhausted the cascade is over and cannot be replayed.
    pub fn cascade_steps(&mut self) -> impl Iterator<Item = CascadeStep> + '_ {
        std::iter::from_fn(move || self.advance_cascade())
    }

    /// Runs any pending cascade to its settle point. Returns the number of
    /// steps taken.
    pub fn settle(&mut self) -> usize {
        self.cascade_steps().count()
    }

    fn start_cascade(&mut self) {
        self.selection.set_disabled(true);
        self.events.emit(GridEvent::CascadeStart);
        self.cascade = Some(Cascade::new(&self.grid));
    }

    fn finish_cascade(&mut self) {
        if self.cascade.take().is_some() {
            self.selection.set_disabled(false);
            self.events.emit(GridEvent::CascadeEnd);
        }
    }

    fn run_rebuild(&mut self) {
        if self.cascade.take().is_some() {
            tracing::debug!("pending cascade superseded by rebuild");
        }
        self.selection.set_disabled(true);
        self.rebuild.rebuild(
            &mut self.grid,
            &self.enforcer,
            &mut self.progress,
            &mut self.rng,
            &mut self.events,
        );
        self.selection.set_disabled(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;

    #[test]
    fn new_session_starts_full_and_idle() {
        let log = EventLog::new();
        let session =
            MatchSession::new(GridConfig::default().with_seed(1), vec![log.observer()]).unwrap();
        assert_eq!(session.grid().active_count(), session.grid().len());
        assert!(!session.grid().has_runs());
        assert_eq!(session.selection_state(), SelectionState::Idle);
        assert!(!session.is_resolving());
        assert_eq!(
            log.count(|e| matches!(e, GridEvent::CellSpawned { .. })),
            session.grid().len()
        );
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let config = GridConfig {
            palette: vec![],
            ..GridConfig::default()
        };
        assert!(matches!(
            MatchSession::new(config, Vec::new()),
            Err(ConfigError::PaletteTooSmall { len: 0 })
        ));
    }

    #[test]
    fn with_grid_checks_shape() {
        let grid = Grid::from_letters(&["AB", "BA"]).unwrap();
        let err = MatchSession::with_grid(GridConfig::default(), grid, Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::GridShapeMismatch { .. }));
    }
}
