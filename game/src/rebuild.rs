use rand::Rng;

use crate::coloring::ColorEnforcer;
use crate::events::{EventBus, GridEvent};
use crate::grid::{Grid, Position};
use crate::progress::ProgressTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebuildPhase {
    #[default]
    Active,
    Rebuilding,
}

/// Full-grid reshuffle run when the move budget runs out.
#[derive(Debug, Clone, Default)]
pub struct RebuildController {
    phase: RebuildPhase,
    completed: u32,
}

impl RebuildController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RebuildPhase {
        self.phase
    }

    pub fn is_rebuilding(&self) -> bool {
        self.phase == RebuildPhase::Rebuilding
    }

    /// Rebuilds finished this session.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Clears every cell, repopulates with run-free colours and resets
    /// progress. Runs to completion; there is no way to interrupt it.
    pub fn rebuild<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        enforcer: &ColorEnforcer,
        progress: &mut ProgressTracker,
        rng: &mut R,
        events: &mut EventBus,
    ) {
        self.phase = RebuildPhase::Rebuilding;
        events.emit(GridEvent::RebuildStart);
        tracing::debug!(rebuild = self.completed + 1, "rebuilding grid");

        let positions: Vec<Position> = grid.positions().collect();
        for &pos in &positions {
            if grid.deactivate(pos) {
                events.emit(GridEvent::CellCleared { position: pos });
            }
        }
        enforcer.populate(grid, rng, events);
        progress.reset(events);

        self.completed = self.completed.saturating_add(1);
        self.phase = RebuildPhase::Active;
        events.emit(GridEvent::RebuildEnd);
    }

    /// Manual reshuffle: every cell gets a uniformly random colour, then runs
    /// are fixed. Progress is left alone and no rebuild notifications fire.
    pub fn reshuffle<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        enforcer: &ColorEnforcer,
        rng: &mut R,
        events: &mut EventBus,
    ) {
        if self.is_rebuilding() {
            return;
        }
        let positions: Vec<Position> = grid.positions().collect();
        for pos in positions {
            let color = enforcer.assign_color(grid, pos, false, rng);
            grid.activate(pos, color);
            events.emit(GridEvent::CellSpawned {
                position: pos,
                color,
            });
        }
        let corrected = enforcer.fix_existing_runs(grid, rng, events);
        tracing::debug!(corrected, "grid reshuffled");
    }
}
