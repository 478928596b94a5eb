use crate::events::{EventBus, GridEvent};
use crate::grid::{Grid, Position};
use crate::progress::{MatchRecorder, RebuildRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting,
    Committing,
    Cancelling,
}

/// Player-selected path: distinct cells, each orthogonally adjacent to and
/// the same colour as the one before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChain {
    cells: Vec<Position>,
}

impl SelectionChain {
    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn tail(&self) -> Option<Position> {
        self.cells.last().copied()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }

    fn previous(&self) -> Option<Position> {
        self.cells.len().checked_sub(2).map(|idx| self.cells[idx])
    }

    fn take(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.cells)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Started,
    Extended,
    Backtracked,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was being selected, or input is disabled.
    Ignored,
    /// Chain shorter than the minimum; the grid is untouched.
    Discarded { length: usize },
    /// Chain cleared and recorded.
    Cleared {
        cells: Vec<Position>,
        rebuild: Option<RebuildRequest>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    chain: SelectionChain,
    min_chain_length: usize,
    disabled: bool,
}

impl SelectionController {
    pub fn new(min_chain_length: usize) -> Self {
        Self {
            min_chain_length,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn chain(&self) -> &SelectionChain {
        &self.chain
    }

    pub fn min_chain_length(&self) -> usize {
        self.min_chain_length
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// While disabled (cascade or rebuild running) every transition is refused.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn begin(&mut self, grid: &Grid, cell: Position) -> SelectionOutcome {
        if self.disabled || self.state != SelectionState::Idle || !grid.is_active(cell) {
            return SelectionOutcome::Ignored;
        }
        self.chain.cells.push(cell);
        self.state = SelectionState::Selecting;
        tracing::debug!(%cell, "selection started");
        SelectionOutcome::Started
    }

    pub fn extend(&mut self, grid: &Grid, cell: Position) -> SelectionOutcome {
        if self.disabled || self.state != SelectionState::Selecting {
            return SelectionOutcome::Ignored;
        }
        let Some(tail) = self.chain.tail() else {
            return SelectionOutcome::Ignored;
        };

        if self.chain.contains(cell) {
            if self.chain.previous() == Some(cell) {
                self.chain.cells.pop();
                return SelectionOutcome::Backtracked;
            }
            return SelectionOutcome::Ignored;
        }

        let same_color = match (grid.color_at(tail), grid.color_at(cell)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if tail.is_adjacent(cell) && same_color {
            self.chain.cells.push(cell);
            return SelectionOutcome::Extended;
        }
        SelectionOutcome::Ignored
    }

    /// Commits the chain: long enough chains are cleared from the grid and
    /// reported to `recorder`; shorter ones are dropped. Always returns to Idle.
    pub fn commit(
        &mut self,
        grid: &mut Grid,
        recorder: &mut dyn MatchRecorder,
        events: &mut EventBus,
    ) -> CommitOutcome {
        if self.disabled || self.state != SelectionState::Selecting {
            return CommitOutcome::Ignored;
        }
        self.state = SelectionState::Committing;
        let cells = self.chain.take();

        let outcome = if cells.len() >= self.min_chain_length {
            for &pos in &cells {
                if grid.deactivate(pos) {
                    events.emit(GridEvent::CellCleared { position: pos });
                }
            }
            let rebuild = recorder.match_committed(cells.len(), events);
            tracing::debug!(length = cells.len(), "chain committed");
            CommitOutcome::Cleared { cells, rebuild }
        } else {
            tracing::debug!(length = cells.len(), "chain too short, discarded");
            CommitOutcome::Discarded {
                length: cells.len(),
            }
        };

        self.state = SelectionState::Idle;
        outcome
    }

    /// Drops the chain without touching the grid.
    pub fn cancel(&mut self) -> bool {
        if self.state != SelectionState::Selecting {
            return false;
        }
        self.state = SelectionState::Cancelling;
        self.chain.take();
        self.state = SelectionState::Idle;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressTracker;

    fn grid() -> Grid {
        Grid::from_letters(&["AAB", "BAC", "CAB"]).unwrap()
    }

    #[test]
    fn extend_requires_adjacency_and_colour() {
        let grid = grid();
        let mut sel = SelectionController::new(3);
        assert_eq!(sel.begin(&grid, Position::new(0, 0)), SelectionOutcome::Started);
        // Diagonal.
        assert_eq!(sel.extend(&grid, Position::new(1, 1)), SelectionOutcome::Ignored);
        // Wrong colour.
        assert_eq!(sel.extend(&grid, Position::new(0, 1)), SelectionOutcome::Ignored);
        assert_eq!(sel.extend(&grid, Position::new(1, 0)), SelectionOutcome::Extended);
        assert_eq!(sel.extend(&grid, Position::new(1, 1)), SelectionOutcome::Extended);
        assert_eq!(sel.chain().len(), 3);
    }

    #[test]
    fn revisiting_second_to_last_backtracks_one_step() {
        let grid = grid();
        let mut sel = SelectionController::new(3);
        sel.begin(&grid, Position::new(1, 0));
        sel.extend(&grid, Position::new(1, 1));
        sel.extend(&grid, Position::new(1, 2));

        assert_eq!(sel.extend(&grid, Position::new(1, 0)), SelectionOutcome::Ignored);
        assert_eq!(sel.extend(&grid, Position::new(1, 1)), SelectionOutcome::Backtracked);
        assert_eq!(sel.extend(&grid, Position::new(1, 0)), SelectionOutcome::Backtracked);
        assert_eq!(sel.chain().cells(), &[Position::new(1, 0)]);
        // Cannot backtrack below one cell.
        assert_eq!(sel.extend(&grid, Position::new(1, 0)), SelectionOutcome::Ignored);
        assert_eq!(sel.chain().len(), 1);
    }

    #[test]
    fn begin_only_from_idle() {
        let grid = grid();
        let mut sel = SelectionController::new(3);
        sel.begin(&grid, Position::new(0, 0));
        assert_eq!(sel.begin(&grid, Position::new(2, 2)), SelectionOutcome::Ignored);
        assert!(sel.cancel());
        assert_eq!(sel.state(), SelectionState::Idle);
        assert!(sel.chain().is_empty());
    }

    #[test]
    fn short_chain_is_discarded_without_side_effects() {
        let mut grid = grid();
        let before = grid.clone();
        let mut progress = ProgressTracker::new(5);
        let mut bus = EventBus::default();
        let mut sel = SelectionController::new(3);
        sel.begin(&grid, Position::new(0, 0));
        sel.extend(&grid, Position::new(1, 0));

        let outcome = sel.commit(&mut grid, &mut progress, &mut bus);
        assert_eq!(outcome, CommitOutcome::Discarded { length: 2 });
        assert_eq!(grid, before);
        assert_eq!(progress.score(), 0);
        assert_eq!(progress.moves_remaining(), 5);
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn disabled_controller_refuses_input() {
        let grid = grid();
        let mut sel = SelectionController::new(1);
        sel.set_disabled(true);
        assert_eq!(sel.begin(&grid, Position::new(0, 0)), SelectionOutcome::Ignored);
        assert_eq!(sel.state(), SelectionState::Idle);
    }
}
