use rand::Rng;
use serde::Serialize;

use crate::coloring::ColorEnforcer;
use crate::detector::{AutoMatch, find_auto_matches};
use crate::events::{EventBus, GridEvent};
use crate::grid::{CellMove, ColorId, Grid, GridSnapshot, Position};
use crate::progress::MatchRecorder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeStepKind {
    /// Gravity pulled active cells down into empty slots.
    Compacted { moves: Vec<CellMove> },
    /// Auto-detected windows were cleared together.
    Cleared { cells: Vec<Position>, windows: usize },
    /// Remaining empty slots were filled with fresh colours.
    Refilled { spawned: Vec<(Position, ColorId)> },
    /// `fix_existing_runs` ran after the refill.
    Corrected { corrected: usize },
    /// No matches left; the grid is at a settle point.
    Settled,
    /// The round guard stopped the cascade with `windows` matches still on
    /// the grid.
    Aborted { windows: usize },
}

/// One intermediate grid state the host may animate before pulling the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub round: usize,
    pub kind: CascadeStepKind,
    pub snapshot: GridSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Compact,
    DetectAfterCompaction,
    Refill,
    Fix,
    DetectAfterRefill,
    Done,
}

/// Resumable compaction/refill/detect loop started after a clear.
///
/// Each call to [`Cascade::step`] performs one phase and reports it; the
/// cascade is finished once it has yielded [`CascadeStepKind::Settled`] or,
/// when the round guard trips with matches left, [`CascadeStepKind::Aborted`].
#[derive(Debug, Clone)]
pub struct Cascade {
    phase: Phase,
    round: usize,
    max_rounds: usize,
}

impl Cascade {
    pub fn new(grid: &Grid) -> Self {
        Self::with_round_limit(grid.len().max(1))
    }

    /// Caps the number of clear rounds. Once reached, pending matches are
    /// left to the refill and fix phases.
    pub fn with_round_limit(max_rounds: usize) -> Self {
        Self {
            phase: Phase::Compact,
            round: 0,
            max_rounds,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Clear rounds performed so far.
    pub fn rounds(&self) -> usize {
        self.round
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        enforcer: &ColorEnforcer,
        rng: &mut R,
        recorder: &mut dyn MatchRecorder,
        events: &mut EventBus,
    ) -> Option<CascadeStep> {
        let kind = match self.phase {
            Phase::Done => return None,
            Phase::Compact => {
                let moves = compact(grid, events);
                self.phase = Phase::DetectAfterCompaction;
                CascadeStepKind::Compacted { moves }
            }
            Phase::DetectAfterCompaction => {
                let found = find_auto_matches(grid);
                if found.is_empty() || self.round_limit_hit() {
                    self.phase = Phase::Refill;
                    return self.step(grid, enforcer, rng, recorder, events);
                }
                self.phase = Phase::Compact;
                self.clear(grid, &found, recorder, events)
            }
            Phase::Refill => {
                let spawned = refill(grid, enforcer, rng, events);
                self.phase = Phase::Fix;
                CascadeStepKind::Refilled { spawned }
            }
            Phase::Fix => {
                let corrected = enforcer.fix_existing_runs(grid, rng, events);
                self.phase = Phase::DetectAfterRefill;
                CascadeStepKind::Corrected { corrected }
            }
            Phase::DetectAfterRefill => {
                let found = find_auto_matches(grid);
                if found.is_empty() {
                    self.phase = Phase::Done;
                    tracing::debug!(rounds = self.round, "cascade settled");
                    CascadeStepKind::Settled
                } else if self.round_limit_hit() {
                    self.phase = Phase::Done;
                    CascadeStepKind::Aborted {
                        windows: found.windows.len(),
                    }
                } else {
                    self.phase = Phase::Compact;
                    self.clear(grid, &found, recorder, events)
                }
            }
        };

        Some(CascadeStep {
            round: self.round,
            kind,
            snapshot: grid.snapshot(),
        })
    }

    /// Runs every remaining phase. Returns the number of clear rounds.
    pub fn run_to_end<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        enforcer: &ColorEnforcer,
        rng: &mut R,
        recorder: &mut dyn MatchRecorder,
        events: &mut EventBus,
    ) -> usize {
        while self.step(grid, enforcer, rng, recorder, events).is_some() {}
        self.round
    }

    fn round_limit_hit(&self) -> bool {
        if self.round >= self.max_rounds {
            tracing::warn!(rounds = self.round, "cascade round limit reached");
            return true;
        }
        false
    }

    fn clear(
        &mut self,
        grid: &mut Grid,
        found: &AutoMatch,
        recorder: &mut dyn MatchRecorder,
        events: &mut EventBus,
    ) -> CascadeStepKind {
        self.round += 1;
        let cells = clear_cells(grid, found.cells.iter().copied(), events);
        recorder.auto_matched(found.windows.len(), events);
        tracing::debug!(
            round = self.round,
            cleared = cells.len(),
            "cascade cleared auto matches"
        );
        CascadeStepKind::Cleared {
            cells,
            windows: found.windows.len(),
        }
    }
}

pub fn clear_cells(
    grid: &mut Grid,
    cells: impl IntoIterator<Item = Position>,
    events: &mut EventBus,
) -> Vec<Position> {
    let mut cleared = Vec::new();
    for pos in cells {
        if grid.deactivate(pos) {
            events.emit(GridEvent::CellCleared { position: pos });
            cleared.push(pos);
        }
    }
    cleared
}

/// Gravity: repeatedly swaps an empty slot with the active cell directly above
/// it, sweeping bottom to top, until a full pass moves nothing.
pub fn compact(grid: &mut Grid, events: &mut EventBus) -> Vec<CellMove> {
    let mut moves = Vec::new();
    loop {
        let mut moved = false;
        for row in (1..grid.height()).rev() {
            for col in 0..grid.width() {
                let below = Position::new(col, row);
                let above = Position::new(col, row - 1);
                if grid.is_active(below) || !grid.is_active(above) {
                    continue;
                }
                if let Some(mv) = grid.move_content(above, below) {
                    events.emit(GridEvent::CellMoved {
                        from: mv.from,
                        to: mv.to,
                    });
                    moves.push(mv);
                    moved = true;
                }
            }
        }
        if !moved {
            return moves;
        }
    }
}

/// Reactivates every empty slot, bottom row first, with a run-avoiding colour.
pub fn refill<R: Rng + ?Sized>(
    grid: &mut Grid,
    enforcer: &ColorEnforcer,
    rng: &mut R,
    events: &mut EventBus,
) -> Vec<(Position, ColorId)> {
    let mut empty = grid.inactive_positions();
    empty.sort_by_key(|pos| (std::cmp::Reverse(pos.row), pos.col));

    let mut spawned = Vec::with_capacity(empty.len());
    for pos in empty {
        let color = enforcer.assign_color(grid, pos, true, rng);
        grid.activate(pos, color);
        events.emit(GridEvent::CellSpawned {
            position: pos,
            color,
        });
        spawned.push((pos, color));
    }
    spawned
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::progress::ProgressTracker;

    #[test]
    fn compaction_drops_cells_and_keeps_colours() {
        let mut grid = Grid::from_letters(&["AB", ".C", "A.", ".."]).unwrap();
        let moves = compact(&mut grid, &mut EventBus::default());
        assert_eq!(grid.to_string(), "..\n..\nAB\nAC");
        assert!(!moves.is_empty());
        assert_eq!(grid.active_count(), 4);
    }

    #[test]
    fn compaction_is_idempotent() {
        let mut grid = Grid::from_letters(&["A.", "..", "BC"]).unwrap();
        compact(&mut grid, &mut EventBus::default());
        let settled = grid.clone();
        assert!(compact(&mut grid, &mut EventBus::default()).is_empty());
        assert_eq!(grid, settled);
    }

    #[test]
    fn refill_fills_bottom_up_without_runs() {
        let mut grid = Grid::from_letters(&["...", "...", "AB."]).unwrap();
        let enforcer = ColorEnforcer::new((0..3).map(ColorId).collect()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let spawned = refill(&mut grid, &enforcer, &mut rng, &mut EventBus::default());
        assert_eq!(spawned.len(), 7);
        assert_eq!(spawned[0].0, Position::new(2, 2));
        assert_eq!(grid.active_count(), 9);
        assert!(!grid.has_runs());
    }

    #[test]
    fn compaction_exposed_match_chains_before_refill() {
        // Clearing the middle row drops the top row's A onto the A-A floor pair.
        let mut grid = Grid::from_letters(&["BAB", "...", "ACA", "CBC"]).unwrap();
        grid.deactivate(Position::new(1, 2));
        let enforcer = ColorEnforcer::new((0..3).map(ColorId).collect()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = ProgressTracker::new(10);
        let mut bus = EventBus::default();

        let mut cascade = Cascade::new(&grid);
        let mut kinds = Vec::new();
        while let Some(step) = cascade.step(&mut grid, &enforcer, &mut rng, &mut progress, &mut bus) {
            kinds.push(step.kind);
        }

        assert!(matches!(kinds[0], CascadeStepKind::Compacted { .. }));
        assert!(matches!(kinds[1], CascadeStepKind::Cleared { windows: 1, .. }));
        assert!(matches!(kinds.last(), Some(CascadeStepKind::Settled)));
        assert!(cascade.is_finished());
        assert!(cascade.rounds() >= 1);
        assert!(progress.score() >= 2);
        assert_eq!(progress.moves_remaining(), 10);
        assert_eq!(grid.active_count(), grid.len());
        assert!(!grid.has_runs());
    }

    #[test]
    fn round_limit_leaves_exposed_match_to_fix_pass() {
        let mut grid = Grid::from_letters(&["BAB", "...", "ACA", "CBC"]).unwrap();
        grid.deactivate(Position::new(1, 2));
        let enforcer = ColorEnforcer::new((0..3).map(ColorId).collect()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut progress = ProgressTracker::new(10);
        let mut bus = EventBus::default();

        let mut cascade = Cascade::with_round_limit(0);
        let mut kinds = Vec::new();
        while let Some(step) = cascade.step(&mut grid, &enforcer, &mut rng, &mut progress, &mut bus) {
            kinds.push(step.kind);
        }

        assert!(!kinds.iter().any(|k| matches!(k, CascadeStepKind::Cleared { .. })));
        assert!(kinds.iter().any(|k| matches!(k, CascadeStepKind::Corrected { corrected } if *corrected >= 1)));
        assert_eq!(kinds.last(), Some(&CascadeStepKind::Settled));
        assert_eq!(cascade.rounds(), 0);
        assert_eq!(progress.score(), 0);
        assert_eq!(grid.active_count(), grid.len());
        assert!(!grid.has_runs());
    }

    #[test]
    fn round_limit_with_matches_left_reports_aborted() {
        let mut grid = Grid::from_letters(&["ABC", "AAA", "CBC"]).unwrap();
        let enforcer = ColorEnforcer::new((0..3).map(ColorId).collect()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut progress = ProgressTracker::new(10);
        let mut cascade = Cascade {
            phase: Phase::DetectAfterRefill,
            round: 0,
            max_rounds: 0,
        };

        let step = cascade
            .step(&mut grid, &enforcer, &mut rng, &mut progress, &mut EventBus::default())
            .expect("detect step");
        assert_eq!(step.kind, CascadeStepKind::Aborted { windows: 1 });
        assert!(cascade.is_finished());
        assert_eq!(grid.active_count(), 9);
        assert!(cascade.step(&mut grid, &enforcer, &mut rng, &mut progress, &mut EventBus::default()).is_none());
    }
}
