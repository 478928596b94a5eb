use serde::{Deserialize, Serialize};

use crate::events::{EventBus, GridEvent};

/// Cells in one auto-detected window; each window scores like a 3-cell clear.
pub const AUTO_MATCH_WINDOW: usize = 3;

/// Score for clearing `cleared` cells: the Fibonacci sequence seeded with
/// `1, 1`, so 1 cell -> 1, 2 -> 1, 3 -> 2, 4 -> 3, 5 -> 5, 6 -> 8.
pub fn fib_score(cleared: usize) -> u32 {
    if cleared == 0 {
        return 0;
    }
    let (mut current, mut next) = (1u32, 1u32);
    for _ in 1..cleared {
        let sum = current.saturating_add(next);
        current = next;
        next = sum;
    }
    current
}

/// Marker returned when the move budget is exhausted and the grid must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildRequest;

/// Narrow callback through which clears are reported. Implementors never see
/// the grid.
pub trait MatchRecorder {
    /// A player chain of `cleared` cells was committed.
    fn match_committed(&mut self, cleared: usize, events: &mut EventBus) -> Option<RebuildRequest>;

    /// The cascade cleared `windows` auto-detected 3-windows.
    fn auto_matched(&mut self, windows: usize, events: &mut EventBus);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTracker {
    score: u32,
    moves_remaining: u32,
    initial_moves: u32,
    pitch_threshold: u32,
}

impl ProgressTracker {
    pub fn new(initial_moves: u32) -> Self {
        Self {
            score: 0,
            moves_remaining: initial_moves,
            initial_moves,
            pitch_threshold: (25 * initial_moves) / 100,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    pub fn initial_moves(&self) -> u32 {
        self.initial_moves
    }

    pub fn pitch_threshold(&self) -> u32 {
        self.pitch_threshold
    }

    pub fn add_score(&mut self, cleared: usize, events: &mut EventBus) {
        self.score = self.score.saturating_add(fib_score(cleared));
        events.emit(GridEvent::ScoreChanged { score: self.score });
    }

    /// Spends one move. Hitting zero normalizes the pitch and asks for a
    /// rebuild; landing exactly on the threshold raises it.
    pub fn spend_move(&mut self, events: &mut EventBus) -> Option<RebuildRequest> {
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        events.emit(GridEvent::MovesChanged {
            remaining: self.moves_remaining,
        });

        if self.moves_remaining == 0 {
            events.emit(GridEvent::PitchNormalize);
            tracing::debug!(score = self.score, "move budget exhausted");
            return Some(RebuildRequest);
        }
        if self.moves_remaining == self.pitch_threshold {
            events.emit(GridEvent::PitchRaise);
        }
        None
    }

    /// Clears score and restores the full move budget.
    pub fn reset(&mut self, events: &mut EventBus) {
        self.score = 0;
        self.moves_remaining = self.initial_moves;
        events.emit(GridEvent::ScoreChanged { score: self.score });
        events.emit(GridEvent::MovesChanged {
            remaining: self.moves_remaining,
        });
    }
}

impl MatchRecorder for ProgressTracker {
    fn match_committed(&mut self, cleared: usize, events: &mut EventBus) -> Option<RebuildRequest> {
        self.add_score(cleared, events);
        self.spend_move(events)
    }

    fn auto_matched(&mut self, windows: usize, events: &mut EventBus) {
        for _ in 0..windows {
            self.add_score(AUTO_MATCH_WINDOW, events);
        }
    }
}
