use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::events::{EventBus, GridEvent};
use crate::grid::{ColorId, Grid, Position};

/// Retries per palette colour before `assign_color` gives up avoiding runs.
pub const RETRIES_PER_COLOR: usize = 4;

const DIRECTIONS: [(isize, isize); 2] = [(1, 0), (0, 1)];

/// Picks colours so that population and refill never leave three aligned
/// same-coloured cells behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorEnforcer {
    palette: Vec<ColorId>,
}

impl ColorEnforcer {
    /// Needs at least two colours: with one, no recolour can ever break a run.
    pub fn new(palette: Vec<ColorId>) -> Result<Self, ConfigError> {
        if palette.len() < 2 {
            return Err(ConfigError::PaletteTooSmall { len: palette.len() });
        }
        Ok(Self { palette })
    }

    pub fn palette(&self) -> &[ColorId] {
        &self.palette
    }

    pub fn max_attempts(&self) -> usize {
        self.palette.len() * RETRIES_PER_COLOR
    }

    pub fn random_color<R: Rng + ?Sized>(&self, rng: &mut R) -> ColorId {
        self.palette[rng.gen_range(0..self.palette.len())]
    }

    /// Uniform pick from the palette. With `forbid_run`, resamples while the
    /// pick would complete a 3-run through `pos`. Once `max_attempts` are spent
    /// the palette is scanned in order for a safe colour; if there is none the
    /// last pick is kept and the fix pass is left to clean up.
    pub fn assign_color<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        pos: Position,
        forbid_run: bool,
        rng: &mut R,
    ) -> ColorId {
        let mut pick = self.random_color(rng);
        if !forbid_run {
            return pick;
        }

        for _ in 1..self.max_attempts() {
            if !completes_run(grid, pos, pick) {
                return pick;
            }
            pick = self.random_color(rng);
        }

        if !completes_run(grid, pos, pick) {
            return pick;
        }
        if let Some(&safe) = self
            .palette
            .iter()
            .find(|&&color| !completes_run(grid, pos, color))
        {
            return safe;
        }

        tracing::warn!(%pos, color = pick.0, "colour retries exhausted, accepting a run");
        pick
    }

    /// Deactivates every cell and assigns fresh colours in row-major order.
    pub fn populate<R: Rng + ?Sized>(&self, grid: &mut Grid, rng: &mut R, events: &mut EventBus) {
        grid.deactivate_all();
        let positions: Vec<Position> = grid.positions().collect();
        for pos in positions {
            let color = self.assign_color(grid, pos, true, rng);
            grid.activate(pos, color);
            events.emit(GridEvent::CellSpawned {
                position: pos,
                color,
            });
        }
        self.fix_existing_runs(grid, rng, events);
    }

    /// Breaks every run of three consecutive active same-coloured cells.
    ///
    /// The first cell of each run is recoloured to a different colour that does
    /// not complete another run; when the first cell has no such colour the
    /// middle and then the last cell are tried. Passes repeat until the grid is
    /// clean or the pass budget (one per cell) runs out. Returns the number of
    /// recoloured cells.
    pub fn fix_existing_runs<R: Rng + ?Sized>(
        &self,
        grid: &mut Grid,
        rng: &mut R,
        events: &mut EventBus,
    ) -> usize {
        if self.palette.len() < 2 {
            return 0;
        }

        let mut corrected = 0;
        for _ in 0..grid.len().max(1) {
            let mut changed = false;
            for run in grid.find_runs() {
                // An earlier fix in this pass may already have broken it.
                if !grid.is_uniform_window(&run) {
                    continue;
                }
                let (pos, color) = self.pick_correction(grid, &run, rng);
                grid.recolor(pos, color);
                events.emit(GridEvent::ColorCorrected {
                    position: pos,
                    color,
                });
                tracing::trace!(%pos, color = color.0, "colour corrected");
                corrected += 1;
                changed = true;
            }
            if !changed {
                return corrected;
            }
        }

        if grid.has_runs() {
            tracing::warn!(corrected, "runs remain after fix pass budget");
        }
        corrected
    }

    fn pick_correction<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        run: &[Position; 3],
        rng: &mut R,
    ) -> (Position, ColorId) {
        for &pos in run {
            if let Some(color) = self.safe_replacement(grid, pos, rng) {
                return (pos, color);
            }
        }

        let first = run[0];
        let current = grid.color_at(first);
        let mut color = self.random_color(rng);
        while Some(color) == current {
            color = self.random_color(rng);
        }
        (first, color)
    }

    fn safe_replacement<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        pos: Position,
        rng: &mut R,
    ) -> Option<ColorId> {
        let current = grid.color_at(pos)?;
        let mut candidates: Vec<ColorId> = self
            .palette
            .iter()
            .copied()
            .filter(|&color| color != current)
            .collect();
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .find(|&color| !completes_run(grid, pos, color))
    }
}

/// Would giving `pos` the colour `color` create three aligned active cells of
/// that colour? The current state of `pos` itself is ignored.
pub fn completes_run(grid: &Grid, pos: Position, color: ColorId) -> bool {
    let same = |dc: isize, dr: isize| grid.color_offset(pos, dc, dr) == Some(color);

    DIRECTIONS.iter().any(|&(dc, dr)| {
        (same(-2 * dc, -2 * dr) && same(-dc, -dr))
            || (same(-dc, -dr) && same(dc, dr))
            || (same(dc, dr) && same(2 * dc, 2 * dr))
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::events::EventLog;

    fn palette(n: u8) -> Vec<ColorId> {
        (0..n).map(ColorId).collect()
    }

    #[test]
    fn completes_run_checks_both_sides_and_centre() {
        let grid = Grid::from_letters(&["AA.BB", "..C..", "..C.."]).unwrap();
        assert!(completes_run(&grid, Position::new(2, 0), ColorId(2)));
        assert!(!completes_run(&grid, Position::new(2, 0), ColorId(3)));
        // Left pair + gap.
        let left = Grid::from_letters(&["AA."]).unwrap();
        assert!(completes_run(&left, Position::new(2, 0), ColorId(0)));
        // Gap in the middle.
        let centre = Grid::from_letters(&["A.A"]).unwrap();
        assert!(completes_run(&centre, Position::new(1, 0), ColorId(0)));
        // Pair to the right.
        let right = Grid::from_letters(&[".BB"]).unwrap();
        assert!(completes_run(&right, Position::new(0, 0), ColorId(1)));
        assert!(!completes_run(&right, Position::new(0, 0), ColorId(0)));
    }

    #[test]
    fn assign_color_avoids_forced_run_when_possible() {
        let grid = Grid::from_letters(&["AA.", "..."]).unwrap();
        let enforcer = ColorEnforcer::new(palette(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let color = enforcer.assign_color(&grid, Position::new(2, 0), true, &mut rng);
            assert_eq!(color, ColorId(1));
        }
    }

    #[test]
    fn assign_color_terminates_when_every_colour_is_forced() {
        // Left pair is A, vertical pair is B: palette {A, B} has no safe pick.
        let grid = Grid::from_letters(&["AA.", "..B", "..B"]).unwrap();
        let enforcer = ColorEnforcer::new(palette(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let color = enforcer.assign_color(&grid, Position::new(2, 0), true, &mut rng);
        assert!(color == ColorId(0) || color == ColorId(1));
    }

    #[test]
    fn fix_existing_runs_breaks_every_run() {
        let mut grid = Grid::from_letters(&["AAAA", "BCBC", "BCAA", "BCCA"]).unwrap();
        let enforcer = ColorEnforcer::new(palette(3)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let log = EventLog::new();
        let mut bus = EventBus::new(vec![log.observer()]);
        let corrected = enforcer.fix_existing_runs(&mut grid, &mut rng, &mut bus);
        assert!(corrected >= 2);
        assert!(!grid.has_runs(), "grid still has runs:\n{grid}");
        assert_eq!(
            log.count(|e| matches!(e, GridEvent::ColorCorrected { .. })),
            corrected
        );
        let mut last = std::collections::BTreeMap::new();
        for event in log.events() {
            if let GridEvent::ColorCorrected { position, color } = event {
                last.insert(position, color);
            }
        }
        for (position, color) in last {
            assert_eq!(grid.color_at(position), Some(color));
        }
    }

    #[test]
    fn enforcer_needs_two_colours() {
        assert!(matches!(
            ColorEnforcer::new(Vec::new()),
            Err(ConfigError::PaletteTooSmall { len: 0 })
        ));
        assert!(matches!(
            ColorEnforcer::new(palette(1)),
            Err(ConfigError::PaletteTooSmall { len: 1 })
        ));
    }

    #[test]
    fn populate_fills_every_cell_without_runs() {
        let enforcer = ColorEnforcer::new(palette(3)).unwrap();
        for seed in 0..20 {
            let mut grid = Grid::new(12, 6);
            let mut rng = StdRng::seed_from_u64(seed);
            enforcer.populate(&mut grid, &mut rng, &mut EventBus::default());
            assert_eq!(grid.active_count(), grid.len());
            assert!(!grid.has_runs(), "seed {seed} left runs:\n{grid}");
        }
    }
}
