use std::collections::BTreeSet;

use crate::grid::{Grid, Position};

/// Result of one detector scan: the union of all matched cells plus the
/// individual 3-windows that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoMatch {
    pub cells: BTreeSet<Position>,
    pub windows: Vec<[Position; 3]>,
}

impl AutoMatch {
    /// An empty scan means the grid is stable.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    fn push(&mut self, window: [Position; 3]) {
        self.cells.extend(window);
        self.windows.push(window);
    }
}

/// Scans for exactly-three windows of active same-coloured cells centred on
/// interior cells, horizontally and vertically, plus a horizontal-only pass
/// along the bottom row. Longer runs show up as overlapping windows.
pub fn find_auto_matches(grid: &Grid) -> AutoMatch {
    let mut found = AutoMatch::default();
    let (width, height) = (grid.width(), grid.height());
    if width == 0 || height == 0 || (width < 3 && height < 3) {
        return found;
    }

    for col in 1..width.saturating_sub(1) {
        for row in 1..height.saturating_sub(1) {
            let horizontal = [
                Position::new(col - 1, row),
                Position::new(col, row),
                Position::new(col + 1, row),
            ];
            if grid.is_uniform_window(&horizontal) {
                found.push(horizontal);
            }

            let vertical = [
                Position::new(col, row - 1),
                Position::new(col, row),
                Position::new(col, row + 1),
            ];
            if grid.is_uniform_window(&vertical) {
                found.push(vertical);
            }
        }
    }

    // Floor: the bottom row is never a window centre above, so check it here.
    let floor = height - 1;
    for col in 1..width.saturating_sub(1) {
        let window = [
            Position::new(col - 1, floor),
            Position::new(col, floor),
            Position::new(col + 1, floor),
        ];
        if grid.is_uniform_window(&window) {
            found.push(window);
        }
    }

    if !found.is_empty() {
        tracing::debug!(
            windows = found.windows.len(),
            cells = found.cells.len(),
            "auto matches found"
        );
    }
    found
}
