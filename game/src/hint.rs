use crate::grid::{Grid, Position};

const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Upper bound on DFS nodes visited per start cell.
const SEARCH_BUDGET: usize = 4_096;

/// Finds a selectable chain of at least `min_len` cells, scanning start cells
/// in row-major order. The returned path obeys the same rules as
/// `SelectionController::extend`.
pub fn find_chain(grid: &Grid, min_len: usize) -> Option<Vec<Position>> {
    let target = min_len.max(1);
    grid.positions()
        .filter(|&pos| grid.is_active(pos))
        .find_map(|start| {
            let mut path = vec![start];
            let mut budget = SEARCH_BUDGET;
            extend_path(grid, &mut path, target, &mut budget).then_some(path)
        })
}

fn extend_path(grid: &Grid, path: &mut Vec<Position>, target: usize, budget: &mut usize) -> bool {
    if path.len() >= target {
        return true;
    }
    if *budget == 0 {
        return false;
    }
    *budget -= 1;

    let Some(&tail) = path.last() else {
        return false;
    };
    let Some(color) = grid.color_at(tail) else {
        return false;
    };

    for (dc, dr) in NEIGHBOR_OFFSETS {
        let (Some(col), Some(row)) = (
            tail.col.checked_add_signed(dc),
            tail.row.checked_add_signed(dr),
        ) else {
            continue;
        };
        let next = Position::new(col, row);
        if grid.color_at(next) != Some(color) || path.contains(&next) {
            continue;
        }
        path.push(next);
        if extend_path(grid, path, target, budget) {
            return true;
        }
        path.pop();
    }
    false
}
