use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub const MIN_GRID_WIDTH: usize = 2;
pub const MAX_GRID_WIDTH: usize = 12;
pub const MIN_GRID_HEIGHT: usize = 2;
pub const MAX_GRID_HEIGHT: usize = 6;

/// Index into the session palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorId(pub u8);

impl ColorId {
    pub fn letter(self) -> char {
        (b'A' + self.0 % 26) as char
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        upper
            .is_ascii_uppercase()
            .then(|| ColorId(upper as u8 - b'A'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u32);

/// Grid coordinate. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub col: usize,
    pub row: usize,
}

impl Position {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Strict 4-neighbourhood; diagonals are never adjacent.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row) == 1
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    id: CellId,
    position: Position,
    color: ColorId,
    active: bool,
}

impl Cell {
    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn color(&self) -> ColorId {
        self.color
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMove {
    pub from: Position,
    pub to: Position,
    pub color: ColorId,
}

/// Dense `width x height` array of cells. Cells never move or get reallocated;
/// only their colour and active flag change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// A grid with every slot empty (inactive), waiting for population.
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                cells.push(Cell {
                    id: CellId((row * width + col) as u32),
                    position: Position::new(col, row),
                    color: ColorId(0),
                    active: false,
                });
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Builds a grid from rows of letters: `A`.. are colours, `.` is empty.
    /// Returns `None` for ragged rows or unknown characters.
    pub fn from_letters(rows: &[&str]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map(|row| row.chars().count())?;
        if width == 0 {
            return None;
        }

        let mut grid = Grid::new(width, height);
        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return None;
            }
            for (col, ch) in line.chars().enumerate() {
                if ch == '.' {
                    continue;
                }
                let color = ColorId::from_letter(ch)?;
                grid.activate(Position::new(col, row), color);
            }
        }
        Some(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.col < self.width && pos.row < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.row * self.width + pos.col)
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|idx| &self.cells[idx])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().map(|cell| cell.position)
    }

    /// Colour of an active cell; `None` for empty slots and out-of-range positions.
    pub fn color_at(&self, pos: Position) -> Option<ColorId> {
        self.cell(pos)
            .filter(|cell| cell.active)
            .map(|cell| cell.color)
    }

    pub fn is_active(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(|cell| cell.active)
    }

    /// Colour of the active cell at `(col + dc, row + dr)`.
    pub(crate) fn color_offset(&self, pos: Position, dc: isize, dr: isize) -> Option<ColorId> {
        let col = pos.col.checked_add_signed(dc)?;
        let row = pos.row.checked_add_signed(dr)?;
        self.color_at(Position::new(col, row))
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.active).count()
    }

    pub fn inactive_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|cell| !cell.active)
            .map(|cell| cell.position)
            .collect()
    }

    pub fn activate(&mut self, pos: Position, color: ColorId) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        self.cells[idx].color = color;
        self.cells[idx].active = true;
        true
    }

    /// Marks a cell empty. Returns false if it already was (or is out of range).
    pub fn deactivate(&mut self, pos: Position) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        let was_active = self.cells[idx].active;
        self.cells[idx].active = false;
        was_active
    }

    /// Recolours an active cell in place.
    pub fn recolor(&mut self, pos: Position, color: ColorId) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        if !self.cells[idx].active {
            return false;
        }
        self.cells[idx].color = color;
        true
    }

    pub fn deactivate_all(&mut self) {
        for cell in &mut self.cells {
            cell.active = false;
        }
    }

    /// Moves the content of an active slot into an empty one; `from` becomes empty.
    pub(crate) fn move_content(&mut self, from: Position, to: Position) -> Option<CellMove> {
        let from_idx = self.index(from)?;
        let to_idx = self.index(to)?;
        if !self.cells[from_idx].active || self.cells[to_idx].active {
            return None;
        }
        let color = self.cells[from_idx].color;
        self.cells[to_idx].color = color;
        self.cells[to_idx].active = true;
        self.cells[from_idx].active = false;
        Some(CellMove { from, to, color })
    }

    /// Every window of three consecutive active same-coloured cells,
    /// horizontal windows first (row-major), then vertical ones.
    pub fn find_runs(&self) -> Vec<[Position; 3]> {
        let mut runs = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width.saturating_sub(2) {
                let window = [
                    Position::new(col, row),
                    Position::new(col + 1, row),
                    Position::new(col + 2, row),
                ];
                if self.is_uniform_window(&window) {
                    runs.push(window);
                }
            }
        }
        for col in 0..self.width {
            for row in 0..self.height.saturating_sub(2) {
                let window = [
                    Position::new(col, row),
                    Position::new(col, row + 1),
                    Position::new(col, row + 2),
                ];
                if self.is_uniform_window(&window) {
                    runs.push(window);
                }
            }
        }
        runs
    }

    pub fn has_runs(&self) -> bool {
        !self.find_runs().is_empty()
    }

    pub(crate) fn is_uniform_window(&self, window: &[Position; 3]) -> bool {
        match (
            self.color_at(window[0]),
            self.color_at(window[1]),
            self.color_at(window[2]),
        ) {
            (Some(a), Some(b), Some(c)) => a == b && b == c,
            _ => false,
        }
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .map(|cell| cell.active.then_some(cell.color))
                .collect(),
        }
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Plain copy of the grid contents handed to hosts for rendering or logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Option<ColorId>>,
}

impl GridSnapshot {
    pub fn get(&self, pos: Position) -> Option<ColorId> {
        if pos.col >= self.width || pos.row >= self.height {
            return None;
        }
        self.cells[pos.row * self.width + pos.col]
    }

    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                row.iter()
                    .map(|cell| cell.map_or('.', ColorId::letter))
                    .collect()
            })
            .collect()
    }
}

impl Display for GridSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, row) in self.rows().iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{row}")?;
        }
        Ok(())
    }
}
