//! Field grid, cell values and the fixed geometry shared by the simulation.

/// Field columns.
pub const CELL_NUM_X: usize = 6;
/// Field rows; row 0 is the bottom.
pub const CELL_NUM_Y: usize = 14;
/// Width of one cell in sub-cell units.
pub const CELL_SIZE_X: f32 = 64.0;
/// Height of one cell in sub-cell units.
pub const CELL_SIZE_Y: f32 = 60.0;
/// Most puyos that can be airborne at once.
pub const MAX_FLOATINGS: usize = CELL_NUM_X * CELL_NUM_Y;
/// Added to a floating puyo's fall speed every tick (negative = downwards).
pub const GRAVITY_ACCELERATION: f32 = -0.49;
/// Where a fresh piece's 3x3 grid origin appears, in cells.
pub const PIECE_START: (i32, i32) = (1, 11);
/// A puyo left in this cell means the stack has topped out.
pub const OVERFLOW_CELL: (i32, i32) = (2, 11);

/// Contents of a single field cell or piece sub-cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PuyoType {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Garbage,
    #[default]
    None,
}

impl PuyoType {
    /// The colour ring, in order. Large puyos step through it when rotated.
    pub const COLORS: [Self; 5] = [Self::Red, Self::Green, Self::Blue, Self::Yellow, Self::Purple];

    /// Colour at `index` on the ring (wraps).
    pub fn from_color_index(index: usize) -> Self {
        Self::COLORS[index % Self::COLORS.len()]
    }

    /// Position on the colour ring, or `None` for garbage and empty cells.
    pub fn color_index(self) -> Option<usize> {
        Self::COLORS.iter().position(|&c| c == self)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::None
    }
}

/// One player's field. Cells are addressed `(column, row)` with row 0 at the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[PuyoType; CELL_NUM_X]; CELL_NUM_Y],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[PuyoType::None; CELL_NUM_X]; CELL_NUM_Y],
        }
    }

    #[inline]
    fn index(x: i32, y: i32) -> Option<(usize, usize)> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        (x < CELL_NUM_X && y < CELL_NUM_Y).then_some((x, y))
    }

    /// Cell at `(x, y)`, or `None` outside the field.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<PuyoType> {
        Self::index(x, y).map(|(x, y)| self.cells[y][x])
    }

    /// Writes a cell. Writes outside the field are dropped.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, puyo: PuyoType) {
        if let Some((x, y)) = Self::index(x, y) {
            self.cells[y][x] = puyo;
        }
    }

    /// True if `(x, y)` is inside the field and holds a puyo.
    #[inline]
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(|p| !p.is_empty())
    }

    pub fn reset(&mut self) {
        self.cells = [[PuyoType::None; CELL_NUM_X]; CELL_NUM_Y];
    }

    /// Every occupied cell as `(x, y, puyo)`, bottom row first.
    pub fn occupied(&self) -> impl Iterator<Item = (i32, i32, PuyoType)> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, p)| !p.is_empty())
                .map(move |(x, &p)| (x as i32, y as i32, p))
        })
    }

    /// True once the overflow cell has been filled.
    pub fn is_stacked_up(&self) -> bool {
        self.is_occupied(OVERFLOW_CELL.0, OVERFLOW_CELL.1)
    }

    /// Builds a supported column up to the overflow cell. Colours alternate so nothing links,
    /// and the overflow cell itself is garbage so no piece can pop it.
    #[cfg(test)]
    pub fn stack_to_overflow(&mut self) {
        let (x, top) = OVERFLOW_CELL;
        for y in 0..top {
            let puyo = if y % 2 == 0 { PuyoType::Red } else { PuyoType::Green };
            self.set(x, y, puyo);
        }
        self.set(x, top, PuyoType::Garbage);
    }
}
