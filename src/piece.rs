//! The player-controlled piece: a 3x3 grid holding two to four linked puyos.

use crate::audio::{SoundEffectId, SoundSink};
use crate::board::{Board, CELL_NUM_X, CELL_NUM_Y, CELL_SIZE_X, CELL_SIZE_Y, PuyoType};
use rand::Rng;

const GRID: usize = 3;

/// Sub-cells a four-puyo piece always occupies, as `(x, y)`.
const SQUARE: [(usize, usize); 4] = [(1, 1), (2, 1), (1, 2), (2, 2)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PuyoPiece {
    /// `puyos[y][x]`, y up. Sub-cell `(0, 0)` sits at the piece position.
    puyos: [[PuyoType; GRID]; GRID],
    num: usize,
    is_big: bool,
    x: f32,
    y: f32,
}

impl Default for PuyoPiece {
    fn default() -> Self {
        Self::new()
    }
}

impl PuyoPiece {
    pub fn new() -> Self {
        Self {
            puyos: [[PuyoType::None; GRID]; GRID],
            num: 0,
            is_big: false,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Piece with an explicit grid, `puyos[y][x]` with y up.
    #[cfg(test)]
    pub fn from_grid(puyos: [[PuyoType; GRID]; GRID]) -> Self {
        let num = puyos.iter().flatten().filter(|p| !p.is_empty()).count();
        let is_big = num == 4 && SQUARE.iter().all(|&(x, y)| puyos[y][x] == puyos[1][1]);
        Self {
            puyos,
            num,
            is_big,
            ..Self::new()
        }
    }

    #[inline]
    pub fn puyo(&self, x: usize, y: usize) -> PuyoType {
        self.puyos[y][x]
    }

    pub fn num_puyos(&self) -> usize {
        self.num
    }

    /// Four puyos of a single colour; rotating recolours instead of turning.
    pub fn is_big(&self) -> bool {
        self.is_big
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn set_position(&mut self, (x, y): (f32, f32)) {
        self.x = x;
        self.y = y;
    }

    pub fn set_position_in_cells(&mut self, x: i32, y: i32) {
        self.set_position((CELL_SIZE_X * x as f32, CELL_SIZE_Y * y as f32));
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Non-empty sub-cells as `(x, y, puyo)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, PuyoType)> + '_ {
        self.puyos.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, p)| !p.is_empty())
                .map(move |(x, &p)| (x, y, p))
        })
    }

    /// Field cell under sub-cell `(0, 0)`. Both axes truncate, so a piece sitting exactly on
    /// a boundary belongs to the lower/left cell.
    pub fn origin_cell(&self) -> (i32, i32) {
        (
            (self.x / CELL_SIZE_X) as i32,
            ((self.y + CELL_SIZE_Y) / CELL_SIZE_Y) as i32 - 1,
        )
    }

    fn random_color<R: Rng>(rng: &mut R) -> PuyoType {
        PuyoType::from_color_index(rng.random_range(0..PuyoType::COLORS.len()))
    }

    /// Rolls a new size and colours. Templates (`●` = puyo, y up):
    ///
    /// ```text
    ///   2      3      4
    /// .●.    .●.    .●●
    /// .●.    .●●    .●●
    /// ...    ...    ...
    /// ```
    pub fn reset_randomly<R: Rng>(&mut self, rng: &mut R) {
        self.num = 2 + rng.random_range(0..3);
        self.puyos = [[PuyoType::None; GRID]; GRID];
        self.is_big = false;

        match self.num {
            2 => {
                self.puyos[2][1] = Self::random_color(rng);
                self.puyos[1][1] = Self::random_color(rng);
            }
            3 => {
                self.puyos[2][1] = Self::random_color(rng);
                self.puyos[1][1] = self.puyos[2][1];
                self.puyos[1][2] = Self::random_color(rng);
            }
            _ => {
                self.puyos[2][1] = Self::random_color(rng);
                self.puyos[1][1] = self.puyos[2][1];
                self.puyos[2][2] = Self::random_color(rng);
                self.puyos[1][2] = self.puyos[2][2];
                self.is_big = self.puyos[2][1] == self.puyos[2][2];
            }
        }
    }

    /// Takes over another piece's shape and colours, keeping this piece's position.
    pub fn copy_type_from(&mut self, other: &Self) {
        self.num = other.num;
        self.is_big = other.is_big;
        self.puyos = other.puyos;
    }

    fn fits(&self, board: &Board) -> bool {
        self.is_in_field() && !self.hits_placed_puyo(board)
    }

    /// Moves one cell sideways. Returns `false` (and stays put) if the piece would leave the
    /// field or overlap the stack.
    pub fn shift(&mut self, direction: Direction, board: &Board, audio: &mut impl SoundSink) -> bool {
        let dx = match direction {
            Direction::Left => -CELL_SIZE_X,
            Direction::Right => CELL_SIZE_X,
        };
        self.translate(dx, 0.0);
        if !self.fits(board) {
            self.translate(-dx, 0.0);
            return false;
        }
        audio.play_sound_effect(SoundEffectId::PieceMove);
        true
    }

    /// Turns the piece 90 degrees. Large puyos step their colour around the ring instead and
    /// other four-puyo pieces cycle their corners in place.
    pub fn rotate(&mut self, direction: Direction, board: &Board, audio: &mut impl SoundSink) -> bool {
        let before = self.puyos;

        if self.num < 4 {
            let mut turned = [[PuyoType::None; GRID]; GRID];
            for (y, row) in before.iter().enumerate() {
                for (x, &puyo) in row.iter().enumerate() {
                    let (nx, ny) = match direction {
                        Direction::Left => (GRID - 1 - y, x),
                        Direction::Right => (y, GRID - 1 - x),
                    };
                    turned[ny][nx] = puyo;
                }
            }
            self.puyos = turned;
        } else if self.is_big {
            let current = before[1][1].color_index().unwrap_or(0);
            let step = match direction {
                Direction::Left => PuyoType::COLORS.len() - 1,
                Direction::Right => 1,
            };
            let next = PuyoType::from_color_index(current + step);
            for (x, y) in SQUARE {
                self.puyos[y][x] = next;
            }
        } else {
            match direction {
                Direction::Left => {
                    self.puyos[1][1] = before[2][1];
                    self.puyos[2][1] = before[2][2];
                    self.puyos[2][2] = before[1][2];
                    self.puyos[1][2] = before[1][1];
                }
                Direction::Right => {
                    self.puyos[1][1] = before[1][2];
                    self.puyos[2][1] = before[1][1];
                    self.puyos[2][2] = before[2][1];
                    self.puyos[1][2] = before[2][2];
                }
            }
        }

        if !self.fits(board) {
            self.puyos = before;
            return false;
        }
        audio.play_sound_effect(SoundEffectId::PieceRotate);
        true
    }

    /// True once the piece sits at or below the floor with some puyo poking through it.
    pub fn has_reached_bottom(&self) -> bool {
        if self.y > 0.0 {
            return false;
        }
        self.cells()
            .any(|(_, sy, _)| self.y + CELL_SIZE_Y * (sy as f32) < 0.0)
    }

    /// Checks the tight bounding box of the piece's puyos against the field edges.
    pub fn is_in_field(&self) -> bool {
        let bounds = self.cells().fold(None::<(usize, usize, usize, usize)>, |acc, (x, y, _)| {
            Some(match acc {
                None => (x, x, y, y),
                Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
            })
        });
        let Some((xmin, xmax, ymin, ymax)) = bounds else {
            return false;
        };

        let left = self.x + CELL_SIZE_X * xmin as f32;
        let bottom = self.y + CELL_SIZE_Y * ymin as f32;
        let right = left + CELL_SIZE_X * (xmax - xmin + 1) as f32;
        let top = bottom + CELL_SIZE_Y * (ymax - ymin + 1) as f32;

        left >= 0.0
            && bottom >= 0.0
            && right <= CELL_SIZE_X * CELL_NUM_X as f32
            && top <= CELL_SIZE_Y * CELL_NUM_Y as f32
    }

    pub fn hits_placed_puyo(&self, board: &Board) -> bool {
        let (cx, cy) = self.origin_cell();
        self.cells()
            .any(|(x, y, _)| board.is_occupied(cx + x as i32, cy + y as i32))
    }

    /// Writes the piece's puyos into the field at the cells `hits_placed_puyo` checks.
    pub fn place_on_field(&self, board: &mut Board) {
        let (cx, cy) = self.origin_cell();
        for (x, y, puyo) in self.cells() {
            board.set(cx + x as i32, cy + y as i32, puyo);
        }
    }
}
