//! Puyos knocked loose from the field, falling on their own until they land again.

use crate::board::{Board, CELL_NUM_X, CELL_NUM_Y, CELL_SIZE_X, CELL_SIZE_Y, GRAVITY_ACCELERATION, MAX_FLOATINGS, PuyoType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingPuyo {
    /// `PuyoType::None` once landed.
    pub puyo_type: PuyoType,
    pub fall_speed: f32,
    pub x: f32,
    pub y: f32,
}

impl FloatingPuyo {
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.puyo_type.is_empty()
    }

    fn column(&self) -> i32 {
        (self.x / CELL_SIZE_X) as i32
    }

    fn land(&mut self, board: &mut Board, row: i32) {
        board.set(self.column(), row, self.puyo_type);
        self.puyo_type = PuyoType::None;
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloatingSet {
    entries: Vec<FloatingPuyo>,
}

impl FloatingSet {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(MAX_FLOATINGS),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Puyos still in the air.
    pub fn iter(&self) -> impl Iterator<Item = &FloatingPuyo> {
        self.entries.iter().filter(|e| e.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.iter().count()
    }

    /// Lifts every unsupported puyo off the board, scanning bottom-up so a whole column
    /// above a gap comes loose in one pass. Returns how many were lifted.
    pub fn search_all_floating(&mut self, board: &mut Board) -> usize {
        self.entries.clear();
        for y in 1..CELL_NUM_Y as i32 {
            for x in 0..CELL_NUM_X as i32 {
                let Some(puyo_type) = board.get(x, y).filter(|p| !p.is_empty()) else {
                    continue;
                };
                if board.is_occupied(x, y - 1) {
                    continue;
                }
                self.entries.push(FloatingPuyo {
                    puyo_type,
                    fall_speed: 0.0,
                    x: CELL_SIZE_X * x as f32,
                    y: CELL_SIZE_Y * y as f32,
                });
                board.set(x, y, PuyoType::None);
            }
        }
        self.entries.len()
    }

    /// Advances every airborne puyo by one tick of gravity, landing those that reach the
    /// floor or the stack. Returns `true` only if nothing was airborne when the step began.
    pub fn fall_step(&mut self, board: &mut Board) -> bool {
        let mut settled = true;
        for entry in self.entries.iter_mut().filter(|e| e.is_active()) {
            settled = false;
            entry.fall_speed += GRAVITY_ACCELERATION;
            entry.y += entry.fall_speed;

            if entry.y <= 0.0 {
                entry.land(board, 0);
                continue;
            }
            let row = (entry.y / CELL_SIZE_Y) as i32;
            if board.is_occupied(entry.column(), row) {
                entry.land(board, row + 1);
            }
        }
        settled
    }
}
