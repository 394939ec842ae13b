//! Connected-group detection and removal.

use crate::audio::{SoundEffectId, SoundSink};
use crate::board::{Board, CELL_NUM_X, CELL_NUM_Y, PuyoType};

/// Smallest group that pops.
pub const MIN_LINKED: usize = 4;

const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

#[derive(Debug, Clone, Default)]
pub struct ChainResolver {
    searched: [[bool; CELL_NUM_X]; CELL_NUM_Y],
    group: Vec<(i32, i32)>,
    stack: Vec<(i32, i32)>,
    last_removed: usize,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells removed by the most recent `search_all_linked`.
    pub fn last_removed(&self) -> usize {
        self.last_removed
    }

    fn is_searched(&self, x: i32, y: i32) -> bool {
        self.searched[y as usize][x as usize]
    }

    fn mark(&mut self, x: i32, y: i32) {
        self.searched[y as usize][x as usize] = true;
    }

    /// Collects the 4-connected group of `puyo` containing `(x, y)` into `self.group`.
    fn collect_group(&mut self, board: &Board, x: i32, y: i32, puyo: PuyoType) {
        self.group.clear();
        self.stack.clear();
        self.mark(x, y);
        self.stack.push((x, y));

        while let Some((cx, cy)) = self.stack.pop() {
            self.group.push((cx, cy));
            for (dx, dy) in NEIGHBORS {
                let (nx, ny) = (cx + dx, cy + dy);
                if board.get(nx, ny) == Some(puyo) && !self.is_searched(nx, ny) {
                    self.mark(nx, ny);
                    self.stack.push((nx, ny));
                }
            }
        }
    }

    /// Removes every group of at least [`MIN_LINKED`] same-type puyos and plays the chain
    /// effect for `chain_count`. Returns whether anything was removed.
    pub fn search_all_linked(
        &mut self,
        board: &mut Board,
        chain_count: u32,
        audio: &mut impl SoundSink,
    ) -> bool {
        self.searched = [[false; CELL_NUM_X]; CELL_NUM_Y];
        self.last_removed = 0;

        for y in 0..CELL_NUM_Y as i32 {
            for x in 0..CELL_NUM_X as i32 {
                if self.is_searched(x, y) {
                    continue;
                }
                let Some(puyo) = board.get(x, y).filter(|p| !p.is_empty()) else {
                    continue;
                };
                self.collect_group(board, x, y, puyo);
                if self.group.len() >= MIN_LINKED {
                    for &(gx, gy) in &self.group {
                        board.set(gx, gy, PuyoType::None);
                    }
                    self.last_removed += self.group.len();
                }
            }
        }

        let removed = self.last_removed > 0;
        if removed {
            audio.play_sound_effect(SoundEffectId::for_chain(chain_count));
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;

    fn board_with(cells: &[(i32, i32, PuyoType)]) -> Board {
        let mut board = Board::new();
        for &(x, y, p) in cells {
            board.set(x, y, p);
        }
        board
    }

    /// Sizes every same-type component by a separate label-propagation pass.
    fn component_sizes(board: &Board) -> Vec<Vec<usize>> {
        let mut label = vec![vec![usize::MAX; CELL_NUM_X]; CELL_NUM_Y];
        let mut sizes = Vec::new();
        for y in 0..CELL_NUM_Y {
            for x in 0..CELL_NUM_X {
                if label[y][x] != usize::MAX || !board.is_occupied(x as i32, y as i32) {
                    continue;
                }
                let id = sizes.len();
                let puyo = board.get(x as i32, y as i32);
                let mut queue = std::collections::VecDeque::from([(x, y)]);
                label[y][x] = id;
                let mut size = 0;
                while let Some((cx, cy)) = queue.pop_front() {
                    size += 1;
                    for (dx, dy) in NEIGHBORS {
                        let (nx, ny) = (cx as i32 + dx, cy as i32 + dy);
                        if board.get(nx, ny) == puyo && label[ny as usize][nx as usize] == usize::MAX {
                            label[ny as usize][nx as usize] = id;
                            queue.push_back((nx as usize, ny as usize));
                        }
                    }
                }
                sizes.push(size);
            }
        }
        label
            .into_iter()
            .map(|row| row.into_iter().map(|id| sizes.get(id).copied().unwrap_or(0)).collect())
            .collect()
    }

    #[test]
    fn test_square_of_four_is_removed() {
        let mut board = board_with(&[
            (0, 0, PuyoType::Red),
            (1, 0, PuyoType::Red),
            (0, 1, PuyoType::Red),
            (1, 1, PuyoType::Red),
        ]);
        let mut resolver = ChainResolver::new();
        let mut audio = RecordingAudio::default();
        assert!(resolver.search_all_linked(&mut board, 0, &mut audio));
        assert_eq!(board, Board::new());
        assert_eq!(resolver.last_removed(), 4);
        assert_eq!(audio.effects, vec![SoundEffectId::Chain01]);
    }

    #[test]
    fn test_three_in_l_shape_stays() {
        let mut board = board_with(&[
            (0, 0, PuyoType::Red),
            (1, 0, PuyoType::Red),
            (0, 1, PuyoType::Red),
        ]);
        let before = board.clone();
        let mut resolver = ChainResolver::new();
        let mut audio = RecordingAudio::default();
        assert!(!resolver.search_all_linked(&mut board, 0, &mut audio));
        assert_eq!(board, before);
        assert_eq!(resolver.last_removed(), 0);
        assert!(audio.effects.is_empty());
    }

    #[test]
    fn test_colors_do_not_mix() {
        let mut board = board_with(&[
            (0, 0, PuyoType::Red),
            (1, 0, PuyoType::Red),
            (2, 0, PuyoType::Blue),
            (3, 0, PuyoType::Blue),
            (0, 1, PuyoType::Blue),
            (1, 1, PuyoType::Blue),
            (2, 1, PuyoType::Red),
            (3, 1, PuyoType::Red),
        ]);
        let before = board.clone();
        let mut resolver = ChainResolver::new();
        assert!(!resolver.search_all_linked(&mut board, 0, &mut RecordingAudio::default()));
        assert_eq!(board, before);
    }

    #[test]
    fn test_two_groups_in_one_pass() {
        let mut cells = Vec::new();
        for y in 0..4 {
            cells.push((0, y, PuyoType::Green));
            cells.push((5, y, PuyoType::Purple));
        }
        cells.push((5, 4, PuyoType::Purple));
        cells.push((2, 0, PuyoType::Yellow));
        let mut board = board_with(&cells);
        let mut resolver = ChainResolver::new();
        let mut audio = RecordingAudio::default();
        assert!(resolver.search_all_linked(&mut board, 2, &mut audio));
        assert_eq!(resolver.last_removed(), 9);
        assert_eq!(board.occupied().collect::<Vec<_>>(), [(2, 0, PuyoType::Yellow)]);
        assert_eq!(audio.effects, vec![SoundEffectId::Chain03]);
    }

    #[test]
    fn test_garbage_groups_like_any_type() {
        let mut board = board_with(&[
            (0, 0, PuyoType::Garbage),
            (1, 0, PuyoType::Garbage),
            (2, 0, PuyoType::Garbage),
            (3, 0, PuyoType::Garbage),
        ]);
        let mut resolver = ChainResolver::new();
        assert!(resolver.search_all_linked(&mut board, 0, &mut RecordingAudio::default()));
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_chain_sound_caps_at_seventh() {
        let square = [(0, 0), (1, 0), (0, 1), (1, 1)];
        let mut resolver = ChainResolver::new();
        let mut audio = RecordingAudio::default();
        for chain_count in [6, 7, 12] {
            let mut board = Board::new();
            for (x, y) in square {
                board.set(x, y, PuyoType::Blue);
            }
            resolver.search_all_linked(&mut board, chain_count, &mut audio);
        }
        assert_eq!(audio.count(SoundEffectId::Chain07), 3);
    }

    #[test]
    fn test_full_field_of_one_color() {
        let mut board = Board::new();
        for y in 0..CELL_NUM_Y as i32 {
            for x in 0..CELL_NUM_X as i32 {
                board.set(x, y, PuyoType::Red);
            }
        }
        let mut resolver = ChainResolver::new();
        assert!(resolver.search_all_linked(&mut board, 0, &mut RecordingAudio::default()));
        assert_eq!(resolver.last_removed(), CELL_NUM_X * CELL_NUM_Y);
        assert_eq!(board.occupied().count(), 0);
    }

    #[test]
    fn test_removes_exactly_large_components() {
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let mut resolver = ChainResolver::new();
        for _ in 0..100 {
            let mut board = Board::new();
            for y in 0..CELL_NUM_Y as i32 {
                for x in 0..CELL_NUM_X as i32 {
                    // Three colours plus gaps keep components of every size common.
                    let pick = rng.random_range(0..4);
                    if pick < 3 {
                        board.set(x, y, PuyoType::from_color_index(pick));
                    }
                }
            }
            let sizes = component_sizes(&board);
            let before = board.clone();
            let mut audio = RecordingAudio::default();
            let removed = resolver.search_all_linked(&mut board, 0, &mut audio);

            let mut expected_removed = 0;
            for y in 0..CELL_NUM_Y {
                for x in 0..CELL_NUM_X {
                    let (xi, yi) = (x as i32, y as i32);
                    if sizes[y][x] >= MIN_LINKED {
                        expected_removed += 1;
                        assert_eq!(board.get(xi, yi), Some(PuyoType::None));
                    } else {
                        assert_eq!(board.get(xi, yi), before.get(xi, yi));
                    }
                }
            }
            assert_eq!(resolver.last_removed(), expected_removed);
            assert_eq!(removed, expected_removed > 0);

            // Nothing left to pop without gravity in between.
            let settled = board.clone();
            assert!(!resolver.search_all_linked(&mut board, 1, &mut audio));
            assert_eq!(board, settled);
        }
    }
}
