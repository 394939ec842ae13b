//! One player's turn loop: piece control, gravity, chains and topping out.

use crate::audio::SoundSink;
use crate::board::{Board, PIECE_START};
use crate::chain::ChainResolver;
use crate::floating::FloatingSet;
use crate::input::{InputSource, Key};
use crate::piece::{Direction, PuyoPiece};
use rand_chacha::ChaCha12Rng;
use tracing::{debug, info};

/// Random source each player draws pieces from.
pub type GameRng = ChaCha12Rng;

/// Active piece fall per tick, in sub-cell units.
pub const BASE_FALL_SPEED: f32 = 4.0;
/// Applied to the fall speed while fast fall is held.
pub const FAST_FALL_MULTIPLIER: f32 = 5.0;
/// Field drift per tick once lost.
pub const LOSE_SINK_PER_TICK: f32 = 5.0;
pub const LOSE_TILT_DEGREES: f32 = -15.0;
/// Where the current piece is parked while the field resolves.
const HIDDEN_POSITION: (f32, f32) = (-1000.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerIndex {
    One,
    Two,
}

impl PlayerIndex {
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    pub fn number(self) -> u8 {
        self as u8 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The player steers the current piece.
    Controllable,
    /// Loose puyos are dropping and chains resolve.
    Falling,
    /// Reserved for a dedicated pop phase; nothing enters it.
    #[allow(dead_code)]
    Disappearing,
    Lose,
    Win,
}

/// Cosmetic state of a lost field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoseAnimation {
    /// Total downward drift so far.
    pub sink: f32,
    pub tilt_degrees: f32,
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    index: PlayerIndex,
    state: State,
    board: Board,
    floating: FloatingSet,
    curr_piece: PuyoPiece,
    next_pieces: [PuyoPiece; 2],
    resolver: ChainResolver,
    chain_count: u32,
    /// Pops in the current chain, the landing pop included.
    chain_links: u32,
    rng: GameRng,
    lose_animation: LoseAnimation,
    max_chain: u32,
    puyos_cleared: usize,
}

impl PlayerController {
    pub fn new(index: PlayerIndex, rng: GameRng) -> Self {
        let mut player = Self {
            index,
            state: State::Controllable,
            board: Board::new(),
            floating: FloatingSet::new(),
            curr_piece: PuyoPiece::new(),
            next_pieces: [PuyoPiece::new(), PuyoPiece::new()],
            resolver: ChainResolver::new(),
            chain_count: 0,
            chain_links: 0,
            rng,
            lose_animation: LoseAnimation::default(),
            max_chain: 0,
            puyos_cleared: 0,
        };
        player.reset();
        player
    }

    /// Empties the field and deals a fresh current piece plus queue.
    pub fn reset(&mut self) {
        self.board.reset();
        self.floating.clear();
        self.curr_piece.reset_randomly(&mut self.rng);
        for piece in &mut self.next_pieces {
            piece.reset_randomly(&mut self.rng);
        }
        self.curr_piece.set_position_in_cells(PIECE_START.0, PIECE_START.1);
        self.state = State::Controllable;
        self.chain_count = 0;
        self.chain_links = 0;
        self.lose_animation = LoseAnimation::default();
        self.max_chain = 0;
        self.puyos_cleared = 0;
    }

    pub fn index(&self) -> PlayerIndex {
        self.index
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn floating(&self) -> &FloatingSet {
        &self.floating
    }

    pub fn current_piece(&self) -> &PuyoPiece {
        &self.curr_piece
    }

    pub fn next_pieces(&self) -> &[PuyoPiece; 2] {
        &self.next_pieces
    }

    #[cfg(test)]
    pub fn chain_count(&self) -> u32 {
        self.chain_count
    }

    pub fn chain_links(&self) -> u32 {
        self.chain_links
    }

    pub fn max_chain(&self) -> u32 {
        self.max_chain
    }

    pub fn puyos_cleared(&self) -> usize {
        self.puyos_cleared
    }

    pub fn lose_animation(&self) -> LoseAnimation {
        self.lose_animation
    }

    #[cfg(test)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Swaps in a piece at the spawn position.
    #[cfg(test)]
    pub fn set_current_piece(&mut self, piece: PuyoPiece) {
        self.curr_piece = piece;
        self.curr_piece.set_position_in_cells(PIECE_START.0, PIECE_START.1);
    }

    /// Advances one simulation tick.
    pub fn update(&mut self, input: &impl InputSource, audio: &mut impl SoundSink) {
        match self.state {
            State::Controllable => self.update_on_controllable(input, audio),
            State::Falling => self.update_on_falling(audio),
            State::Disappearing => {}
            State::Lose => self.update_on_lose(),
            State::Win => {}
        }
    }

    /// Marks this player the winner. A player who already lost stays lost.
    pub fn win(&mut self) {
        if self.state != State::Lose {
            info!(player = self.index.number(), max_chain = self.max_chain, "player won");
            self.state = State::Win;
        }
    }

    fn update_on_controllable(&mut self, input: &impl InputSource, audio: &mut impl SoundSink) {
        let mut fall_speed = BASE_FALL_SPEED;

        if input.just_pressed(Key::MoveLeft) {
            self.curr_piece.shift(Direction::Left, &self.board, audio);
        }
        if input.just_pressed(Key::MoveRight) {
            self.curr_piece.shift(Direction::Right, &self.board, audio);
        }
        if input.pressed(Key::FastFall) {
            fall_speed *= FAST_FALL_MULTIPLIER;
        }
        if input.just_pressed(Key::RotateLeft) {
            self.curr_piece.rotate(Direction::Left, &self.board, audio);
        }
        if input.just_pressed(Key::RotateRight) {
            self.curr_piece.rotate(Direction::Right, &self.board, audio);
        }

        let before = self.curr_piece.position();
        self.curr_piece.translate(0.0, -fall_speed);

        if self.curr_piece.has_reached_bottom() || self.curr_piece.hits_placed_puyo(&self.board) {
            self.curr_piece.set_position(before);
            self.curr_piece.place_on_field(&mut self.board);
            debug!(
                player = self.index.number(),
                cell = ?self.curr_piece.origin_cell(),
                puyos = self.curr_piece.num_puyos(),
                big = self.curr_piece.is_big(),
                "piece placed"
            );

            if self.floating.search_all_floating(&mut self.board) > 0 {
                self.start_falling();
            } else if self.resolve_chain(audio) {
                self.chain_count = 0;
                if self.floating.search_all_floating(&mut self.board) > 0 {
                    self.start_falling();
                } else {
                    self.prepare_to_drop_next_piece();
                }
            } else {
                self.prepare_to_drop_next_piece();
            }
        }

        self.transit_to_lose_state_if_stacked_up();
    }

    fn update_on_falling(&mut self, audio: &mut impl SoundSink) {
        if !self.floating.fall_step(&mut self.board) {
            return;
        }

        if self.resolve_chain(audio) {
            self.chain_count += 1;
            if self.floating.search_all_floating(&mut self.board) > 0 {
                return;
            }
        }
        self.prepare_to_drop_next_piece();
        self.state = State::Controllable;
        self.transit_to_lose_state_if_stacked_up();
        self.chain_count = 0;
    }

    fn update_on_lose(&mut self) {
        self.lose_animation.sink += LOSE_SINK_PER_TICK;
        self.lose_animation.tilt_degrees = LOSE_TILT_DEGREES;
    }

    fn start_falling(&mut self) {
        debug!(
            player = self.index.number(),
            airborne = self.floating.active_count(),
            "puyos falling"
        );
        self.curr_piece.set_position(HIDDEN_POSITION);
        self.state = State::Falling;
    }

    fn resolve_chain(&mut self, audio: &mut impl SoundSink) -> bool {
        let removed = self
            .resolver
            .search_all_linked(&mut self.board, self.chain_count, audio);
        if removed {
            self.chain_links += 1;
            self.max_chain = self.max_chain.max(self.chain_links);
            self.puyos_cleared += self.resolver.last_removed();
            debug!(
                player = self.index.number(),
                chain_count = self.chain_count,
                link = self.chain_links,
                removed = self.resolver.last_removed(),
                "chain link"
            );
        }
        removed
    }

    /// Shifts the queue forward and deals a new piece at the back.
    fn prepare_to_drop_next_piece(&mut self) {
        let [next, after] = &mut self.next_pieces;
        self.curr_piece.copy_type_from(next);
        next.copy_type_from(after);
        after.reset_randomly(&mut self.rng);
        self.chain_links = 0;
        self.curr_piece.set_position_in_cells(PIECE_START.0, PIECE_START.1);
    }

    fn transit_to_lose_state_if_stacked_up(&mut self) {
        if self.board.is_stacked_up() && self.state != State::Lose {
            info!(
                player = self.index.number(),
                max_chain = self.max_chain,
                cleared = self.puyos_cleared,
                "player topped out"
            );
            self.state = State::Lose;
        }
    }
}
