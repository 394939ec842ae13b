//! A match: one or two players ticking side by side.

use crate::audio::{BackgroundMusicId, SoundSink};
use crate::input::Keyboard;
use crate::player::{GameRng, PlayerController, PlayerIndex, State};
use rand::SeedableRng;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Versus {
    players: Vec<PlayerController>,
    seed: u64,
}

impl Versus {
    /// Sets up `num_players` fields (clamped to 1..=2), each drawing from its own generator
    /// seeded `seed + index`, and starts the music.
    pub fn new(num_players: usize, seed: u64, audio: &mut impl SoundSink) -> Self {
        let players = PlayerIndex::ALL
            .iter()
            .take(num_players.clamp(1, PlayerIndex::ALL.len()))
            .map(|&index| {
                let rng = GameRng::seed_from_u64(seed.wrapping_add(index as u64));
                PlayerController::new(index, rng)
            })
            .collect::<Vec<_>>();
        info!(seed, players = players.len(), "match started");
        audio.play_background_music(BackgroundMusicId::MainTheme);
        Self { players, seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn players(&self) -> &[PlayerController] {
        &self.players
    }

    #[cfg(test)]
    pub fn players_mut(&mut self) -> &mut [PlayerController] {
        &mut self.players
    }

    /// Ticks every player in order, then crowns the last one standing.
    pub fn update(&mut self, keyboard: &Keyboard, audio: &mut impl SoundSink) {
        for player in &mut self.players {
            player.update(&keyboard.player(player.index()), audio);
        }

        if self.players.len() < 2 || self.players.iter().any(|p| p.state() == State::Win) {
            return;
        }
        let mut standing = self.players.iter_mut().filter(|p| p.state() != State::Lose);
        if let (Some(survivor), None) = (standing.next(), standing.next()) {
            survivor.win();
        }
    }

    /// Solo: the player lost. Versus: someone won, or everyone topped out on the same tick.
    pub fn is_over(&self) -> bool {
        self.players.iter().any(|p| p.state() == State::Win)
            || self.players.iter().all(|p| p.state() == State::Lose)
    }

    pub fn winner(&self) -> Option<PlayerIndex> {
        self.players
            .iter()
            .find(|p| p.state() == State::Win)
            .map(PlayerController::index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RecordingAudio;
    use crate::input::Key;

    #[test]
    fn test_new_starts_music_and_seeds_players() {
        let mut audio = RecordingAudio::default();
        let versus = Versus::new(2, 1234, &mut audio);
        assert_eq!(audio.music, vec![BackgroundMusicId::MainTheme]);
        assert_eq!(versus.players().len(), 2);
        assert_eq!(versus.players()[0].index(), PlayerIndex::One);
        assert_eq!(versus.players()[1].index(), PlayerIndex::Two);

        let solo = PlayerController::new(PlayerIndex::Two, GameRng::seed_from_u64(1235));
        assert_eq!(solo.next_pieces(), versus.players()[1].next_pieces());
    }

    #[test]
    fn test_player_count_is_clamped() {
        let mut audio = RecordingAudio::default();
        assert_eq!(Versus::new(0, 1, &mut audio).players().len(), 1);
        assert_eq!(Versus::new(5, 1, &mut audio).players().len(), 2);
    }

    #[test]
    fn test_topped_out_player_hands_win_to_other() {
        let mut audio = RecordingAudio::default();
        let mut versus = Versus::new(2, 9, &mut audio);
        versus.players_mut()[1].board_mut().stack_to_overflow();
        assert!(!versus.is_over());

        versus.update(&Keyboard::new(), &mut audio);
        assert_eq!(versus.players()[1].state(), State::Lose);
        assert_eq!(versus.players()[0].state(), State::Win);
        assert!(versus.is_over());
        assert_eq!(versus.winner(), Some(PlayerIndex::One));
    }

    #[test]
    fn test_simultaneous_top_out_is_a_draw() {
        let mut audio = RecordingAudio::default();
        let mut versus = Versus::new(2, 4, &mut audio);
        for player in versus.players_mut() {
            player.board_mut().stack_to_overflow();
        }
        versus.update(&Keyboard::new(), &mut audio);
        assert!(versus.is_over());
        assert_eq!(versus.winner(), None);
    }

    #[test]
    fn test_solo_game_over_on_lose() {
        let mut audio = RecordingAudio::default();
        let mut versus = Versus::new(1, 3, &mut audio);
        versus.update(&Keyboard::new(), &mut audio);
        assert!(!versus.is_over());
        versus.players_mut()[0].board_mut().stack_to_overflow();
        versus.update(&Keyboard::new(), &mut audio);
        assert_eq!(versus.players()[0].state(), State::Lose);
        assert!(versus.is_over());
        assert_eq!(versus.winner(), None);
    }

    #[test]
    fn test_each_player_reads_own_keys() {
        let mut audio = RecordingAudio::default();
        let mut versus = Versus::new(2, 5, &mut audio);
        let mut keyboard = Keyboard::new();
        keyboard.press(PlayerIndex::Two, Key::MoveRight);
        versus.update(&keyboard, &mut audio);
        let cols: Vec<_> = versus
            .players()
            .iter()
            .map(|p| p.current_piece().origin_cell().0)
            .collect();
        assert_eq!(cols, [1, 2]);
    }
}
