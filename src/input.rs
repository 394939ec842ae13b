//! Key bindings for both players and the per-tick key state the simulation polls.

use crate::player::PlayerIndex;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Ticks a key stays held after its last press/repeat when the terminal never reports
/// releases.
pub const HOLD_GRACE_TICKS: u32 = 12;

/// Game keys, per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    MoveLeft,
    MoveRight,
    FastFall,
    RotateLeft,
    RotateRight,
}

impl Key {
    const COUNT: usize = 5;
}

/// Key state as the simulation sees it during one tick.
pub trait InputSource {
    /// Went down since the previous tick.
    fn just_pressed(&self, key: Key) -> bool;
    /// Currently down.
    fn pressed(&self, key: Key) -> bool;
}

/// Action from a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Player(PlayerIndex, Key),
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to action. Player 1 uses `A`/`D`/`S` and the arrows, player 2 uses
/// `J`/`L`/`K` with `U`/`O` for rotation.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    let code = match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };
    use PlayerIndex::{One, Two};
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Char('a') => Action::Player(One, Key::MoveLeft),
        KeyCode::Char('d') => Action::Player(One, Key::MoveRight),
        KeyCode::Char('s') => Action::Player(One, Key::FastFall),
        KeyCode::Left => Action::Player(One, Key::RotateLeft),
        KeyCode::Right => Action::Player(One, Key::RotateRight),
        KeyCode::Char('j') => Action::Player(Two, Key::MoveLeft),
        KeyCode::Char('l') => Action::Player(Two, Key::MoveRight),
        KeyCode::Char('k') => Action::Player(Two, Key::FastFall),
        KeyCode::Char('u') => Action::Player(Two, Key::RotateLeft),
        KeyCode::Char('o') => Action::Player(Two, Key::RotateRight),
        _ => Action::None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    held: bool,
    just_pressed: bool,
    grace: u32,
}

/// Held/just-pressed state for every player key, fed by terminal key events and aged
/// once per simulation tick.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    keys: [[KeyState; Key::COUNT]; 2],
    /// Set after the first release event; from then on held state is exact.
    reports_release: bool,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&mut self, player: PlayerIndex, key: Key) -> &mut KeyState {
        &mut self.keys[player as usize][key as usize]
    }

    /// Feeds one key event for a player key.
    pub fn handle(&mut self, player: PlayerIndex, key: Key, kind: KeyEventKind) {
        match kind {
            KeyEventKind::Press => self.press(player, key),
            KeyEventKind::Repeat => {
                let state = self.state(player, key);
                state.held = true;
                state.grace = HOLD_GRACE_TICKS;
            }
            KeyEventKind::Release => self.release(player, key),
        }
    }

    pub fn press(&mut self, player: PlayerIndex, key: Key) {
        let state = self.state(player, key);
        state.just_pressed = true;
        state.held = true;
        state.grace = HOLD_GRACE_TICKS;
    }

    pub fn release(&mut self, player: PlayerIndex, key: Key) {
        self.reports_release = true;
        let state = self.state(player, key);
        state.held = false;
        state.grace = 0;
    }

    /// Clears edge state after a tick and ages held keys when releases are not reported.
    pub fn end_tick(&mut self) {
        let exact = self.reports_release;
        for state in self.keys.iter_mut().flatten() {
            state.just_pressed = false;
            if !exact && state.held {
                state.grace = state.grace.saturating_sub(1);
                state.held = state.grace > 0;
            }
        }
    }

    /// Drops every key, e.g. across pause or restart.
    pub fn clear(&mut self) {
        self.keys = Default::default();
    }

    /// View of one player's keys.
    pub fn player(&self, index: PlayerIndex) -> PlayerKeys<'_> {
        PlayerKeys {
            keys: &self.keys[index as usize],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerKeys<'a> {
    keys: &'a [KeyState; Key::COUNT],
}

impl InputSource for PlayerKeys<'_> {
    fn just_pressed(&self, key: Key) -> bool {
        self.keys[key as usize].just_pressed
    }

    fn pressed(&self, key: Key) -> bool {
        self.keys[key as usize].held
    }
}

/// Fixed key state for driving the simulation in tests.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pub just_pressed: Vec<Key>,
    pub held: Vec<Key>,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn tap(key: Key) -> Self {
        Self {
            just_pressed: vec![key],
            held: vec![key],
        }
    }

    pub fn hold(key: Key) -> Self {
        Self {
            just_pressed: Vec::new(),
            held: vec![key],
        }
    }
}

#[cfg(test)]
impl InputSource for ScriptedInput {
    fn just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    fn pressed(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_player_one_bindings() {
        use PlayerIndex::One;
        assert_eq!(key_to_action(press(KeyCode::Char('a'))), Action::Player(One, Key::MoveLeft));
        assert_eq!(key_to_action(press(KeyCode::Char('d'))), Action::Player(One, Key::MoveRight));
        assert_eq!(key_to_action(press(KeyCode::Char('s'))), Action::Player(One, Key::FastFall));
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::Player(One, Key::RotateLeft));
        assert_eq!(key_to_action(press(KeyCode::Right)), Action::Player(One, Key::RotateRight));
    }

    #[test]
    fn test_player_two_bindings() {
        use PlayerIndex::Two;
        assert_eq!(key_to_action(press(KeyCode::Char('j'))), Action::Player(Two, Key::MoveLeft));
        assert_eq!(key_to_action(press(KeyCode::Char('l'))), Action::Player(Two, Key::MoveRight));
        assert_eq!(key_to_action(press(KeyCode::Char('k'))), Action::Player(Two, Key::FastFall));
        assert_eq!(key_to_action(press(KeyCode::Char('u'))), Action::Player(Two, Key::RotateLeft));
        assert_eq!(key_to_action(press(KeyCode::Char('o'))), Action::Player(Two, Key::RotateRight));
    }

    #[test]
    fn test_shell_bindings() {
        assert_eq!(key_to_action(press(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(key_to_action(press(KeyCode::Char('p'))), Action::Pause);
        assert_eq!(key_to_action(press(KeyCode::Char('r'))), Action::Restart);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_shift_and_modifiers() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Action::Player(PlayerIndex::One, Key::MoveLeft)
        );
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(key_to_action(press(KeyCode::Char('x'))), Action::None);
    }

    #[test]
    fn test_just_pressed_lasts_one_tick() {
        let mut keyboard = Keyboard::new();
        keyboard.press(PlayerIndex::One, Key::RotateLeft);
        assert!(keyboard.player(PlayerIndex::One).just_pressed(Key::RotateLeft));
        assert!(!keyboard.player(PlayerIndex::Two).just_pressed(Key::RotateLeft));
        keyboard.end_tick();
        assert!(!keyboard.player(PlayerIndex::One).just_pressed(Key::RotateLeft));
    }

    #[test]
    fn test_hold_expires_without_release_events() {
        let mut keyboard = Keyboard::new();
        keyboard.press(PlayerIndex::Two, Key::FastFall);
        for _ in 0..HOLD_GRACE_TICKS - 1 {
            keyboard.end_tick();
            assert!(keyboard.player(PlayerIndex::Two).pressed(Key::FastFall));
        }
        keyboard.end_tick();
        assert!(!keyboard.player(PlayerIndex::Two).pressed(Key::FastFall));
    }

    #[test]
    fn test_repeat_extends_hold() {
        let mut keyboard = Keyboard::new();
        keyboard.press(PlayerIndex::One, Key::FastFall);
        for _ in 0..HOLD_GRACE_TICKS * 3 {
            keyboard.handle(PlayerIndex::One, Key::FastFall, KeyEventKind::Repeat);
            keyboard.end_tick();
            assert!(keyboard.player(PlayerIndex::One).pressed(Key::FastFall));
            assert!(!keyboard.player(PlayerIndex::One).just_pressed(Key::FastFall));
        }
    }

    #[test]
    fn test_release_events_make_hold_exact() {
        let mut keyboard = Keyboard::new();
        keyboard.handle(PlayerIndex::One, Key::MoveLeft, KeyEventKind::Press);
        keyboard.handle(PlayerIndex::One, Key::MoveLeft, KeyEventKind::Release);
        // A tap inside one tick still registers.
        assert!(keyboard.player(PlayerIndex::One).just_pressed(Key::MoveLeft));
        assert!(!keyboard.player(PlayerIndex::One).pressed(Key::MoveLeft));

        keyboard.handle(PlayerIndex::One, Key::FastFall, KeyEventKind::Press);
        for _ in 0..HOLD_GRACE_TICKS * 2 {
            keyboard.end_tick();
        }
        assert!(keyboard.player(PlayerIndex::One).pressed(Key::FastFall));
        keyboard.handle(PlayerIndex::One, Key::FastFall, KeyEventKind::Release);
        assert!(!keyboard.player(PlayerIndex::One).pressed(Key::FastFall));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut keyboard = Keyboard::new();
        keyboard.press(PlayerIndex::One, Key::MoveRight);
        keyboard.clear();
        let keys = keyboard.player(PlayerIndex::One);
        assert!(!keys.pressed(Key::MoveRight));
        assert!(!keys.just_pressed(Key::MoveRight));
    }
}
