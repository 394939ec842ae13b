//! App: terminal init, main loop, tick and key handling.

use crate::GameConfig;
use crate::audio::TerminalAudio;
use crate::input::{Action, Keyboard, key_to_action};
use crate::theme::Theme;
use crate::ui::{DrawContext, LoseFade};
use crate::versus::Versus;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tracing::info;

/// Frame budget for redraws and input polling (~60 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(16);
/// Most simulation ticks run in one frame after a stall; the rest are dropped.
const MAX_CATCH_UP_TICKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    versus: Versus,
    keyboard: Keyboard,
    audio: TerminalAudio,
    screen: Screen,
    paused: bool,
    last_tick: Instant,
    tick_interval: Duration,
    lose_fades: [LoseFade; 2],
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let mut audio = TerminalAudio::new(config.bell);
        let versus = Versus::new(config.players, config.seed, &mut audio);
        let tick_interval = config.tick_interval;
        Self {
            config,
            theme,
            versus,
            keyboard: Keyboard::new(),
            audio,
            screen: Screen::Playing,
            paused: false,
            last_tick: Instant::now(),
            tick_interval,
            lose_fades: Default::default(),
        }
    }

    /// Starts a new match. A seed given on the command line replays the same match.
    fn restart(&mut self) {
        if !self.config.fixed_seed {
            self.config.seed = rand::random();
        }
        self.versus = Versus::new(self.config.players, self.config.seed, &mut self.audio);
        self.keyboard.clear();
        self.screen = Screen::Playing;
        self.paused = false;
        self.last_tick = Instant::now();
        for fade in &mut self.lose_fades {
            fade.reset();
        }
    }

    /// One fixed simulation step.
    fn tick(&mut self) {
        self.versus.update(&self.keyboard, &mut self.audio);
        self.keyboard.end_tick();
        if self.versus.is_over() {
            info!(winner = ?self.versus.winner(), "match over");
            self.screen = Screen::GameOver;
        }
    }

    /// Runs every tick that is due, capped at `MAX_CATCH_UP_TICKS`.
    fn run_due_ticks(&mut self, now: Instant) {
        let mut ticks = 0;
        while now.saturating_duration_since(self.last_tick) >= self.tick_interval {
            if ticks == MAX_CATCH_UP_TICKS || self.screen != Screen::Playing {
                self.last_tick = now;
                break;
            }
            self.last_tick += self.tick_interval;
            self.tick();
            ticks += 1;
        }
    }

    /// Applies one key event. Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);
        if let Action::Player(player, game_key) = action {
            let playing = self.screen == Screen::Playing && !self.paused;
            if playing || key.kind == KeyEventKind::Release {
                self.keyboard.handle(player, game_key, key.kind);
            }
            return false;
        }
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match action {
            Action::Quit => return true,
            Action::Pause if self.screen == Screen::Playing => {
                self.paused = !self.paused;
                self.keyboard.clear();
                self.last_tick = Instant::now();
            }
            Action::Restart if self.screen == Screen::GameOver => self.restart(),
            _ => {}
        }
        false
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode().context("enabling raw mode")?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;

        // Release events make held keys exact; terminals without support fall back to a grace window
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.last_tick = Instant::now();
        loop {
            let now = Instant::now();
            let ctx = DrawContext {
                theme: &self.theme,
                screen: self.screen,
                paused: self.paused,
                last_sound: self.audio.last_effect(),
                music: self.audio.music(),
                no_animation: self.config.no_animation,
                now,
            };
            let versus = &self.versus;
            let fades = &mut self.lose_fades;
            terminal.draw(|f| crate::ui::draw(f, versus, &ctx, fades))?;
            self.audio
                .flush_bell(&mut std::io::stdout())
                .context("writing terminal bell")?;

            let timeout = FRAME_DURATION.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && !self.paused {
                self.run_due_ticks(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlayerIndex, State};
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn config(players: usize) -> GameConfig {
        GameConfig {
            players,
            seed: 42,
            fixed_seed: true,
            tick_interval: Duration::from_secs_f64(1.0 / 60.0),
            bell: false,
            no_animation: true,
        }
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_quit_key() {
        let mut app = App::new(config(2), Theme::default());
        assert!(!app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Press)));
        assert!(app.handle_key(key(KeyCode::Char('q'), KeyEventKind::Press)));
    }

    #[test]
    fn test_pause_toggles_and_ignores_play_keys() {
        let mut app = App::new(config(1), Theme::default());
        app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Press));
        assert!(app.paused);
        app.handle_key(key(KeyCode::Char('a'), KeyEventKind::Press));
        let keys = app.keyboard.player(PlayerIndex::One);
        assert!(!crate::input::InputSource::just_pressed(&keys, crate::input::Key::MoveLeft));
        app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Release));
        assert!(app.paused);
        app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Press));
        assert!(!app.paused);
    }

    #[test]
    fn test_ticks_are_capped_after_stall() {
        let mut app = App::new(config(1), Theme::default());
        let start = app.last_tick;
        app.run_due_ticks(start + app.tick_interval * 100);
        assert_eq!(app.last_tick, start + app.tick_interval * 100);
        let y = app.versus.players()[0].current_piece().position().1;
        // Five ticks at base speed from the spawn height.
        assert_eq!(y, 660.0 - 5.0 * crate::player::BASE_FALL_SPEED);
    }

    #[test]
    fn test_game_over_then_restart_replays_seed() {
        let mut app = App::new(config(2), Theme::default());
        let queue = app.versus.players()[0].next_pieces().clone();
        app.versus.players_mut()[1].board_mut().stack_to_overflow();
        app.tick();
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.versus.players()[0].state(), State::Win);

        // Restart only works from the game over screen.
        app.handle_key(key(KeyCode::Char('r'), KeyEventKind::Press));
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.versus.players()[0].next_pieces(), &queue);
        assert_eq!(app.versus.players()[1].state(), State::Controllable);
    }
}
