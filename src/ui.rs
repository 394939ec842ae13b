//! Layout and drawing: fields, next queue, stats, pause and game over.

use crate::app::Screen;
use crate::audio::{BackgroundMusicId, SoundEffectId};
use crate::board::{CELL_NUM_X, CELL_NUM_Y, CELL_SIZE_X, CELL_SIZE_Y, OVERFLOW_CELL, PuyoType};
use crate::player::{PlayerController, PlayerIndex, State};
use crate::theme::Theme;
use crate::versus::Versus;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per field cell.
const CELL_WIDTH: u16 = 2;
const FIELD_WIDTH: u16 = CELL_NUM_X as u16 * CELL_WIDTH + 2;
const FIELD_HEIGHT: u16 = CELL_NUM_Y as u16 + 2;
const SIDEBAR_WIDTH: u16 = 16;
const PANEL_WIDTH: u16 = FIELD_WIDTH + SIDEBAR_WIDTH;
const PANEL_GAP: u16 = 4;
/// Title bar + panels + help line.
const MIN_HEIGHT: u16 = FIELD_HEIGHT + 2;

/// Duration of the fade that greys out a lost field.
const LOSE_FADE_MS: u32 = 900;

/// Fade of one lost field (TachyonFX), created the first frame the player is seen in Lose.
#[derive(Default)]
pub struct LoseFade {
    effect: Option<Effect>,
    process_time: Option<Instant>,
    done: bool,
}

impl LoseFade {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn apply(&mut self, frame: &mut Frame, rect: Rect, theme: &Theme, now: Instant) {
        if self.done {
            return;
        }
        let delta = self
            .process_time
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        self.process_time = Some(now);

        let effect = self.effect.get_or_insert_with(|| {
            fx::fade_to(theme.inactive_fg, theme.bg, (LOSE_FADE_MS, Interpolation::Linear))
                .with_area(rect)
        });
        frame.render_effect(effect, rect, TfxDuration::from_millis(delta_ms));
        if effect.done() {
            self.done = true;
            self.effect = None;
        }
    }
}

/// Everything a frame needs besides the match itself.
pub struct DrawContext<'a> {
    pub theme: &'a Theme,
    pub screen: Screen,
    pub paused: bool,
    pub last_sound: Option<SoundEffectId>,
    pub music: Option<BackgroundMusicId>,
    pub no_animation: bool,
    pub now: Instant,
}

/// Draw the match, its overlays and any running lose fades.
pub fn draw(frame: &mut Frame, versus: &Versus, ctx: &DrawContext, fades: &mut [LoseFade]) {
    let area = frame.area();
    let players = versus.players();
    let panels_width = PANEL_WIDTH * players.len() as u16 + PANEL_GAP * (players.len() as u16 - 1);

    if area.width < panels_width || area.height < MIN_HEIGHT {
        Paragraph::new(format!(
            "Terminal too small: need {panels_width}x{MIN_HEIGHT}, have {}x{}",
            area.width, area.height
        ))
        .alignment(Alignment::Center)
        .style(Style::default().fg(ctx.theme.main_fg))
        .render(area, frame.buffer_mut());
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(FIELD_HEIGHT),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .split(area);
    draw_title_bar(frame, versus, ctx, rows[0]);
    draw_help_line(frame, players.len(), ctx.theme, rows[4]);

    let mut constraints = vec![Constraint::Fill(1)];
    for i in 0..players.len() {
        if i > 0 {
            constraints.push(Constraint::Length(PANEL_GAP));
        }
        constraints.push(Constraint::Length(PANEL_WIDTH));
    }
    constraints.push(Constraint::Fill(1));
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(rows[2]);

    for (i, (player, fade)) in players.iter().zip(fades.iter_mut()).enumerate() {
        let panel = columns[1 + i * 2];
        let (field_rect, sidebar_rect) = split_panel(panel, player.index());
        let faded = fade.done || ctx.no_animation;
        draw_field(frame, player, ctx.theme, field_rect, faded);
        draw_sidebar(frame, player, ctx.theme, sidebar_rect);

        if player.state() == State::Lose && !ctx.no_animation {
            fade.apply(frame, field_rect, ctx.theme, ctx.now);
        }
        draw_result_label(frame, player, ctx.theme, field_rect);
    }

    match ctx.screen {
        Screen::Playing if ctx.paused => draw_pause_overlay(frame, ctx.theme, area),
        Screen::Playing => {}
        Screen::GameOver => draw_game_over(frame, versus, ctx.theme, area),
    }
}

/// Player 1 keeps the queue on the right of the field, player 2 mirrors it.
fn split_panel(panel: Rect, index: PlayerIndex) -> (Rect, Rect) {
    let (constraints, field_slot) = match index {
        PlayerIndex::One => (
            [Constraint::Length(FIELD_WIDTH), Constraint::Length(SIDEBAR_WIDTH)],
            0,
        ),
        PlayerIndex::Two => (
            [Constraint::Length(SIDEBAR_WIDTH), Constraint::Length(FIELD_WIDTH)],
            1,
        ),
    };
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(panel);
    (parts[field_slot], parts[1 - field_slot])
}

fn draw_title_bar(frame: &mut Frame, versus: &Versus, ctx: &DrawContext, area: Rect) {
    let mut spans = vec![
        Span::styled(" puyotui ", Style::default().fg(ctx.theme.title).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(" seed {} ", versus.seed()),
            Style::default().fg(ctx.theme.inactive_fg),
        ),
    ];
    if let Some(music) = ctx.music {
        spans.push(Span::styled(
            format!(" ♫ {music:?} "),
            Style::default().fg(ctx.theme.inactive_fg),
        ));
    }
    if let Some(sound) = ctx.last_sound {
        spans.push(Span::styled(
            format!(" ♪ {sound:?} "),
            Style::default().fg(ctx.theme.main_fg),
        ));
    }
    Paragraph::new(Line::from(spans)).render(area, frame.buffer_mut());
}

fn draw_help_line(frame: &mut Frame, players: usize, theme: &Theme, area: Rect) {
    let mut help = String::from(" 1P: A/D move  S drop  ←/→ rotate ");
    if players > 1 {
        help.push_str(" 2P: J/L move  K drop  U/O rotate ");
    }
    help.push_str(" P pause  Q quit ");
    Paragraph::new(Line::from(Span::styled(help, Style::default().fg(theme.inactive_fg))))
        .alignment(Alignment::Center)
        .render(area, frame.buffer_mut());
}

/// Offsets applied to a lost field: it sinks and leans.
#[derive(Debug, Clone, Copy, Default)]
struct FieldOffset {
    sink_rows: i32,
    tilt_tan: f32,
}

impl FieldOffset {
    fn for_player(player: &PlayerController) -> Self {
        let anim = player.lose_animation();
        Self {
            sink_rows: (anim.sink / CELL_SIZE_Y) as i32,
            tilt_tan: anim.tilt_degrees.to_radians().tan(),
        }
    }

    /// Horizontal lean in terminal columns for field row `y`.
    fn shear(self, y: i32) -> i32 {
        (-(y as f32) * self.tilt_tan).round() as i32
    }
}

/// Terminal position of field cell `(x, y)` inside `inner`, if visible.
fn cell_position(inner: Rect, x: i32, y: i32, offset: FieldOffset) -> Option<(u16, u16)> {
    let col = inner.x as i32 + x * CELL_WIDTH as i32 + offset.shear(y);
    let row = inner.y as i32 + (CELL_NUM_Y as i32 - 1 - y) + offset.sink_rows;
    let visible = col >= inner.x as i32
        && col + (CELL_WIDTH as i32) <= (inner.x + inner.width) as i32
        && row >= inner.y as i32
        && row < (inner.y + inner.height) as i32;
    visible.then_some((col as u16, row as u16))
}

fn draw_field(
    frame: &mut Frame,
    player: &PlayerController,
    theme: &Theme,
    area: Rect,
    faded: bool,
) {
    let title = format!(" {}P ", player.index().number());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let offset = FieldOffset::for_player(player);
    let lost = player.state() == State::Lose;
    let color_of = |puyo: PuyoType| {
        if lost && faded {
            Some(theme.inactive_fg)
        } else {
            theme.puyo_color(puyo)
        }
    };
    let buf = frame.buffer_mut();
    let mut put = |x: i32, y: i32, symbol: &str, color: Color| {
        if let Some((col, row)) = cell_position(inner, x, y, offset) {
            buf.set_string(col, row, symbol, Style::default().fg(color).bg(theme.bg));
        }
    };

    let (ox, oy) = OVERFLOW_CELL;
    if !player.board().is_occupied(ox, oy) {
        if let Some(color) = theme.puyo_color(PuyoType::Red) {
            put(ox, oy, "××", color);
        }
    }

    for (x, y, puyo) in player.board().occupied() {
        if let Some(color) = color_of(puyo) {
            put(x, y, "██", color);
        }
    }

    for entry in player.floating().iter() {
        let x = (entry.x / CELL_SIZE_X) as i32;
        let y = (entry.y / CELL_SIZE_Y).round() as i32;
        if let Some(color) = color_of(entry.puyo_type) {
            put(x, y, "██", color);
        }
    }

    if player.state() == State::Controllable {
        let piece = player.current_piece();
        let (cx, cy) = piece.origin_cell();
        for (sx, sy, puyo) in piece.cells() {
            if let Some(color) = color_of(puyo) {
                put(cx + sx as i32, cy + sy as i32, "██", color);
            }
        }
    }
}

fn draw_result_label(frame: &mut Frame, player: &PlayerController, theme: &Theme, area: Rect) {
    let (label, style) = match player.state() {
        State::Win => (" WIN ", Style::default().fg(Color::Black).bg(theme.title).add_modifier(Modifier::BOLD)),
        State::Lose => (" LOSE ", Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD)),
        _ => return,
    };
    let x = area.x + area.width.saturating_sub(label.chars().count() as u16) / 2;
    let y = area.y + area.height / 2;
    frame.buffer_mut().set_string(x, y, label, style);
}

fn draw_sidebar(frame: &mut Frame, player: &PlayerController, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Next (border + title + two previews)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Stats
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled("Next", title_style))).render(
        Rect {
            height: 1.min(next_inner.height),
            ..next_inner
        },
        frame.buffer_mut(),
    );
    for (i, piece) in player.next_pieces().iter().enumerate() {
        let y = next_inner.y + 1 + i as u16 * 3;
        // Dealt pieces only use sub-cells (1..=2, 1..=2).
        for sy in [2usize, 1] {
            for sx in 1..=2usize {
                let Some(color) = theme.puyo_color(piece.puyo(sx, sy)) else {
                    continue;
                };
                let col = next_inner.x + 1 + (sx as u16 - 1) * CELL_WIDTH;
                let row = y + (2 - sy) as u16;
                if row < next_inner.y + next_inner.height {
                    frame
                        .buffer_mut()
                        .set_string(col, row, "██", Style::default().fg(color));
                }
            }
        }
    }

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let status = match player.state() {
        State::Controllable => "playing",
        State::Falling => "chaining",
        State::Disappearing => "popping",
        State::Lose => "lost",
        State::Win => "won",
    };
    let lines = vec![
        stat("Chain: ", player.chain_links().to_string()),
        stat("Max:   ", player.max_chain().to_string()),
        stat("Popped:", format!(" {}", player.puyos_cleared())),
        Line::from(Span::styled(status, Style::default().fg(theme.inactive_fg))),
    ];
    Paragraph::new(ratatui::text::Text::from(lines)).render(stats_inner, frame.buffer_mut());
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Headline for a finished match.
fn result_text(versus: &Versus) -> String {
    match (versus.players().len(), versus.winner()) {
        (_, Some(winner)) => format!(" {}P wins! ", winner.number()),
        (1, None) => " Game Over ".to_string(),
        _ => " Draw ".to_string(),
    }
}

fn draw_game_over(frame: &mut Frame, versus: &Versus, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 32, 6 + versus.players().len() as u16);
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            result_text(versus),
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
    ];
    for player in versus.players() {
        lines.push(Line::from(Span::styled(
            format!(
                " {}P  max chain {}  popped {} ",
                player.index().number(),
                player.max_chain(),
                player.puyos_cleared()
            ),
            fg,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" R — Restart    Q — Quit ", fg)));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .style(Style::default().bg(theme.bg))
            .title(Span::styled(" puyotui ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}
