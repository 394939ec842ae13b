//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::board::PuyoType;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Puyo and UI colours, One Dark unless a theme file says otherwise.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Puyo colours in ring order: red, green, blue, yellow, purple.
    pub puyo: [Color; 5],
    pub garbage: Color,
    /// Field background.
    pub bg: Color,
    /// Field border and grid.
    pub div_line: Color,
    /// Text (chain, stats).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Hints and empty-cell dots.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_RED: Color = rgb(0xE06C75);
const ONEDARK_GREEN: Color = rgb(0x98C379);
const ONEDARK_BLUE: Color = rgb(0x61AFEF);
const ONEDARK_YELLOW: Color = rgb(0xE5C07B);
const ONEDARK_PURPLE: Color = rgb(0xC678DD);
const ONEDARK_GARBAGE: Color = rgb(0x7F848E);
const ONEDARK_BG: Color = rgb(0x31353F);
const ONEDARK_DIV_LINE: Color = rgb(0x3F444F);
const ONEDARK_MAIN_FG: Color = rgb(0xABB2BF);
const ONEDARK_INACTIVE_FG: Color = rgb(0x5C6370);

impl Theme {
    /// Hardcoded One Dark defaults, exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            puyo: [
                ONEDARK_RED,    // cpu_end / temp_end
                ONEDARK_GREEN,  // mem_box
                ONEDARK_BLUE,   // cpu_box
                ONEDARK_YELLOW, // title / cpu_mid
                ONEDARK_PURPLE, // net_box
            ],
            garbage: ONEDARK_GARBAGE,
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV_LINE,
            main_fg: ONEDARK_MAIN_FG,
            title: ONEDARK_YELLOW,
            inactive_fg: ONEDARK_INACTIVE_FG,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Default theme for a palette when no file is loaded.
    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override puyo colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.puyo = [
                    rgb(0xFF0000), // red
                    rgb(0x00FF00), // green
                    rgb(0x0088FF), // blue
                    rgb(0xFFFF00), // yellow
                    rgb(0xFF00FF), // magenta
                ];
                self.garbage = rgb(0xFFFFFF);
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito style set; no red/green pair on its own
                self.puyo = [
                    rgb(0xCC3311), // vermilion
                    rgb(0x009988), // teal
                    rgb(0x0077BB), // blue
                    rgb(0xEE7733), // orange
                    rgb(0xEE3377), // magenta
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys match onedark.theme; fallbacks are the same file's hex values.
        Self {
            puyo: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(ONEDARK_RED),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(ONEDARK_GREEN),
                get("cpu_box").unwrap_or(ONEDARK_BLUE),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(ONEDARK_YELLOW),
                get("net_box").unwrap_or(ONEDARK_PURPLE),
            ],
            garbage: get("graph_text").unwrap_or(ONEDARK_GARBAGE),
            bg: get("meter_bg").unwrap_or(ONEDARK_BG),
            div_line: get("div_line").unwrap_or(ONEDARK_DIV_LINE),
            main_fg: get("main_fg").unwrap_or(ONEDARK_MAIN_FG),
            title: get("title").unwrap_or(ONEDARK_YELLOW),
            inactive_fg: get("inactive_fg").unwrap_or(ONEDARK_INACTIVE_FG),
        }
    }

    /// Colour to draw a cell with, or `None` for an empty cell.
    #[inline]
    pub fn puyo_color(&self, puyo: PuyoType) -> Option<Color> {
        match puyo {
            PuyoType::None => None,
            PuyoType::Garbage => Some(self.garbage),
            color => color.color_index().map(|i| self.puyo[i]),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&s[range], 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GGGGGG"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#ÄÄÄ"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_rgb_matches_parse_hex() {
        assert_eq!(rgb(0xE06C75), parse_hex("#E06C75").unwrap());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_from_map_overrides_and_falls_back() {
        let map = parse_theme_file(
            r##"
# comment
theme[cpu_end]="#FF0000"
theme[net_box]='#00F'
theme[main_fg]=""
"##,
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.puyo[0], Color::Rgb(255, 0, 0));
        assert_eq!(theme.puyo[4], Color::Rgb(0, 0, 255));
        assert_eq!(theme.puyo[1], ONEDARK_GREEN);
        assert_eq!(theme.main_fg, ONEDARK_MAIN_FG);
    }

    #[test]
    fn test_puyo_color() {
        let theme = Theme::default();
        assert_eq!(theme.puyo_color(PuyoType::None), None);
        assert_eq!(theme.puyo_color(PuyoType::Garbage), Some(theme.garbage));
        assert_eq!(theme.puyo_color(PuyoType::Red), Some(ONEDARK_RED));
        assert_eq!(theme.puyo_color(PuyoType::Purple), Some(ONEDARK_PURPLE));
    }

    #[test]
    fn test_missing_file_uses_palette_defaults() {
        let theme = Theme::load(
            Some(Path::new("/nonexistent/puyotui.theme")),
            Palette::HighContrast,
        )
        .unwrap();
        assert_eq!(theme.puyo[0], Color::Rgb(255, 0, 0));
    }
}
