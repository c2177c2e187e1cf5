//! UI colors
//! Optionally read from a kitty.conf style file (`theme_file` in config.toml)

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Focused borders, key hints
    pub danger: Color,      // Error replies
    pub warning: Color,     // Status line, loading indicator
    pub text: Color,
    pub text_dim: Color,
    pub code_bg: Color,     // Background behind code replies
    pub inactive: Color,    // Unfocused borders
    pub header: Color,      // Navbar
    pub line_number: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(137, 180, 250),
            danger: Color::Rgb(243, 139, 168),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            code_bg: Color::Rgb(49, 50, 68),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(245, 194, 231),
            line_number: Color::Rgb(108, 112, 134),
        }
    }
}

impl Theme {
    /// Load from `path`, falling back to defaults for anything missing
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match fs::read_to_string(path) {
                Ok(content) => Self::from_kitty_conf(&content),
                Err(e) => {
                    tracing::warn!("Could not read theme {}: {}", path.display(), e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    fn from_kitty_conf(content: &str) -> Self {
        let colors = Self::parse_kitty_conf(content);
        let base = Self::default();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k))
                .copied()
                .unwrap_or(fallback)
        };

        Self {
            accent: pick(&["color4", "color12"], base.accent),
            danger: pick(&["color1", "color9"], base.danger),
            warning: pick(&["color3", "color11"], base.warning),
            text: pick(&["foreground"], base.text),
            text_dim: pick(&["color8"], base.text_dim),
            code_bg: pick(&["selection_background", "color0"], base.code_bg),
            inactive: pick(&["inactive_border_color", "color8"], base.inactive),
            header: pick(&["color5", "color13"], base.header),
            line_number: pick(&["color8"], base.line_number),
        }
    }

    /// Parse kitty.conf format: `key value` or `key #hexcolor`
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once(char::is_whitespace) {
                if let Some(color) = Self::parse_hex_color(value) {
                    colors.insert(key.trim().to_string(), color);
                }
            }
        }

        colors
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
