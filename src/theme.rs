//! Color palettes for the terminal UI.

use ratatui::style::Color;

use crate::config::ThemeConfig;

/// All runtime colors used in the UI.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    pub listing_fg: Color,
    pub selected_bg: Color,
    pub selected_fg: Color,
    pub dir_fg: Color,
    pub file_fg: Color,
    pub header_fg: Color,
    pub status_fg: Color,
    pub border_fg: Color,
    pub dialog_border_fg: Color,
    pub error_fg: Color,
    pub success_fg: Color,
    pub info_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

/// Dark theme using the Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        listing_fg: Color::Rgb(205, 214, 244),
        selected_bg: Color::Rgb(69, 71, 90),
        selected_fg: Color::Rgb(205, 214, 244),
        dir_fg: Color::Rgb(137, 180, 250),
        file_fg: Color::Rgb(205, 214, 244),
        header_fg: Color::Rgb(245, 194, 231),
        status_fg: Color::Rgb(186, 194, 222),
        border_fg: Color::Rgb(88, 91, 112),
        dialog_border_fg: Color::Rgb(137, 220, 235),
        error_fg: Color::Rgb(243, 139, 168),
        success_fg: Color::Rgb(166, 227, 161),
        info_fg: Color::Rgb(137, 220, 235),
        accent_fg: Color::Rgb(203, 166, 247),
        dim_fg: Color::Rgb(108, 112, 134),
    }
}

/// Light theme using the Catppuccin Latte palette.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        listing_fg: Color::Rgb(76, 79, 105),
        selected_bg: Color::Rgb(204, 208, 218),
        selected_fg: Color::Rgb(76, 79, 105),
        dir_fg: Color::Rgb(30, 102, 245),
        file_fg: Color::Rgb(76, 79, 105),
        header_fg: Color::Rgb(234, 118, 203),
        status_fg: Color::Rgb(92, 95, 119),
        border_fg: Color::Rgb(172, 176, 190),
        dialog_border_fg: Color::Rgb(4, 165, 229),
        error_fg: Color::Rgb(210, 15, 57),
        success_fg: Color::Rgb(64, 160, 43),
        info_fg: Color::Rgb(4, 165, 229),
        accent_fg: Color::Rgb(136, 57, 239),
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

/// Parse a hex color string like `"#aabbcc"`. Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

/// Resolve the palette from config: `"light"` or anything else for dark,
/// then apply the accent override if it parses.
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    let mut theme = match config.scheme.as_deref() {
        Some("light") => light_theme(),
        _ => dark_theme(),
    };
    if let Some(accent) = config.accent.as_deref().and_then(parse_hex_color) {
        theme.accent_fg = accent;
    }
    theme
}
