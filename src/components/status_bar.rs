use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::app::Severity;
use crate::theme::ThemeColors;

/// Status bar: the current path and entry info, or a notification when one
/// is showing, with key hints on the right.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    entry_info: &'a str,
    key_hints: &'a str,
    theme: &'a ThemeColors,
    notification: Option<(&'a str, Severity)>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, entry_info: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            path_str,
            entry_info,
            key_hints: "",
            theme,
            notification: None,
        }
    }

    pub fn key_hints(mut self, hints: &'a str) -> Self {
        self.key_hints = hints;
        self
    }

    pub fn notification(mut self, message: &'a str, severity: Severity) -> Self {
        self.notification = Some((message, severity));
        self
    }
}

/// Keep at most `width` characters, dropping from the left with an ellipsis.
fn truncate_left(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        return s.to_string();
    }
    if width <= 3 {
        return s.chars().skip(len - width).collect();
    }
    let tail: String = s.chars().skip(len - (width - 3)).collect();
    format!("...{}", tail)
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some((message, severity)) = self.notification {
            let style = match severity {
                Severity::Error => Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.selected_bg)
                    .add_modifier(Modifier::BOLD),
                Severity::Success => Style::default().fg(self.theme.success_fg),
                Severity::Info => Style::default().fg(self.theme.info_fg),
            };
            let display: String = message.chars().take(width).collect();
            let display = format!("{:<width$}", display, width = width);
            buf.set_line(area.x, area.y, &Line::from(Span::styled(display, style)), area.width);
            return;
        }

        let hints_len = self.key_hints.chars().count();
        let remaining = width.saturating_sub(hints_len);
        let info_len = self.entry_info.chars().count();
        let path_budget = remaining.saturating_sub(info_len + 1);
        let path_display = truncate_left(self.path_str, path_budget);
        let info_display: String = self
            .entry_info
            .chars()
            .take(remaining.saturating_sub(path_display.chars().count()))
            .collect();
        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_display.chars().count());

        let spans = vec![
            Span::styled(path_display, Style::default().fg(self.theme.status_fg)),
            Span::raw(" ".repeat(gap)),
            Span::styled(info_display, Style::default().fg(self.theme.info_fg)),
            Span::styled(
                self.key_hints,
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::DIM),
            ),
        ];
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
