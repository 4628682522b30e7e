use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};
use crate::drive::selection::SelectedItem;
use crate::theme::ThemeColors;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
    theme: &'a ThemeColors,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState, theme: &'a ThemeColors) -> Self {
        Self {
            mode,
            dialog_state,
            theme,
        }
    }
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

impl Widget for DialogWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let AppMode::Dialog(kind) = self.mode else {
            return;
        };

        match kind {
            DialogKind::CreateDirectory => {
                self.render_input("New Directory", None, area, buf);
            }
            DialogKind::Rename { item } => {
                let title = if item.is_directory() {
                    "Rename Directory"
                } else {
                    "Rename File"
                };
                self.render_input(title, None, area, buf);
            }
            DialogKind::Upload => {
                self.render_input(
                    "Upload Files",
                    Some("Local paths, separated by spaces"),
                    area,
                    buf,
                );
            }
            DialogKind::DeleteConfirm { item } => self.render_confirm(item, area, buf),
        }
    }
}

impl DialogWidget<'_> {
    fn hint_style(&self) -> Style {
        Style::default()
            .fg(self.theme.dim_fg)
            .add_modifier(Modifier::DIM)
    }

    fn render_input(&self, title: &str, prompt: Option<&str>, area: Rect, buf: &mut Buffer) {
        let width = 56.min(area.width.saturating_sub(4));
        let height = if prompt.is_some() { 6 } else { 5 };
        let rect = centered_rect(width, height, area);

        Clear.render(rect, buf);
        let block = Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let mut input_y = inner.y + inner.height / 2;
        if let Some(prompt) = prompt {
            let line = Line::from(Span::styled(prompt, Style::default().fg(self.theme.info_fg)));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            input_y = inner.y + 1;
        }

        let state = self.dialog_state;
        let input = &state.input;
        let cursor = state.cursor_position.min(input.len());
        let (before, cursor_char, after) = match input[cursor..].chars().next() {
            Some(ch) => {
                let end = cursor + ch.len_utf8();
                (&input[..cursor], &input[cursor..end], &input[end..])
            }
            None => (input.as_str(), " ", ""),
        };

        // Keep the cursor visible by dropping characters from the left.
        let max_width = inner.width as usize;
        let before_chars = before.chars().count();
        let before_display: String = if before_chars + 1 > max_width {
            before
                .chars()
                .skip(before_chars + 2 - max_width.max(1))
                .collect()
        } else {
            before.to_string()
        };

        let input_style = Style::default().fg(self.theme.listing_fg);
        let cursor_style = Style::default()
            .bg(self.theme.listing_fg)
            .fg(self.theme.selected_bg)
            .add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::styled(before_display, input_style),
            Span::styled(cursor_char, cursor_style),
            Span::styled(after, input_style),
        ]);
        buf.set_line(inner.x, input_y, &line, inner.width);

        let hint = if state.pending {
            "Working..."
        } else {
            "[Enter] Confirm  [Esc] Cancel"
        };
        if inner.height > 1 {
            let hint_line = Line::from(Span::styled(hint, self.hint_style()));
            buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
        }
    }

    fn render_confirm(&self, item: &SelectedItem, area: Rect, buf: &mut Buffer) {
        let width = u16::try_from(item.name.chars().count())
            .unwrap_or(u16::MAX)
            .saturating_add(12)
            .max(40)
            .min(area.width.saturating_sub(4));
        let rect = centered_rect(width, 6, area);

        Clear.render(rect, buf);
        let block = Block::default()
            .title(" Delete Confirmation ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.error_fg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let what = if item.is_directory() {
            "directory"
        } else {
            "file"
        };
        let header = Line::from(Span::styled(
            format!("Delete this {}?", what),
            Style::default()
                .fg(self.theme.error_fg)
                .add_modifier(Modifier::BOLD),
        ));
        buf.set_line(inner.x, inner.y, &header, inner.width);

        if inner.height > 2 {
            let name = Line::from(Span::styled(
                format!("  {}", item.name),
                Style::default().fg(self.theme.listing_fg),
            ));
            buf.set_line(inner.x, inner.y + 1, &name, inner.width);
        }

        let hint_line = Line::from(Span::styled("[y] Yes  [n/Esc] Cancel", self.hint_style()));
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::dark_theme;

    fn render(mode: &AppMode, state: &DialogState) -> String {
        let theme = dark_theme();
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(mode, state, &theme).render(area, &mut buf);
        buffer_to_string(&buf, area)
    }

    #[test]
    fn test_create_directory_dialog_renders() {
        let state = DialogState {
            input: "photos".to_string(),
            cursor_position: 6,
            pending: false,
        };
        let content = render(&AppMode::Dialog(DialogKind::CreateDirectory), &state);
        assert!(content.contains("New Directory"));
        assert!(content.contains("photos"));
        assert!(content.contains("[Enter] Confirm"));
    }

    #[test]
    fn test_rename_dialog_title_follows_kind() {
        let state = DialogState {
            input: "docs".to_string(),
            cursor_position: 4,
            pending: true,
        };
        let mode = AppMode::Dialog(DialogKind::Rename {
            item: SelectedItem::directory("docs"),
        });
        let content = render(&mode, &state);
        assert!(content.contains("Rename Directory"));
        assert!(content.contains("docs"));
        assert!(content.contains("Working..."));
    }

    #[test]
    fn test_upload_dialog_has_prompt() {
        let content = render(&AppMode::Dialog(DialogKind::Upload), &DialogState::default());
        assert!(content.contains("Upload Files"));
        assert!(content.contains("separated by spaces"));
    }

    #[test]
    fn test_confirm_dialog_renders() {
        let mode = AppMode::Dialog(DialogKind::DeleteConfirm {
            item: SelectedItem::file("report.pdf"),
        });
        let content = render(&mode, &DialogState::default());
        assert!(content.contains("Delete this file?"));
        assert!(content.contains("report.pdf"));
    }

    #[test]
    fn test_confirm_dialog_with_huge_name_fits_screen() {
        let mode = AppMode::Dialog(DialogKind::DeleteConfirm {
            item: SelectedItem::file("x".repeat(usize::from(u16::MAX) + 10)),
        });
        let content = render(&mode, &DialogState::default());
        assert!(content.contains("Delete this file?"));
    }

    #[test]
    fn test_multibyte_cursor_does_not_panic() {
        let state = DialogState {
            input: "été".to_string(),
            cursor_position: 2,
            pending: false,
        };
        let content = render(&AppMode::Dialog(DialogKind::CreateDirectory), &state);
        assert!(content.contains("New Directory"));
    }

    #[test]
    fn test_no_dialog_mode_noop() {
        let content = render(&AppMode::Normal, &DialogState::default());
        assert!(content.trim().is_empty());
    }

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }
}
