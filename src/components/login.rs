use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{LoginField, LoginForm};
use crate::components::dialog::centered_rect;
use crate::theme::ThemeColors;

/// Login form shown while logged out. The password is masked.
pub struct LoginWidget<'a> {
    form: &'a LoginForm,
    server: &'a str,
    theme: &'a ThemeColors,
}

impl<'a> LoginWidget<'a> {
    pub fn new(form: &'a LoginForm, server: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            form,
            server,
            theme,
        }
    }

    fn field_line(&self, label: &str, value: String, focused: bool) -> Line<'static> {
        let label_style = if focused {
            Style::default()
                .fg(self.theme.accent_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.status_fg)
        };
        let mut spans = vec![
            Span::styled(format!("{:<10}", label), label_style),
            Span::styled(value, Style::default().fg(self.theme.listing_fg)),
        ];
        if focused {
            spans.push(Span::styled(
                " ",
                Style::default().bg(self.theme.listing_fg),
            ));
        }
        Line::from(spans)
    }
}

impl Widget for LoginWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rect = centered_rect(50.min(area.width.saturating_sub(2)), 9, area);
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        Clear.render(rect, buf);
        let block = Block::default()
            .title(" Log in ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height < 5 {
            return;
        }

        let server = Line::from(Span::styled(
            self.server.to_string(),
            Style::default().fg(self.theme.dim_fg),
        ));
        buf.set_line(inner.x, inner.y, &server, inner.width);

        let username = self.field_line(
            "Username",
            self.form.username.clone(),
            self.form.focus == LoginField::Username,
        );
        buf.set_line(inner.x, inner.y + 2, &username, inner.width);

        let masked = "*".repeat(self.form.password.chars().count());
        let password = self.field_line(
            "Password",
            masked,
            self.form.focus == LoginField::Password,
        );
        buf.set_line(inner.x, inner.y + 3, &password, inner.width);

        let hint = if self.form.pending {
            "Logging in..."
        } else {
            "[Tab] Switch  [Enter] Log in  [Esc] Quit"
        };
        let hint_line = Line::from(Span::styled(
            hint,
            Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM),
        ));
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
    }
}
