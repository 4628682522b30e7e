use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::drive::selection::{Anchor, MenuAction, SelectionState};
use crate::theme::ThemeColors;

const MENU_WIDTH: u16 = 14;
const MENU_HEIGHT: u16 = MenuAction::ALL.len() as u16 + 2;

/// Where the menu is drawn: at the anchor, shifted back inside `area` when
/// it would overflow the right or bottom edge.
pub fn menu_rect(anchor: Anchor, area: Rect) -> Rect {
    let width = MENU_WIDTH.min(area.width);
    let height = MENU_HEIGHT.min(area.height);
    let max_x = area.x + area.width - width;
    let max_y = area.y + area.height - height;
    Rect::new(
        anchor.column.clamp(area.x, max_x),
        anchor.row.clamp(area.y, max_y),
        width,
        height,
    )
}

/// Context menu for the selected entry.
pub struct ContextMenuWidget<'a> {
    selection: &'a SelectionState,
    theme: &'a ThemeColors,
}

impl<'a> ContextMenuWidget<'a> {
    pub fn new(selection: &'a SelectionState, theme: &'a ThemeColors) -> Self {
        Self { selection, theme }
    }
}

impl Widget for ContextMenuWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(anchor) = self.selection.menu_anchor() else {
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }
        let rect = menu_rect(anchor, area);

        Clear.render(rect, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent_fg));
        let inner = block.inner(rect);
        block.render(rect, buf);

        let highlighted = self.selection.highlighted_action();
        for (i, action) in MenuAction::ALL.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if *action == highlighted {
                Style::default()
                    .bg(self.theme.selected_bg)
                    .fg(self.theme.selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.listing_fg)
            };
            let text = format!(" {:<width$}", action.label(), width = inner.width as usize);
            let line = Line::from(Span::styled(text, style));
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}
