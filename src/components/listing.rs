use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::drive::tree::{Entry, EntryKind};
use crate::theme::ThemeColors;

/// Listing of the current directory: subdirectories first, then files.
pub struct ListingWidget<'a> {
    entries: &'a [Entry],
    cursor: usize,
    scroll_offset: usize,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> ListingWidget<'a> {
    pub fn new(
        entries: &'a [Entry],
        cursor: usize,
        scroll_offset: usize,
        theme: &'a ThemeColors,
    ) -> Self {
        Self {
            entries,
            cursor,
            scroll_offset,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn indicator(kind: EntryKind) -> &'static str {
        match kind {
            EntryKind::Directory => "[D] ",
            EntryKind::File => "[F] ",
        }
    }
}

impl Widget for ListingWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        if self.entries.is_empty() {
            let line = Line::from(Span::styled(
                "This folder is empty",
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::ITALIC),
            ));
            buf.set_line(inner.x + 1, inner.y, &line, inner.width.saturating_sub(1));
            return;
        }

        let visible = self
            .entries
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(inner.height as usize);

        for (i, (idx, entry)) in visible.enumerate() {
            let y = inner.y + i as u16;
            let style = if idx == self.cursor {
                Style::default()
                    .bg(self.theme.selected_bg)
                    .fg(self.theme.selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                match entry.kind {
                    EntryKind::Directory => Style::default()
                        .fg(self.theme.dir_fg)
                        .add_modifier(Modifier::BOLD),
                    EntryKind::File => Style::default().fg(self.theme.file_fg),
                }
            };

            let suffix = if entry.kind == EntryKind::Directory { "/" } else { "" };
            let text = format!(" {}{}{}", Self::indicator(entry.kind), entry.name, suffix);
            // Pad so the highlight spans the whole row.
            let padded = format!("{:<width$}", text, width = inner.width as usize);
            let line = Line::from(Span::styled(padded, style));
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
