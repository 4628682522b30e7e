use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{App, AppMode};
use crate::components::dialog::DialogWidget;
use crate::components::listing::ListingWidget;
use crate::components::login::LoginWidget;
use crate::components::menu::{menu_rect, ContextMenuWidget};
use crate::components::status_bar::StatusBarWidget;
use crate::drive::navigation::Phase;
use crate::drive::tree::EntryKind;

const BROWSE_HINTS: &str = " m:menu n:dir u:upload R:refresh L:logout q:quit ";
const MENU_HINTS: &str = " j/k:move Enter:run Esc:close ";

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    if app.nav.phase() == Phase::LoggedOut {
        render_login(app, frame, area);
        return;
    }

    let [header, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header);

    let block = Block::default()
        .title(format!(" {} ", app.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_fg));
    let inner = block.inner(body);
    app.listing_area = inner;
    app.update_scroll(inner.height as usize);

    let entries = app.entries();
    let listing = ListingWidget::new(&entries, app.cursor, app.scroll_offset, &app.theme).block(block);
    frame.render_widget(listing, body);

    render_status(app, frame, status);

    match &app.mode {
        AppMode::ContextMenu => {
            if let Some(anchor) = app.selection.menu_anchor() {
                app.menu_area = menu_rect(anchor, area);
            }
            frame.render_widget(ContextMenuWidget::new(&app.selection, &app.theme), area);
        }
        AppMode::Dialog(_) => {
            frame.render_widget(DialogWidget::new(&app.mode, &app.dialog_state, &app.theme), area);
        }
        AppMode::Normal => {}
    }
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let [form, status] =
        Layout::vertical([Constraint::Min(9), Constraint::Length(1)]).areas(area);
    frame.render_widget(LoginWidget::new(&app.login, app.config.base_url(), &app.theme), form);
    if let Some(n) = &app.notification {
        frame.render_widget(
            StatusBarWidget::new("", "", &app.theme).notification(&n.message, n.severity),
            status,
        );
    }
}

/// Breadcrumb of the current path, plus a loading marker while a fetch runs.
fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " drive ",
        Style::default()
            .fg(app.theme.header_fg)
            .add_modifier(Modifier::BOLD),
    )];
    let user = app
        .session()
        .current()
        .map(|s| s.username)
        .unwrap_or_default();
    if !user.is_empty() {
        spans.push(Span::styled(
            format!("{} ", user),
            Style::default().fg(app.theme.accent_fg),
        ));
    }
    spans.push(Span::styled(
        app.nav.current_path(),
        Style::default().fg(app.theme.status_fg),
    ));
    if app.nav.is_loading() {
        spans.push(Span::styled(
            "  loading...",
            Style::default()
                .fg(app.theme.info_fg)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    frame.render_widget(Line::from(spans), area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let path = app.nav.current_path();
    let info = match app.selected_entry() {
        Some(entry) => {
            let kind = match entry.kind {
                EntryKind::Directory => "Directory",
                EntryKind::File => "File",
            };
            format!("{} {}/{} ", kind, app.cursor + 1, app.entries().len())
        }
        None => String::new(),
    };
    let hints = if app.mode == AppMode::ContextMenu {
        MENU_HINTS
    } else {
        BROWSE_HINTS
    };

    let mut widget = StatusBarWidget::new(&path, &info, &app.theme).key_hints(hints);
    if let Some(n) = &app.notification {
        widget = widget.notification(&n.message, n.severity);
    }
    frame.render_widget(widget, area);
}
