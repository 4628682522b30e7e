use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind, LoginField};
use crate::drive::navigation::Phase;
use crate::drive::selection::{Anchor, MenuAction};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    if app.nav.phase() == Phase::LoggedOut {
        handle_login_keys(app, key);
        return;
    }

    match app.mode.clone() {
        AppMode::Normal => handle_normal_keys(app, key),
        AppMode::ContextMenu => handle_menu_keys(app, key),
        AppMode::Dialog(DialogKind::DeleteConfirm { .. }) => handle_confirm_keys(app, key),
        AppMode::Dialog(_) => handle_input_keys(app, key),
    }
}

fn handle_login_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.login_toggle_field(),
        KeyCode::Enter => {
            if app.login.focus == LoginField::Username && app.login.password.is_empty() {
                app.login_toggle_field();
            } else {
                app.submit_login();
            }
        }
        KeyCode::Backspace => app.login_delete_char(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.login_input_char(c)
        }
        _ => {}
    }
}

fn handle_normal_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_selected(),
        KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => app.go_back(),
        KeyCode::Char('m') => app.open_context_menu(None),
        KeyCode::Char('n') => {
            if app.nav.current().is_some() {
                app.open_dialog(DialogKind::CreateDirectory);
            }
        }
        KeyCode::Char('u') => {
            if app.nav.current().is_some() {
                app.open_dialog(DialogKind::Upload);
            }
        }
        KeyCode::Char('r') => app.act_on_selected(MenuAction::Rename),
        KeyCode::Char('d') => app.act_on_selected(MenuAction::Delete),
        KeyCode::Char('D') => app.act_on_selected(MenuAction::Download),
        KeyCode::Char('R') => app.request_refresh(),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Esc => app.notification = None,
        _ => {}
    }
}

fn handle_menu_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('m') => app.close_context_menu(),
        KeyCode::Char('j') | KeyCode::Down => app.selection.highlight_next(),
        KeyCode::Char('k') | KeyCode::Up => app.selection.highlight_previous(),
        KeyCode::Enter => app.confirm_menu_action(),
        KeyCode::Char('r') => app.menu_action(MenuAction::Rename),
        KeyCode::Char('d') => app.menu_action(MenuAction::Delete),
        KeyCode::Char('D') => app.menu_action(MenuAction::Download),
        _ => {}
    }
}

fn handle_confirm_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.submit_dialog(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
        _ => {}
    }
}

fn handle_input_keys(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.submit_dialog(),
        KeyCode::Backspace => app.dialog_delete_char(),
        KeyCode::Left => app.dialog_move_cursor_left(),
        KeyCode::Right => app.dialog_move_cursor_right(),
        KeyCode::Home => app.dialog_cursor_home(),
        KeyCode::End => app.dialog_cursor_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.dialog_input_char(c)
        }
        _ => {}
    }
}

/// Handle a mouse event. Clicks select rows; a click on the highlighted row
/// opens it; right-click opens the context menu at the pointer.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.nav.phase() == Phase::LoggedOut || !app.config.mouse_enabled() {
        return;
    }
    let (column, row) = (mouse.column, mouse.row);

    match app.mode {
        AppMode::Dialog(_) => {}
        AppMode::ContextMenu => {
            if let MouseEventKind::Down(_) = mouse.kind {
                match menu_row_at(app, column, row) {
                    Some(index) => app.menu_action(MenuAction::ALL[index]),
                    None => app.close_context_menu(),
                }
            }
        }
        AppMode::Normal => match mouse.kind {
            MouseEventKind::ScrollDown => app.select_next(),
            MouseEventKind::ScrollUp => app.select_previous(),
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = app.row_at(column, row) {
                    if index == app.cursor {
                        app.open_selected();
                    } else {
                        app.cursor = index;
                    }
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                if let Some(index) = app.row_at(column, row) {
                    app.cursor = index;
                    app.open_context_menu(Some(Anchor { column, row }));
                }
            }
            _ => {}
        },
    }
}

/// Which menu entry sits at a screen position. The menu has a one-cell border.
fn menu_row_at(app: &App, column: u16, row: u16) -> Option<usize> {
    let area = app.menu_area;
    let inside = column > area.x
        && column + 1 < area.x + area.width
        && row > area.y
        && row + 1 < area.y + area.height;
    if !inside {
        return None;
    }
    let index = (row - area.y - 1) as usize;
    (index < MenuAction::ALL.len()).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::drive::tree::DirectoryNode;
    use crate::remote::memory::MemoryStore;
    use crate::session::SessionStore;
    use crossterm::event::KeyEventState;
    use ratatui::layout::Rect;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let store = Arc::new(MemoryStore::new(DirectoryNode::new("root")));
        App::new(AppConfig::default(), store, SessionStore::in_memory(), tx)
    }

    fn browsing_app() -> App {
        let mut app = app();
        let generation = app.nav.begin_fetch();
        app.nav.apply_tree(
            generation,
            DirectoryNode::new("root")
                .with_file("a.txt")
                .with_dir(DirectoryNode::new("sub").with_file("b.txt")),
        );
        app.listing_area = Rect::new(1, 2, 30, 10);
        app
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn login_form_typing_and_field_switch() {
        let mut app = app();
        for c in "bob".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        // 'q' is text on the login form, not quit.
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.login.username, "bobq");
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.login.focus, LoginField::Password);
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.login.password, "s");
        assert_eq!(app.login.username, "bobq");
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        let mut app = app();
        handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut app = browsing_app();
        handle_key_event(
            &mut app,
            KeyEvent {
                code: KeyCode::Char('j'),
                modifiers: KeyModifiers::NONE,
                kind: KeyEventKind::Release,
                state: KeyEventState::NONE,
            },
        );
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn navigation_keys_move_cursor() {
        let mut app = browsing_app();
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.cursor, 1);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.cursor, 1);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.cursor, 0);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.cursor, 1);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn menu_keys_move_highlight_and_close() {
        let mut app = browsing_app();
        press(&mut app, KeyCode::Char('m'));
        assert_eq!(app.mode, AppMode::ContextMenu);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selection.highlighted_action(), MenuAction::Delete);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.selection.selected().is_none());
    }

    #[test]
    fn confirm_dialog_cancel() {
        let mut app = browsing_app();
        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(
            app.mode,
            AppMode::Dialog(DialogKind::DeleteConfirm { .. })
        ));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, AppMode::Normal);
    }

    #[test]
    fn left_click_selects_then_opens() {
        let mut app = browsing_app();
        // Row 2 is "sub" (directories first), row 3 is "a.txt".
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 5, 3));
        assert_eq!(app.cursor, 1);
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 5, 2));
        assert_eq!(app.cursor, 0);
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 5, 2));
        assert_eq!(app.nav.current_path(), "/sub");
    }

    #[test]
    fn right_click_opens_menu_at_pointer() {
        let mut app = browsing_app();
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Right), 7, 3));
        assert_eq!(app.mode, AppMode::ContextMenu);
        assert_eq!(app.selection.menu_anchor(), Some(Anchor { column: 7, row: 3 }));
        assert_eq!(app.selection.selected().unwrap().name, "a.txt");

        // Click outside the menu dismisses it.
        app.menu_area = Rect::new(7, 3, 12, 5);
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 40, 20));
        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.selection.selected().is_none());
    }

    #[test]
    fn click_on_menu_entry_runs_it() {
        let mut app = browsing_app();
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Right), 7, 3));
        app.menu_area = Rect::new(7, 3, 12, 5);
        // First entry row is just below the top border.
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 9, 4));
        assert!(matches!(app.mode, AppMode::Dialog(DialogKind::Rename { .. })));
        assert_eq!(app.dialog_state.input, "a.txt");
    }

    #[test]
    fn mouse_ignored_when_disabled() {
        let mut app = browsing_app();
        app.config.general.mouse = Some(false);
        handle_mouse_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left), 5, 3));
        assert_eq!(app.cursor, 0);
    }
}
