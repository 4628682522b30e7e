use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::drive::mutation::{
    self, DownloadReport, MutationKind, MutationReport, Orchestrator,
};
use crate::drive::navigation::{Applied, Navigator, Phase};
use crate::drive::selection::{Anchor, MenuAction, SelectedItem, SelectionState};
use crate::drive::tree::{DirectoryNode, Entry, EntryKind};
use crate::error::{AppError, Result};
use crate::event::Event;
use crate::handler;
use crate::remote::RemoteStore;
use crate::session::{Credentials, Session, SessionStore};
use crate::theme::{resolve_theme, ThemeColors};

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    CreateDirectory,
    Rename { item: SelectedItem },
    Upload,
    DeleteConfirm { item: SelectedItem },
}

/// Application mode while browsing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    ContextMenu,
    Dialog(DialogKind),
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
    /// The dialog's request is in flight; input is frozen until it settles.
    pub pending: bool,
}

/// Which login field has focus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

/// Contents of the login form.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub pending: bool,
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// Transient message shown in the status bar.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub created: Instant,
}

/// Main application state. Owns everything the event loop mutates; async
/// work runs in spawned tasks that report back through the event channel.
pub struct App {
    pub nav: Navigator,
    pub selection: SelectionState,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub login: LoginForm,
    pub notification: Option<Notification>,
    /// Highlighted row of the listing.
    pub cursor: usize,
    pub scroll_offset: usize,
    /// Screen area of the listing rows, recorded on every render.
    pub listing_area: Rect,
    /// Screen area of the open context menu, recorded on render.
    pub menu_area: Rect,
    pub should_quit: bool,
    pub theme: ThemeColors,
    pub config: AppConfig,
    session: SessionStore,
    orchestrator: Orchestrator,
    events: mpsc::UnboundedSender<Event>,
    login_epoch: u64,
    /// The session came from disk and no fetch has succeeded with it yet.
    resumed: bool,
}

impl App {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RemoteStore>,
        session: SessionStore,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            nav: Navigator::new(),
            selection: SelectionState::new(),
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            login: LoginForm::default(),
            notification: None,
            cursor: 0,
            scroll_offset: 0,
            listing_area: Rect::default(),
            menu_area: Rect::default(),
            should_quit: false,
            theme: resolve_theme(&config.theme),
            config,
            session,
            orchestrator: Orchestrator::new(store),
            events,
            login_epoch: 0,
            resumed: false,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Skip the login form when a saved session exists.
    pub fn resume_session(&mut self) {
        if let Some(session) = self.session.current() {
            info!(username = %session.username, "resuming saved session");
            self.login.username = session.username;
            self.resumed = true;
            self.request_refresh();
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let tx = self.events.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ── Event dispatch ───────────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => handler::handle_key_event(self, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(self, mouse),
            Event::Tick => self.clear_expired_notification(),
            Event::Resize(_, _) => {}
            Event::LoginComplete { epoch, result } => self.handle_login_complete(epoch, result),
            Event::TreeFetched { generation, result } => {
                self.handle_tree_fetched(generation, result)
            }
            Event::UploadFinished { epoch, message, ok } => {
                self.handle_upload_finished(epoch, message, ok)
            }
            Event::MutationComplete { epoch, report } => {
                self.handle_mutation_complete(epoch, report)
            }
            Event::DownloadComplete { epoch, report } => {
                self.handle_download_complete(epoch, report)
            }
        }
    }

    // ── Notifications ────────────────────────────────────────────────────────

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        self.notification = Some(Notification {
            message: message.into(),
            severity,
            created: Instant::now(),
        });
    }

    /// Clear the notification once it has been displayed long enough.
    pub fn clear_expired_notification(&mut self) {
        let ttl = self.config.notification_duration();
        if let Some(n) = &self.notification {
            if n.created.elapsed() > ttl {
                self.notification = None;
            }
        }
    }

    // ── Login / logout ───────────────────────────────────────────────────────

    pub fn login_input_char(&mut self, c: char) {
        if !self.login.pending {
            self.login.focused_mut().push(c);
        }
    }

    pub fn login_delete_char(&mut self) {
        if !self.login.pending {
            self.login.focused_mut().pop();
        }
    }

    pub fn login_toggle_field(&mut self) {
        self.login.focus = match self.login.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    /// Send the credentials. Empty fields are rejected locally.
    pub fn submit_login(&mut self) {
        if self.login.pending {
            return;
        }
        let username = self.login.username.trim().to_string();
        if username.is_empty() || self.login.password.is_empty() {
            self.notify("Username and password are required", Severity::Error);
            return;
        }

        self.login.pending = true;
        self.login_epoch += 1;
        let epoch = self.login_epoch;
        let credentials = Credentials {
            username: username.clone(),
            password: self.login.password.clone(),
        };
        let store = Arc::clone(self.orchestrator.store());
        debug!(%username, epoch, "login requested");
        self.spawn(async move {
            let result = store
                .login(&credentials)
                .await
                .map(|token| Session::new(credentials.username, token));
            Event::LoginComplete { epoch, result }
        });
    }

    fn handle_login_complete(&mut self, epoch: u64, result: Result<Session>) {
        if epoch != self.login_epoch {
            debug!(epoch, "ignoring superseded login result");
            return;
        }
        self.login.pending = false;
        match result {
            Ok(session) => {
                info!(username = %session.username, "logged in");
                if let Err(e) = self.session.set(session) {
                    warn!(error = %e, "could not persist session");
                }
                self.login.password.clear();
                self.request_refresh();
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                let message = match e {
                    AppError::Unauthorized | AppError::RequestFailed { .. } => {
                        "No such user!".to_string()
                    }
                    other => format!("Login failed: {}", other),
                };
                self.notify(message, Severity::Error);
            }
        }
    }

    /// Drop the session and every piece of view state.
    pub fn logout(&mut self) {
        info!("logged out");
        self.nav.logout();
        self.session.clear();
        self.selection.dismiss();
        self.close_dialog();
        self.mode = AppMode::Normal;
        self.login = LoginForm::default();
        // Any login or mutation still in flight belongs to the previous session.
        self.login_epoch += 1;
        self.resumed = false;
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    /// React to a 401: by default only report it; optionally end the session.
    fn handle_unauthorized(&mut self) {
        warn!("server rejected the session token");
        if self.config.logout_on_unauthorized() {
            self.logout();
            self.notify("Session expired, please log in again", Severity::Error);
        } else {
            self.notify(
                "Unauthorized: the server rejected this session (L to log out)",
                Severity::Error,
            );
        }
    }

    /// The server rejected a session restored from disk: drop it and show
    /// the login form again, keeping the username.
    fn expire_saved_session(&mut self) {
        let username = self.login.username.clone();
        info!(%username, "saved session rejected by the server");
        self.logout();
        self.login.username = username;
        self.login.focus = LoginField::Password;
        self.notify("Saved session expired, please log in again", Severity::Error);
    }

    // ── Tree fetching ────────────────────────────────────────────────────────

    /// Refetch the whole tree from the root.
    pub fn request_refresh(&mut self) {
        let Some(session) = self.session.current() else {
            self.notify("Not logged in", Severity::Error);
            self.logout();
            return;
        };
        let generation = self.nav.begin_fetch();
        let store = Arc::clone(self.orchestrator.store());
        self.spawn(async move {
            let result = store.fetch_tree(&session).await;
            Event::TreeFetched { generation, result }
        });
    }

    fn handle_tree_fetched(&mut self, generation: u64, result: Result<DirectoryNode>) {
        match result {
            Ok(tree) => match self.nav.apply_tree(generation, tree) {
                Applied::Discarded => {}
                Applied::Replaced => {
                    self.resumed = false;
                    self.clamp_cursor();
                }
                Applied::Clamped { dropped } => {
                    self.resumed = false;
                    self.cursor = 0;
                    self.scroll_offset = 0;
                    self.notify(
                        format!(
                            "\"{}\" no longer exists; showing {}",
                            dropped.join("/"),
                            self.nav.current_path()
                        ),
                        Severity::Info,
                    );
                }
            },
            Err(e) => {
                if !self.nav.fetch_failed(generation) {
                    return;
                }
                warn!(error = %e, "tree fetch failed");
                if e.is_unauthorized() && self.resumed {
                    self.expire_saved_session();
                } else if e.is_unauthorized() {
                    self.handle_unauthorized();
                } else {
                    self.notify(format!("Could not load drive: {}", e), Severity::Error);
                }
            }
        }
    }

    // ── Listing & navigation ─────────────────────────────────────────────────

    /// Entries of the directory currently shown.
    pub fn entries(&self) -> Vec<Entry> {
        self.nav.current().map(|n| n.entries()).unwrap_or_default()
    }

    pub fn selected_entry(&self) -> Option<Entry> {
        self.entries().into_iter().nth(self.cursor)
    }

    /// Heading for the listing: a greeting at the root, the folder name below.
    pub fn title(&self) -> String {
        match self.nav.current() {
            None => "Loading drive structure...".to_string(),
            Some(node) if self.nav.path_stack().is_empty() => format!("Welcome, {}", node.name),
            Some(node) => node.name.clone(),
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.entries().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    pub fn select_next(&mut self) {
        let len = self.entries().len();
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.cursor = 0;
    }

    pub fn select_last(&mut self) {
        self.cursor = self.entries().len().saturating_sub(1);
    }

    /// Update the scroll offset to ensure the cursor row is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + visible_height {
            self.scroll_offset = self.cursor - visible_height + 1;
        }
    }

    /// Open the highlighted entry if it is a directory.
    pub fn open_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.kind != EntryKind::Directory {
            return;
        }
        if self.nav.open_folder(&entry.name) {
            self.cursor = 0;
            self.scroll_offset = 0;
        }
    }

    /// Go up one level, keeping the folder we came from highlighted.
    pub fn go_back(&mut self) {
        let left = self.nav.path_stack().last().cloned();
        if !self.nav.go_back() {
            return;
        }
        self.scroll_offset = 0;
        self.cursor = left
            .and_then(|name| {
                self.entries()
                    .iter()
                    .position(|e| e.kind == EntryKind::Directory && e.name == name)
            })
            .unwrap_or(0);
    }

    /// Index of the listing row at a screen position, if any.
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.listing_area;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        let index = self.scroll_offset + (row - area.y) as usize;
        (index < self.entries().len()).then_some(index)
    }

    // ── Context menu ─────────────────────────────────────────────────────────

    fn cursor_anchor(&self) -> Anchor {
        let visible_row = self.cursor.saturating_sub(self.scroll_offset) as u16;
        Anchor {
            column: self.listing_area.x + 2,
            row: self.listing_area.y + visible_row,
        }
    }

    /// Open the context menu on the highlighted entry.
    pub fn open_context_menu(&mut self, anchor: Option<Anchor>) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let anchor = anchor.unwrap_or_else(|| self.cursor_anchor());
        self.selection.open_menu(SelectedItem::from(&entry), anchor);
        self.mode = AppMode::ContextMenu;
    }

    pub fn close_context_menu(&mut self) {
        self.selection.dismiss();
        self.mode = AppMode::Normal;
    }

    pub fn confirm_menu_action(&mut self) {
        let action = self.selection.highlighted_action();
        self.menu_action(action);
    }

    /// Shortcut: run a menu action on the highlighted entry directly.
    pub fn act_on_selected(&mut self, action: MenuAction) {
        self.open_context_menu(None);
        if self.selection.selected().is_some() {
            self.menu_action(action);
        }
    }

    pub fn menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Rename => {
                let Some(item) = self.selection.begin_rename().cloned() else {
                    self.mode = AppMode::Normal;
                    return;
                };
                self.open_dialog(DialogKind::Rename { item });
            }
            MenuAction::Delete => {
                self.mode = AppMode::Normal;
                let Some(item) = self.selection.take_for_action() else {
                    return;
                };
                if self.config.confirm_delete() {
                    self.open_dialog(DialogKind::DeleteConfirm { item });
                } else {
                    self.run_delete(item);
                }
            }
            MenuAction::Download => {
                self.mode = AppMode::Normal;
                if let Some(item) = self.selection.take_for_action() {
                    self.run_download(item);
                }
            }
        }
    }

    // ── Dialogs ──────────────────────────────────────────────────────────────

    /// Open a dialog of the given kind. Rename is prefilled with the old name.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        if let DialogKind::Rename { item } = &kind {
            self.dialog_state.input = item.name.clone();
            self.dialog_state.cursor_position = item.name.len();
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        if let AppMode::Dialog(DialogKind::Rename { .. }) = self.mode {
            self.selection.end_rename();
        }
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        if self.dialog_state.pending {
            return;
        }
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        if self.dialog_state.pending {
            return;
        }
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
        }
    }

    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    /// Submit the open dialog.
    pub fn submit_dialog(&mut self) {
        if self.dialog_state.pending {
            return;
        }
        let AppMode::Dialog(kind) = self.mode.clone() else {
            return;
        };
        match kind {
            DialogKind::CreateDirectory => self.submit_create_directory(),
            DialogKind::Rename { item } => self.submit_rename(item),
            DialogKind::Upload => self.submit_upload(),
            DialogKind::DeleteConfirm { item } => {
                self.close_dialog();
                self.run_delete(item);
            }
        }
    }

    /// Report a failed local precondition. Stale references are dropped
    /// silently along with the dialog; everything else keeps it open.
    fn reject(&mut self, err: AppError) {
        match err {
            AppError::StaleReference(name) => {
                debug!(%name, "action on stale item ignored");
                self.close_dialog();
            }
            other => self.notify(other.to_string(), Severity::Error),
        }
    }

    fn current_node(&self) -> Option<&DirectoryNode> {
        self.nav.current()
    }

    fn session_for_action(&mut self) -> Option<Session> {
        let session = self.session.current();
        if session.is_none() {
            self.notify("Not logged in", Severity::Error);
        }
        session
    }

    fn submit_create_directory(&mut self) {
        let planned = match self.current_node() {
            Some(current) => mutation::plan_create_directory(current, &self.dialog_state.input),
            None => return,
        };
        let name = match planned {
            Ok(name) => name,
            Err(e) => return self.reject(e),
        };
        let Some(session) = self.session_for_action() else {
            return;
        };
        self.dialog_state.pending = true;
        let path = self.nav.current_path();
        let orchestrator = self.orchestrator.clone();
        let epoch = self.login_epoch;
        self.spawn(async move {
            Event::MutationComplete {
                epoch,
                report: orchestrator.create_directory(&session, &path, &name).await,
            }
        });
    }

    fn submit_rename(&mut self, item: SelectedItem) {
        let planned = match self.current_node() {
            Some(current) => mutation::plan_rename(current, &item, &self.dialog_state.input),
            None => return,
        };
        let new_name = match planned {
            Ok(name) => name,
            Err(e) => return self.reject(e),
        };
        let Some(session) = self.session_for_action() else {
            return;
        };
        self.dialog_state.pending = true;
        let path = self.nav.current_path();
        let orchestrator = self.orchestrator.clone();
        let epoch = self.login_epoch;
        self.spawn(async move {
            Event::MutationComplete {
                epoch,
                report: orchestrator.rename(&session, &path, &item, &new_name).await,
            }
        });
    }

    fn submit_upload(&mut self) {
        let files = match mutation::plan_upload(&self.dialog_state.input) {
            Ok(files) => files,
            Err(e) => return self.reject(e),
        };
        if self.current_node().is_none() {
            return;
        }
        let Some(session) = self.session_for_action() else {
            return;
        };
        self.close_dialog();
        self.notify(format!("Uploading {} file(s)...", files.len()), Severity::Info);

        let path = self.nav.current_path();
        let orchestrator = self.orchestrator.clone();
        let per_file = self.events.clone();
        let epoch = self.login_epoch;
        self.spawn(async move {
            let report = orchestrator
                .upload_batch(&session, &path, files, move |outcome| {
                    let _ = per_file.send(Event::UploadFinished {
                        epoch,
                        message: outcome.message(&MutationKind::Upload),
                        ok: outcome.is_ok(),
                    });
                })
                .await;
            Event::MutationComplete { epoch, report }
        });
    }

    fn run_delete(&mut self, item: SelectedItem) {
        let planned = match self.current_node() {
            Some(current) => mutation::plan_delete(current, &item),
            None => return,
        };
        if let Err(e) = planned {
            return self.reject(e);
        }
        let Some(session) = self.session_for_action() else {
            return;
        };
        let path = self.nav.current_path();
        let orchestrator = self.orchestrator.clone();
        let epoch = self.login_epoch;
        self.spawn(async move {
            Event::MutationComplete {
                epoch,
                report: orchestrator.delete(&session, &path, &item).await,
            }
        });
    }

    fn run_download(&mut self, item: SelectedItem) {
        let present = match self.current_node() {
            Some(current) => mutation::ensure_present(current, &item),
            None => return,
        };
        if let Err(e) = present {
            return self.reject(e);
        }
        let Some(session) = self.session_for_action() else {
            return;
        };
        self.notify(format!("Downloading \"{}\"...", item.name), Severity::Info);
        let path = self.nav.current_path();
        let dest = self.config.download_dir();
        let orchestrator = self.orchestrator.clone();
        let epoch = self.login_epoch;
        self.spawn(async move {
            Event::DownloadComplete {
                epoch,
                report: orchestrator.download(&session, &path, &item, dest).await,
            }
        });
    }

    // ── Completions ──────────────────────────────────────────────────────────

    fn handle_upload_finished(&mut self, epoch: u64, message: String, ok: bool) {
        if epoch != self.login_epoch {
            return;
        }
        let severity = if ok { Severity::Success } else { Severity::Error };
        self.notify(message, severity);
    }

    fn handle_mutation_complete(&mut self, epoch: u64, report: MutationReport) {
        if epoch != self.login_epoch || self.nav.phase() == Phase::LoggedOut {
            debug!(?report.kind, "mutation finished for an earlier session");
            return;
        }

        let severity = if report.failed() == 0 {
            Severity::Success
        } else {
            Severity::Error
        };
        self.notify(report.summary(), severity);

        // The dialog that issued the request closes on success and stays
        // open for another attempt on failure.
        let issued_here = matches!(
            (&self.mode, &report.kind),
            (AppMode::Dialog(DialogKind::CreateDirectory), MutationKind::CreateDirectory)
                | (AppMode::Dialog(DialogKind::Rename { .. }), MutationKind::Rename { .. })
        );
        if issued_here {
            if report.needs_refresh() {
                self.close_dialog();
            } else {
                self.dialog_state.pending = false;
            }
        }

        if report.is_unauthorized() {
            self.handle_unauthorized();
            if self.nav.phase() == Phase::LoggedOut {
                return;
            }
        }

        if report.needs_refresh() {
            self.request_refresh();
        }
    }

    fn handle_download_complete(&mut self, epoch: u64, report: DownloadReport) {
        if epoch != self.login_epoch {
            debug!(name = %report.name, "download finished for an earlier session");
            return;
        }
        let severity = if report.result.is_ok() {
            Severity::Success
        } else {
            Severity::Error
        };
        if matches!(report.result, Err(AppError::Unauthorized)) {
            self.handle_unauthorized();
            return;
        }
        self.notify(report.message(), severity);
    }
}
