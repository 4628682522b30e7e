use super::tree::{Entry, EntryKind};

/// The item a context-menu action applies to.
///
/// The kind travels alongside the bare name, so nothing needs to be stripped
/// before the name is sent to the backend or looked up in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedItem {
    pub kind: EntryKind,
    pub name: String,
}

impl SelectedItem {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::File,
            name: name.into(),
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Directory,
            name: name.into(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

impl From<&Entry> for SelectedItem {
    fn from(entry: &Entry) -> Self {
        Self {
            kind: entry.kind,
            name: entry.name.clone(),
        }
    }
}

/// Screen cell where the context menu is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub column: u16,
    pub row: u16,
}

/// Entries of the context menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Rename,
    Delete,
    Download,
}

impl MenuAction {
    pub const ALL: [MenuAction; 3] = [MenuAction::Rename, MenuAction::Delete, MenuAction::Download];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Rename => "Rename",
            MenuAction::Delete => "Delete",
            MenuAction::Download => "Download",
        }
    }
}

/// Context-menu selection and rename-dialog state, independent of the tree.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected: Option<SelectedItem>,
    anchor: Option<Anchor>,
    highlighted: usize,
    rename_open: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&SelectedItem> {
        self.selected.as_ref()
    }

    /// Where the open context menu sits, if one is open.
    pub fn menu_anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    pub fn is_menu_open(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_rename_open(&self) -> bool {
        self.rename_open
    }

    pub fn highlighted_action(&self) -> MenuAction {
        MenuAction::ALL[self.highlighted.min(MenuAction::ALL.len() - 1)]
    }

    /// Open the context menu on `item`: selection and position are set together.
    pub fn open_menu(&mut self, item: SelectedItem, anchor: Anchor) {
        self.selected = Some(item);
        self.anchor = Some(anchor);
        self.highlighted = 0;
        self.rename_open = false;
    }

    pub fn highlight_next(&mut self) {
        if self.highlighted + 1 < MenuAction::ALL.len() {
            self.highlighted += 1;
        }
    }

    pub fn highlight_previous(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    /// Clear selection, menu, and rename dialog.
    pub fn dismiss(&mut self) {
        self.selected = None;
        self.anchor = None;
        self.highlighted = 0;
        self.rename_open = false;
    }

    /// Take the selection for a delete or download: the menu closes and the
    /// selection is cleared.
    pub fn take_for_action(&mut self) -> Option<SelectedItem> {
        let item = self.selected.take();
        self.dismiss();
        item
    }

    /// Switch from the menu to the rename dialog, keeping the selection.
    pub fn begin_rename(&mut self) -> Option<&SelectedItem> {
        self.selected.as_ref()?;
        self.anchor = None;
        self.highlighted = 0;
        self.rename_open = true;
        self.selected.as_ref()
    }

    /// Close the rename dialog after success or cancellation.
    pub fn end_rename(&mut self) {
        self.dismiss();
    }
}
