use tracing::{debug, info};

use super::tree::{join_path, resolve_child, resolve_path, DirectoryNode, Resolved};

/// Lifecycle of the browsing view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    LoggedOut,
    /// A tree fetch is in flight. The previous tree, if any, stays browsable.
    Loading,
    Browsing,
}

/// What happened when a fetched tree was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The tree replaced the snapshot; the path stack still resolves fully.
    Replaced,
    /// The tree replaced the snapshot but the tail of the path stack no
    /// longer exists; the stack was cut back to the deepest valid prefix.
    Clamped { dropped: Vec<String> },
    /// The result belonged to a superseded fetch or arrived after logout.
    Discarded,
}

/// Owns the tree snapshot and the user's position in it.
///
/// The current directory is never stored: it is re-derived by walking the
/// path stack from the root, because nodes carry no parent links.
#[derive(Debug, Default)]
pub struct Navigator {
    phase: Phase,
    root: Option<DirectoryNode>,
    path_stack: Vec<String>,
    generation: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn root(&self) -> Option<&DirectoryNode> {
        self.root.as_ref()
    }

    pub fn path_stack(&self) -> &[String] {
        &self.path_stack
    }

    /// Addressing string for requests: `"/"` at the root, `"/a/b"` below it.
    pub fn current_path(&self) -> String {
        join_path(&self.path_stack)
    }

    /// Generation number of the most recently issued fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a fetch has been issued and not yet settled.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    fn resolved(&self) -> Option<Resolved<'_>> {
        self.root.as_ref().map(|r| resolve_path(r, &self.path_stack))
    }

    /// The directory currently shown, if a tree has been loaded.
    pub fn current(&self) -> Option<&DirectoryNode> {
        self.resolved().map(|r| r.node)
    }

    /// How many stack entries actually resolve against the held tree.
    pub fn resolved_depth(&self) -> usize {
        self.resolved().map(|r| r.depth).unwrap_or(0)
    }

    /// Start a fetch and return its generation. Results carrying an older
    /// generation are ignored when they arrive.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.phase = Phase::Loading;
        debug!(generation = self.generation, "tree fetch started");
        self.generation
    }

    /// Install a fetched tree if it belongs to the latest fetch.
    ///
    /// The path stack is kept while it still resolves; otherwise it is
    /// clamped to its deepest resolvable prefix so every later request is
    /// addressed to a directory that exists in the snapshot.
    pub fn apply_tree(&mut self, generation: u64, tree: DirectoryNode) -> Applied {
        if self.phase == Phase::LoggedOut || generation != self.generation {
            debug!(
                generation,
                latest = self.generation,
                "discarding superseded tree"
            );
            return Applied::Discarded;
        }

        let depth = resolve_path(&tree, &self.path_stack).depth;
        self.root = Some(tree);
        self.phase = Phase::Browsing;

        if depth == self.path_stack.len() {
            return Applied::Replaced;
        }
        let dropped = self.path_stack.split_off(depth);
        info!(?dropped, path = %self.current_path(), "path no longer exists, clamped");
        Applied::Clamped { dropped }
    }

    /// Settle a failed fetch. Returns false when the failure is stale.
    ///
    /// With a previous snapshot the view goes back to browsing it; without
    /// one it stays in `Loading` until the next fetch.
    pub fn fetch_failed(&mut self, generation: u64) -> bool {
        if self.phase == Phase::LoggedOut || generation != self.generation {
            return false;
        }
        if self.root.is_some() {
            self.phase = Phase::Browsing;
        }
        true
    }

    /// Descend into a subdirectory of the current node.
    ///
    /// Returns false, changing nothing, when `name` is not a child of the
    /// current node (the listing the user acted on was stale).
    pub fn open_folder(&mut self, name: &str) -> bool {
        let exists = self
            .current()
            .and_then(|current| resolve_child(current, name))
            .is_some();
        if !exists {
            debug!(name, "open_folder on missing directory ignored");
            return false;
        }
        self.path_stack.push(name.to_string());
        true
    }

    /// Go up one level. Returns false when already at the root.
    pub fn go_back(&mut self) -> bool {
        if self.root.is_none() || self.path_stack.pop().is_none() {
            return false;
        }
        true
    }

    /// Forget everything: snapshot, position, and any in-flight fetch.
    pub fn logout(&mut self) {
        self.root = None;
        self.path_stack.clear();
        self.phase = Phase::LoggedOut;
        // Bumping the generation makes any outstanding fetch stale.
        self.generation += 1;
    }
}
