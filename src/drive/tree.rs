use serde::{Deserialize, Serialize};

/// One directory of the remote drive as returned by `/api/structure`.
///
/// A fetched tree is a snapshot: it is never edited in place by the client
/// and is replaced wholesale on every refetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub dirs: Vec<DirectoryNode>,
}

impl DirectoryNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            dirs: Vec::new(),
        }
    }

    /// Builder helper: add a file name.
    pub fn with_file(mut self, name: impl Into<String>) -> Self {
        self.files.push(name.into());
        self
    }

    /// Builder helper: add a subdirectory.
    pub fn with_dir(mut self, dir: DirectoryNode) -> Self {
        self.dirs.push(dir);
        self
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|d| d.name == name)
    }

    /// Whether the node has a direct child of the given kind and name.
    pub fn contains(&self, kind: EntryKind, name: &str) -> bool {
        match kind {
            EntryKind::File => self.has_file(name),
            EntryKind::Directory => self.has_dir(name),
        }
    }

    /// Listing entries in display order: directories first, then files,
    /// each in the order the server returned them.
    pub fn entries(&self) -> Vec<Entry> {
        self.dirs
            .iter()
            .map(|d| Entry {
                name: d.name.clone(),
                kind: EntryKind::Directory,
            })
            .chain(self.files.iter().map(|f| Entry {
                name: f.clone(),
                kind: EntryKind::File,
            }))
            .collect()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of a listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// A flattened child of the current directory, used for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

/// Outcome of walking a path stack from the root.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Deepest node that could be reached.
    pub node: &'a DirectoryNode,
    /// How many stack entries were consumed to reach `node`.
    pub depth: usize,
}

impl Resolved<'_> {
    /// Whether every requested stack entry resolved.
    pub fn is_complete(&self, requested: usize) -> bool {
        self.depth == requested
    }
}

/// Find a direct subdirectory by exact name. Absence is not an error.
pub fn resolve_child<'a>(node: &'a DirectoryNode, name: &str) -> Option<&'a DirectoryNode> {
    node.dirs.iter().find(|d| d.name == name)
}

/// Walk `path` from `root`, one `resolve_child` per entry.
///
/// Never fails: the walk stops at the first name that does not resolve and
/// returns the deepest node reached together with the consumed depth, so
/// callers can tell a partial resolution from a complete one.
pub fn resolve_path<'a, S: AsRef<str>>(root: &'a DirectoryNode, path: &[S]) -> Resolved<'a> {
    let mut node = root;
    let mut depth = 0;
    for name in path {
        match resolve_child(node, name.as_ref()) {
            Some(child) => {
                node = child;
                depth += 1;
            }
            None => break,
        }
    }
    Resolved { node, depth }
}

/// Render a path stack as the addressing string used in requests.
pub fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for part in path {
        out.push('/');
        out.push_str(part.as_ref());
    }
    out
}

/// Split an addressing string back into its stack entries.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DirectoryNode {
        DirectoryNode::new("root")
            .with_file("a.txt")
            .with_dir(DirectoryNode::new("sub").with_file("b.txt"))
            .with_dir(
                DirectoryNode::new("photos")
                    .with_dir(DirectoryNode::new("2024").with_file("beach.jpg")),
            )
    }

    #[test]
    fn resolve_child_finds_direct_subdirectory() {
        let root = sample();
        let sub = resolve_child(&root, "sub").expect("sub exists");
        assert_eq!(sub.files, vec!["b.txt".to_string()]);
    }

    #[test]
    fn resolve_child_ignores_files_with_same_name() {
        let root = sample();
        assert!(resolve_child(&root, "a.txt").is_none());
        assert!(resolve_child(&root, "missing").is_none());
    }

    #[test]
    fn resolve_path_follows_valid_stack() {
        let root = sample();
        let resolved = resolve_path(&root, &["photos", "2024"]);
        assert_eq!(resolved.node.name, "2024");
        assert_eq!(resolved.depth, 2);
        assert!(resolved.is_complete(2));
    }

    #[test]
    fn resolve_path_empty_stack_is_root() {
        let root = sample();
        let resolved = resolve_path::<&str>(&root, &[]);
        assert_eq!(resolved.node, &root);
        assert_eq!(resolved.depth, 0);
    }

    #[test]
    fn resolve_path_degrades_to_deepest_resolvable() {
        let root = sample();
        let resolved = resolve_path(&root, &["photos", "2023", "summer"]);
        assert_eq!(resolved.node.name, "photos");
        assert_eq!(resolved.depth, 1);
        assert!(!resolved.is_complete(3));
    }

    #[test]
    fn resolve_path_stops_at_first_miss() {
        // "2024" exists under photos but the walk must not skip the gap.
        let root = sample();
        let resolved = resolve_path(&root, &["nope", "2024"]);
        assert_eq!(resolved.node, &root);
        assert_eq!(resolved.depth, 0);
    }

    #[test]
    fn entries_list_dirs_before_files() {
        let root = sample();
        let names: Vec<_> = root
            .entries()
            .into_iter()
            .map(|e| (e.name, e.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("sub".to_string(), EntryKind::Directory),
                ("photos".to_string(), EntryKind::Directory),
                ("a.txt".to_string(), EntryKind::File),
            ]
        );
    }

    #[test]
    fn contains_respects_kind() {
        let root = sample();
        assert!(root.contains(EntryKind::File, "a.txt"));
        assert!(!root.contains(EntryKind::Directory, "a.txt"));
        assert!(root.contains(EntryKind::Directory, "sub"));
    }

    #[test]
    fn join_and_split_path() {
        assert_eq!(join_path::<&str>(&[]), "/");
        assert_eq!(join_path(&["sub"]), "/sub");
        assert_eq!(join_path(&["photos", "2024"]), "/photos/2024");
        assert_eq!(split_path("/photos/2024"), vec!["photos", "2024"]);
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn deserializes_server_shape() {
        let json = r#"{"name":"root","files":["a.txt"],"dirs":[{"name":"sub","files":["b.txt"],"dirs":[]}]}"#;
        let tree: DirectoryNode = serde_json::from_str(json).expect("parse");
        assert_eq!(tree.name, "root");
        assert_eq!(tree.dirs[0].name, "sub");
        assert_eq!(tree.dirs[0].files, vec!["b.txt".to_string()]);
    }

    #[test]
    fn deserializes_missing_lists_as_empty() {
        let tree: DirectoryNode = serde_json::from_str(r#"{"name":"empty"}"#).expect("parse");
        assert!(tree.is_empty());
    }
}
