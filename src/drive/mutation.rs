//! Mutating actions against the backend.
//!
//! Each action is split in two: a synchronous `plan_*` step that checks local
//! preconditions against the currently shown directory (no request is made
//! when it fails), and an async step that performs the request and returns a
//! report. The caller refetches the tree once per report that contains at
//! least one success; a report made only of failures changes nothing.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::selection::SelectedItem;
use super::transfer;
use super::tree::{DirectoryNode, EntryKind};
use crate::error::{AppError, Result};
use crate::remote::RemoteStore;
use crate::session::Session;

/// Which action a report belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    CreateDirectory,
    Rename { to: String },
    Delete { kind: EntryKind },
    Upload,
}

/// Result for a single item of an action.
#[derive(Debug)]
pub struct ItemOutcome {
    pub name: String,
    pub result: Result<()>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// User-facing message for this item.
    pub fn message(&self, kind: &MutationKind) -> String {
        match (&self.result, kind) {
            (Ok(()), MutationKind::CreateDirectory) => {
                format!("Directory \"{}\" created", self.name)
            }
            (Ok(()), MutationKind::Rename { to }) => {
                format!("Renamed \"{}\" to \"{}\"", self.name, to)
            }
            (Ok(()), MutationKind::Delete { .. }) => format!("Deleted \"{}\"", self.name),
            (Ok(()), MutationKind::Upload) => {
                format!("File \"{}\" uploaded successfully!", self.name)
            }
            (Err(e), MutationKind::CreateDirectory) => {
                format!("Failed to create directory \"{}\": {}", self.name, e)
            }
            (Err(e), MutationKind::Rename { .. }) => {
                format!("Failed to rename \"{}\": {}", self.name, e)
            }
            (Err(e), MutationKind::Delete { .. }) => {
                format!("Failed to delete \"{}\": {}", self.name, e)
            }
            (Err(e), MutationKind::Upload) => {
                format!("Failed to upload \"{}\": {}", self.name, e)
            }
        }
    }
}

/// Completion signal of one action (a whole batch for uploads).
#[derive(Debug)]
pub struct MutationReport {
    pub kind: MutationKind,
    pub outcomes: Vec<ItemOutcome>,
}

impl MutationReport {
    fn single(kind: MutationKind, name: &str, result: Result<()>) -> Self {
        Self {
            kind,
            outcomes: vec![ItemOutcome {
                name: name.to_string(),
                result,
            }],
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Whether the tree changed server-side and must be refetched.
    pub fn needs_refresh(&self) -> bool {
        self.succeeded() > 0
    }

    pub fn is_unauthorized(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.result, Err(AppError::Unauthorized)))
    }

    /// One-line summary: the item message for single-item reports, counts
    /// for batches.
    pub fn summary(&self) -> String {
        match self.outcomes.as_slice() {
            [] => "Nothing to do".to_string(),
            [only] => only.message(&self.kind),
            all => format!(
                "Uploaded {} of {} files{}",
                self.succeeded(),
                all.len(),
                if self.failed() > 0 {
                    format!(" ({} failed)", self.failed())
                } else {
                    String::new()
                }
            ),
        }
    }
}

/// Result of a download request.
#[derive(Debug)]
pub struct DownloadReport {
    pub name: String,
    pub result: Result<PathBuf>,
}

impl DownloadReport {
    pub fn message(&self) -> String {
        match &self.result {
            Ok(path) => format!("Downloaded \"{}\" to {}", self.name, path.display()),
            Err(e) => format!("Failed to download \"{}\": {}", self.name, e),
        }
    }
}

// ── Local preconditions ──────────────────────────────────────────────────────

/// Normalize a user-typed entry name.
pub fn validate_name(input: &str) -> Result<String> {
    let name = input.trim();
    if name.is_empty() {
        return Err(AppError::ValidationFailed("Name cannot be empty".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(AppError::ValidationFailed(
            "Name cannot contain path separators".into(),
        ));
    }
    if name == "." || name == ".." {
        return Err(AppError::ValidationFailed(format!("\"{}\" is not a valid name", name)));
    }
    Ok(name.to_string())
}

/// The selected item must still be listed in the current directory.
pub fn ensure_present(current: &DirectoryNode, item: &SelectedItem) -> Result<()> {
    if current.contains(item.kind, &item.name) {
        Ok(())
    } else {
        Err(AppError::StaleReference(item.name.clone()))
    }
}

fn ensure_available(current: &DirectoryNode, kind: EntryKind, name: &str) -> Result<()> {
    if current.contains(kind, name) {
        return Err(AppError::ValidationFailed(format!(
            "\"{}\" already exists",
            name
        )));
    }
    Ok(())
}

pub fn plan_create_directory(current: &DirectoryNode, input: &str) -> Result<String> {
    let name = validate_name(input)?;
    ensure_available(current, EntryKind::Directory, &name)?;
    Ok(name)
}

pub fn plan_rename(current: &DirectoryNode, item: &SelectedItem, input: &str) -> Result<String> {
    ensure_present(current, item)?;
    let name = validate_name(input)?;
    if name == item.name {
        return Err(AppError::ValidationFailed("Name is unchanged".into()));
    }
    ensure_available(current, item.kind, &name)?;
    Ok(name)
}

pub fn plan_delete(current: &DirectoryNode, item: &SelectedItem) -> Result<()> {
    ensure_present(current, item)
}

pub fn plan_upload(input: &str) -> Result<Vec<PathBuf>> {
    let paths = transfer::parse_upload_paths(input);
    if paths.is_empty() {
        return Err(AppError::ValidationFailed("No files to upload".into()));
    }
    Ok(paths)
}

// ── Remote execution ─────────────────────────────────────────────────────────

/// Runs actions against a `RemoteStore`. Cheap to clone into tasks.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn RemoteStore>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub async fn create_directory(
        &self,
        session: &Session,
        path: &str,
        name: &str,
    ) -> MutationReport {
        let result = self.store.create_directory(session, path, name).await;
        log_result("create_directory", path, name, &result);
        MutationReport::single(MutationKind::CreateDirectory, name, result)
    }

    pub async fn rename(
        &self,
        session: &Session,
        path: &str,
        item: &SelectedItem,
        new_name: &str,
    ) -> MutationReport {
        let result = self.store.rename(session, path, &item.name, new_name).await;
        log_result("rename", path, &item.name, &result);
        MutationReport::single(
            MutationKind::Rename {
                to: new_name.to_string(),
            },
            &item.name,
            result,
        )
    }

    /// Delete through the endpoint matching the item's kind.
    pub async fn delete(&self, session: &Session, path: &str, item: &SelectedItem) -> MutationReport {
        let result = match item.kind {
            EntryKind::File => self.store.delete_file(session, path, &item.name).await,
            EntryKind::Directory => self.store.delete_directory(session, path, &item.name).await,
        };
        log_result("delete", path, &item.name, &result);
        MutationReport::single(MutationKind::Delete { kind: item.kind }, &item.name, result)
    }

    /// Upload every file concurrently. `on_file` is called as each upload
    /// finishes, in completion order; the returned report covers the whole
    /// batch and is produced only after every upload has settled.
    pub async fn upload_batch(
        &self,
        session: &Session,
        path: &str,
        files: Vec<PathBuf>,
        on_file: impl Fn(&ItemOutcome) + Send,
    ) -> MutationReport {
        let mut tasks = JoinSet::new();
        for file in files {
            let store = Arc::clone(&self.store);
            let session = session.clone();
            let path = path.to_string();
            tasks.spawn(async move {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.display().to_string());
                let result = match transfer::read_upload(&file).await {
                    Ok(blob) => store.upload(&session, &path, blob).await,
                    Err(e) => Err(e),
                };
                ItemOutcome { name, result }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => ItemOutcome {
                    name: "<upload task>".to_string(),
                    result: Err(AppError::Io(std::io::Error::other(e))),
                },
            };
            log_result("upload", path, &outcome.name, &outcome.result);
            on_file(&outcome);
            outcomes.push(outcome);
        }

        MutationReport {
            kind: MutationKind::Upload,
            outcomes,
        }
    }

    /// Download a file, or a directory as an archive, into `dest_dir`.
    pub async fn download(
        &self,
        session: &Session,
        path: &str,
        item: &SelectedItem,
        dest_dir: PathBuf,
    ) -> DownloadReport {
        let blob = match item.kind {
            EntryKind::File => self.store.download(session, path, &item.name).await,
            EntryKind::Directory => {
                self.store
                    .download_directory(session, path, &item.name)
                    .await
            }
        };
        let result = match blob {
            Ok(blob) => transfer::save_download(dest_dir, blob).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(saved) => info!(path, name = %item.name, saved = %saved.display(), "download finished"),
            Err(e) => warn!(path, name = %item.name, error = %e, "download failed"),
        }
        DownloadReport {
            name: item.name.clone(),
            result,
        }
    }
}

fn log_result(action: &str, path: &str, name: &str, result: &Result<()>) {
    match result {
        Ok(()) => info!(action, path, name, "mutation succeeded"),
        Err(AppError::StaleReference(_)) => debug!(action, path, name, "stale reference"),
        Err(e) => warn!(action, path, name, error = %e, "mutation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{MemoryStore, Operation};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn tree() -> DirectoryNode {
        DirectoryNode::new("root")
            .with_file("a.txt")
            .with_dir(DirectoryNode::new("sub").with_file("b.txt"))
            .with_dir(DirectoryNode::new("docs"))
    }

    fn setup() -> (Arc<MemoryStore>, Orchestrator, Session) {
        let store = Arc::new(MemoryStore::new(tree()));
        let session = store.issue_token("alice");
        let orchestrator = Orchestrator::new(store.clone());
        (store, orchestrator, session)
    }

    #[test]
    fn validate_name_rules() {
        assert_eq!(validate_name("  photos ").unwrap(), "photos");
        assert!(matches!(validate_name("   "), Err(AppError::ValidationFailed(_))));
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn plan_create_rejects_existing_directory() {
        let current = tree();
        assert!(plan_create_directory(&current, "docs").is_err());
        // A file with the same name does not block a directory.
        assert_eq!(plan_create_directory(&current, "a.txt").unwrap(), "a.txt");
        assert_eq!(plan_create_directory(&current, "new").unwrap(), "new");
    }

    #[test]
    fn plan_rename_directory_uses_bare_name() {
        let current = tree();
        let item = SelectedItem::directory("docs");
        assert_eq!(plan_rename(&current, &item, "papers").unwrap(), "papers");
        // Collides with an existing sibling directory.
        assert!(matches!(
            plan_rename(&current, &item, "sub"),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(plan_rename(&current, &item, "docs").is_err());
    }

    #[test]
    fn plan_rename_missing_item_is_stale() {
        let current = tree();
        let item = SelectedItem::file("docs");
        assert!(matches!(
            plan_rename(&current, &item, "x"),
            Err(AppError::StaleReference(_))
        ));
        assert!(matches!(
            plan_delete(&current, &SelectedItem::directory("ghost")),
            Err(AppError::StaleReference(_))
        ));
    }

    #[test]
    fn plan_upload_requires_paths() {
        assert!(plan_upload("  ").is_err());
        assert_eq!(plan_upload("/a /b").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_directory_success_requests_refresh() {
        let (store, orch, session) = setup();
        let report = orch.create_directory(&session, "/sub", "new").await;
        assert!(report.needs_refresh());
        assert_eq!(report.summary(), "Directory \"new\" created");
        assert!(store.tree().dirs[0].has_dir("new"));
    }

    #[tokio::test]
    async fn failure_does_not_request_refresh() {
        let (store, orch, session) = setup();
        store.fail(Operation::CreateDirectory);
        let report = orch.create_directory(&session, "/", "new").await;
        assert!(!report.needs_refresh());
        assert_eq!(report.failed(), 1);
        assert!(report.summary().starts_with("Failed to create directory \"new\""));
    }

    #[tokio::test]
    async fn delete_routes_by_kind() {
        let (store, orch, session) = setup();
        orch.delete(&session, "/", &SelectedItem::directory("docs")).await;
        orch.delete(&session, "/", &SelectedItem::file("a.txt")).await;
        assert_eq!(store.calls(Operation::DeleteDirectory), 1);
        assert_eq!(store.calls(Operation::DeleteFile), 1);
        let tree = store.tree();
        assert!(!tree.has_dir("docs"));
        assert!(!tree.has_file("a.txt"));
    }

    #[tokio::test]
    async fn rename_sends_bare_directory_name() {
        let (store, orch, session) = setup();
        let report = orch
            .rename(&session, "/", &SelectedItem::directory("docs"), "papers")
            .await;
        assert_eq!(report.summary(), "Renamed \"docs\" to \"papers\"");
        assert!(store.tree().has_dir("papers"));
    }

    #[tokio::test]
    async fn unauthorized_is_reported() {
        let (store, orch, session) = setup();
        store.revoke_tokens();
        let report = orch.delete(&session, "/", &SelectedItem::file("a.txt")).await;
        assert!(report.is_unauthorized());
        assert!(!report.needs_refresh());
    }

    #[tokio::test]
    async fn upload_batch_reports_each_file_and_one_summary() {
        let (store, orch, session) = setup();
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for name in ["one.txt", "two.txt", "bad.txt"] {
            let path = dir.path().join(name);
            std::fs::write(&path, name).unwrap();
            files.push(path);
        }
        files.push(dir.path().join("missing.txt"));
        store.fail_upload_of("bad.txt");

        let seen = Mutex::new(Vec::new());
        let report = orch
            .upload_batch(&session, "/sub", files, |o| {
                seen.lock().unwrap().push((o.name.clone(), o.is_ok()));
            })
            .await;

        assert_eq!(seen.lock().unwrap().len(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert!(report.needs_refresh());
        assert_eq!(report.summary(), "Uploaded 2 of 4 files (2 failed)");

        let sub = store.tree().dirs[0].clone();
        assert!(sub.has_file("one.txt"));
        assert!(sub.has_file("two.txt"));
        assert!(!sub.has_file("bad.txt"));
        assert_eq!(store.content("/sub/one.txt"), Some(b"one.txt".to_vec()));
    }

    #[tokio::test]
    async fn single_upload_uses_item_message() {
        let (_store, orch, session) = setup();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solo.txt");
        std::fs::write(&path, "x").unwrap();
        let report = orch.upload_batch(&session, "/", vec![path], |_| {}).await;
        assert_eq!(report.summary(), "File \"solo.txt\" uploaded successfully!");
    }

    #[tokio::test]
    async fn download_saves_file_and_directory_archive() {
        let (store, orch, session) = setup();
        store.put_content("/a.txt", b"alpha".to_vec());
        let dir = TempDir::new().unwrap();

        let report = orch
            .download(&session, "/", &SelectedItem::file("a.txt"), dir.path().to_path_buf())
            .await;
        let saved = report.result.unwrap();
        assert_eq!(std::fs::read(saved).unwrap(), b"alpha");

        let report = orch
            .download(&session, "/", &SelectedItem::directory("sub"), dir.path().to_path_buf())
            .await;
        assert_eq!(report.result.unwrap(), dir.path().join("sub.zip"));
        // Downloads never touch the tree.
        assert_eq!(store.tree(), tree());
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing_behind() {
        let (store, orch, session) = setup();
        store.fail(Operation::Download);
        let dir = TempDir::new().unwrap();
        let report = orch
            .download(&session, "/", &SelectedItem::file("a.txt"), dir.path().to_path_buf())
            .await;
        assert!(report.result.is_err());
        assert!(report.message().starts_with("Failed to download"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
