//! In-process backend used by `--demo` and by the tests.
//!
//! It keeps its own tree and file contents, applies mutations the way the
//! real server does, and can be told to reject specific operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{Blob, RemoteStore};
use crate::drive::tree::{join_path, split_path, DirectoryNode};
use crate::error::{AppError, Result};
use crate::session::{Credentials, Session};

/// Operations a `MemoryStore` can count or be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    FetchTree,
    Upload,
    Download,
    DownloadDirectory,
    DeleteFile,
    DeleteDirectory,
    Rename,
    CreateDirectory,
}

impl Operation {
    fn endpoint(self) -> &'static str {
        use super::http::endpoints;
        match self {
            Operation::Login => endpoints::LOGIN,
            Operation::FetchTree => endpoints::STRUCTURE,
            Operation::Upload => endpoints::UPLOAD,
            Operation::Download => endpoints::DOWNLOAD,
            Operation::DownloadDirectory => endpoints::DOWNLOAD_DIRECTORY,
            Operation::DeleteFile => endpoints::DELETE_FILE,
            Operation::DeleteDirectory => endpoints::DELETE_DIRECTORY,
            Operation::Rename => endpoints::RENAME,
            Operation::CreateDirectory => endpoints::CREATE_DIRECTORY,
        }
    }
}

#[derive(Default)]
struct State {
    tree: DirectoryNode,
    users: HashMap<String, String>,
    tokens: HashSet<String>,
    contents: HashMap<String, Vec<u8>>,
    failing: HashSet<Operation>,
    failing_uploads: HashSet<String>,
    calls: HashMap<Operation, usize>,
    issued: u64,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// A store serving `tree` with no registered users.
    pub fn new(tree: DirectoryNode) -> Self {
        Self {
            state: Mutex::new(State {
                tree,
                ..State::default()
            }),
        }
    }

    /// Sample drive for `--demo`, with user `demo` / `demo`.
    pub fn demo() -> Self {
        let tree = DirectoryNode::new("demo")
            .with_file("readme.txt")
            .with_dir(
                DirectoryNode::new("photos")
                    .with_dir(DirectoryNode::new("2024").with_file("beach.jpg"))
                    .with_file("cat.png"),
            )
            .with_dir(DirectoryNode::new("documents").with_file("taxes.pdf"));
        let store = Self::new(tree).with_user("demo", "demo");
        store.put_content("/readme.txt", b"Welcome to the demo drive.\n".to_vec());
        store
    }

    /// Register a user that may log in.
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.lock()
            .users
            .insert(username.to_string(), password.to_string());
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store the contents served for the file at `full_path`.
    pub fn put_content(&self, full_path: &str, bytes: Vec<u8>) {
        self.lock().contents.insert(full_path.to_string(), bytes);
    }

    /// Make every call of `op` fail with a server error.
    pub fn fail(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// Make uploads of a file with this name fail.
    pub fn fail_upload_of(&self, name: &str) {
        self.lock().failing_uploads.insert(name.to_string());
    }

    /// Invalidate every issued token, so the next call gets `Unauthorized`.
    pub fn revoke_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Issue a token without going through `login`.
    pub fn issue_token(&self, username: &str) -> Session {
        let mut state = self.lock();
        state.issued += 1;
        let token = format!("mem-{}-{}", username, state.issued);
        state.tokens.insert(token.clone());
        Session::new(username, token)
    }

    /// Number of times `op` was invoked.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Copy of the current server-side tree.
    pub fn tree(&self) -> DirectoryNode {
        self.lock().tree.clone()
    }

    pub fn content(&self, full_path: &str) -> Option<Vec<u8>> {
        self.lock().contents.get(full_path).cloned()
    }

    /// Count the call, then apply failure injection and token checks.
    fn enter(&self, op: Operation, session: Option<&Session>) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(session) = session {
            if !state.tokens.contains(&session.token) {
                return Err(AppError::Unauthorized);
            }
        }
        if state.failing.contains(&op) {
            return Err(server_error(op, 500));
        }
        debug!(?op, "memory store call");
        Ok(state)
    }
}

fn server_error(op: Operation, status: u16) -> AppError {
    AppError::RequestFailed {
        status,
        endpoint: op.endpoint().to_string(),
    }
}

fn dir_mut<'a>(root: &'a mut DirectoryNode, path: &str) -> Option<&'a mut DirectoryNode> {
    let mut node = root;
    for part in split_path(path) {
        node = node.dirs.iter_mut().find(|d| d.name == part)?;
    }
    Some(node)
}

fn file_key(path: &str, name: &str) -> String {
    let mut parts = split_path(path);
    parts.push(name.to_string());
    join_path(&parts)
}

fn archive_manifest(node: &DirectoryNode, prefix: &str, out: &mut String) {
    for file in &node.files {
        out.push_str(prefix);
        out.push_str(file);
        out.push('\n');
    }
    for dir in &node.dirs {
        archive_manifest(dir, &format!("{}{}/", prefix, dir.name), out);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let mut state = self.enter(Operation::Login, None)?;
        match state.users.get(&credentials.username) {
            Some(pw) if *pw == credentials.password => {}
            _ => return Err(AppError::Unauthorized),
        }
        state.issued += 1;
        let token = format!("mem-{}-{}", credentials.username, state.issued);
        state.tokens.insert(token.clone());
        Ok(token)
    }

    async fn fetch_tree(&self, session: &Session) -> Result<DirectoryNode> {
        let state = self.enter(Operation::FetchTree, Some(session))?;
        Ok(state.tree.clone())
    }

    async fn upload(&self, session: &Session, path: &str, file: Blob) -> Result<()> {
        let op = Operation::Upload;
        let mut state = self.enter(op, Some(session))?;
        if state.failing_uploads.contains(&file.name) {
            return Err(server_error(op, 500));
        }
        let dir = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        if !dir.has_file(&file.name) {
            dir.files.push(file.name.clone());
        }
        let key = file_key(path, &file.name);
        state.contents.insert(key, file.bytes);
        Ok(())
    }

    async fn download(&self, session: &Session, path: &str, name: &str) -> Result<Blob> {
        let op = Operation::Download;
        let mut state = self.enter(op, Some(session))?;
        let exists = dir_mut(&mut state.tree, path)
            .map(|d| d.has_file(name))
            .unwrap_or(false);
        if !exists {
            return Err(server_error(op, 404));
        }
        let bytes = state
            .contents
            .get(&file_key(path, name))
            .cloned()
            .unwrap_or_default();
        Ok(Blob::new(name, bytes))
    }

    async fn download_directory(
        &self,
        session: &Session,
        path: &str,
        name: &str,
    ) -> Result<Blob> {
        let op = Operation::DownloadDirectory;
        let mut state = self.enter(op, Some(session))?;
        let parent = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        let dir = parent
            .dirs
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| server_error(op, 404))?;
        let mut manifest = String::new();
        archive_manifest(dir, "", &mut manifest);
        Ok(Blob::new(format!("{}.zip", name), manifest.into_bytes()))
    }

    async fn delete_file(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        let op = Operation::DeleteFile;
        let mut state = self.enter(op, Some(session))?;
        let dir = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        let before = dir.files.len();
        dir.files.retain(|f| f != name);
        if dir.files.len() == before {
            return Err(server_error(op, 404));
        }
        state.contents.remove(&file_key(path, name));
        Ok(())
    }

    async fn delete_directory(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        let op = Operation::DeleteDirectory;
        let mut state = self.enter(op, Some(session))?;
        let dir = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        let before = dir.dirs.len();
        dir.dirs.retain(|d| d.name != name);
        if dir.dirs.len() == before {
            return Err(server_error(op, 404));
        }
        let prefix = format!("{}/", file_key(path, name));
        state.contents.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    async fn rename(
        &self,
        session: &Session,
        path: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let op = Operation::Rename;
        let mut state = self.enter(op, Some(session))?;
        let dir = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        if let Some(sub) = dir.dirs.iter().position(|d| d.name == old_name) {
            if dir.has_dir(new_name) {
                return Err(server_error(op, 409));
            }
            dir.dirs[sub].name = new_name.to_string();
            let old_prefix = format!("{}/", file_key(path, old_name));
            let new_prefix = format!("{}/", file_key(path, new_name));
            let moved: Vec<String> = state
                .contents
                .keys()
                .filter(|k| k.starts_with(&old_prefix))
                .cloned()
                .collect();
            for key in moved {
                if let Some(bytes) = state.contents.remove(&key) {
                    let rest = &key[old_prefix.len()..];
                    state.contents.insert(format!("{}{}", new_prefix, rest), bytes);
                }
            }
            return Ok(());
        }
        if let Some(file) = dir.files.iter().position(|f| f == old_name) {
            if dir.has_file(new_name) {
                return Err(server_error(op, 409));
            }
            dir.files[file] = new_name.to_string();
            if let Some(bytes) = state.contents.remove(&file_key(path, old_name)) {
                state.contents.insert(file_key(path, new_name), bytes);
            }
            return Ok(());
        }
        Err(server_error(op, 404))
    }

    async fn create_directory(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        let op = Operation::CreateDirectory;
        let mut state = self.enter(op, Some(session))?;
        let dir = dir_mut(&mut state.tree, path).ok_or_else(|| server_error(op, 404))?;
        if dir.has_dir(name) {
            return Err(server_error(op, 409));
        }
        dir.dirs.push(DirectoryNode::new(name));
        Ok(())
    }
}
