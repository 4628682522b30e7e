//! Typed access to the storage backend.
//!
//! Every operation except `login` takes the session snapshot it should
//! authenticate with. Nothing here retries: a failure is reported once and
//! the caller decides what to do.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::drive::tree::DirectoryNode;
use crate::error::Result;
use crate::session::{Credentials, Session};

/// Binary payload sent by upload or received by download.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Operations offered by the storage backend.
///
/// `path` is always the directory the operation is addressed to, rendered as
/// `/`-separated names from the root (`"/"` for the root itself).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> Result<String>;

    /// Fetch the whole tree from the root.
    async fn fetch_tree(&self, session: &Session) -> Result<DirectoryNode>;

    /// Upload `file` into the directory at `path`.
    async fn upload(&self, session: &Session, path: &str, file: Blob) -> Result<()>;

    /// Download the file `name` from `path`.
    async fn download(&self, session: &Session, path: &str, name: &str) -> Result<Blob>;

    /// Download the directory `name` under `path` as a zip archive.
    async fn download_directory(&self, session: &Session, path: &str, name: &str)
        -> Result<Blob>;

    async fn delete_file(&self, session: &Session, path: &str, name: &str) -> Result<()>;

    async fn delete_directory(&self, session: &Session, path: &str, name: &str) -> Result<()>;

    /// Rename a file or directory inside `path`.
    async fn rename(
        &self,
        session: &Session,
        path: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()>;

    async fn create_directory(&self, session: &Session, path: &str, name: &str) -> Result<()>;
}
