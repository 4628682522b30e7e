use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Blob, RemoteStore};
use crate::drive::tree::DirectoryNode;
use crate::error::{AppError, Result};
use crate::session::{Credentials, Session};

/// Backend endpoints, relative to the configured base URL.
pub mod endpoints {
    pub const LOGIN: &str = "/login";
    pub const STRUCTURE: &str = "/api/structure";
    pub const UPLOAD: &str = "/api/upload";
    pub const DOWNLOAD: &str = "/api/download";
    pub const DOWNLOAD_DIRECTORY: &str = "/api/download/directory";
    pub const DELETE_FILE: &str = "/api/file/delete";
    pub const DELETE_DIRECTORY: &str = "/api/directory/delete";
    pub const RENAME: &str = "/api/directory/rename";
    pub const CREATE_DIRECTORY: &str = "/api/directory/create";
}

#[derive(Debug, Serialize)]
struct PathBody<'a> {
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct NamedBody<'a> {
    path: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct DownloadBody<'a> {
    path: &'a str,
    filename: &'a str,
}

#[derive(Debug, Serialize)]
struct RenameBody<'a> {
    path: &'a str,
    old_name: &'a str,
    new_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Map a response status onto the error taxonomy.
pub fn check_status(status: StatusCode, endpoint: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Unauthorized);
    }
    Err(AppError::RequestFailed {
        status: status.as_u16(),
        endpoint: endpoint.to_string(),
    })
}

/// `RemoteStore` over the backend's REST API.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Build a client for `base_url`. `timeout` is applied to every request
    /// when set; by default requests may wait indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn auth_header(session: &Session) -> Result<HeaderValue> {
        HeaderValue::from_str(&session.bearer())
            .map_err(|_| AppError::ValidationFailed("Token contains invalid characters".into()))
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(endpoint, status = status.as_u16(), "response");
        if let Err(e) = check_status(status, endpoint) {
            warn!(endpoint, status = status.as_u16(), "request rejected");
            return Err(e);
        }
        Ok(response)
    }

    async fn post_authed<B: Serialize + ?Sized>(
        &self,
        session: &Session,
        endpoint: &str,
        body: &B,
    ) -> Result<Response> {
        let request = self
            .client
            .post(self.url(endpoint))
            .header(AUTHORIZATION, Self::auth_header(session)?)
            .json(body);
        self.send_checked(request, endpoint).await
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let request = self
            .client
            .post(self.url(endpoints::LOGIN))
            .json(credentials);
        let response = self.send_checked(request, endpoints::LOGIN).await?;
        let body: LoginResponse = response.json().await?;
        Ok(body.token)
    }

    async fn fetch_tree(&self, session: &Session) -> Result<DirectoryNode> {
        let response = self
            .post_authed(session, endpoints::STRUCTURE, &PathBody { path: "/" })
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn upload(&self, session: &Session, path: &str, file: Blob) -> Result<()> {
        let part = Part::bytes(file.bytes).file_name(file.name);
        let form = Form::new().text("path", path.to_string()).part("file", part);
        let request = self
            .client
            .post(self.url(endpoints::UPLOAD))
            .header(AUTHORIZATION, Self::auth_header(session)?)
            .multipart(form);
        self.send_checked(request, endpoints::UPLOAD).await?;
        Ok(())
    }

    async fn download(&self, session: &Session, path: &str, name: &str) -> Result<Blob> {
        let body = DownloadBody {
            path,
            filename: name,
        };
        let response = self
            .post_authed(session, endpoints::DOWNLOAD, &body)
            .await?;
        let bytes = response.bytes().await?;
        Ok(Blob::new(name, bytes.to_vec()))
    }

    async fn download_directory(
        &self,
        session: &Session,
        path: &str,
        name: &str,
    ) -> Result<Blob> {
        let response = self
            .post_authed(
                session,
                endpoints::DOWNLOAD_DIRECTORY,
                &NamedBody { path, name },
            )
            .await?;
        let bytes = response.bytes().await?;
        Ok(Blob::new(format!("{}.zip", name), bytes.to_vec()))
    }

    async fn delete_file(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        self.post_authed(session, endpoints::DELETE_FILE, &NamedBody { path, name })
            .await?;
        Ok(())
    }

    async fn delete_directory(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        self.post_authed(
            session,
            endpoints::DELETE_DIRECTORY,
            &NamedBody { path, name },
        )
        .await?;
        Ok(())
    }

    async fn rename(
        &self,
        session: &Session,
        path: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let body = RenameBody {
            path,
            old_name,
            new_name,
        };
        self.post_authed(session, endpoints::RENAME, &body).await?;
        Ok(())
    }

    async fn create_directory(&self, session: &Session, path: &str, name: &str) -> Result<()> {
        self.post_authed(
            session,
            endpoints::CREATE_DIRECTORY,
            &NamedBody { path, name },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept a single connection, capture the raw request, and answer with
    /// the given status line and body.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn session() -> Session {
        Session::new("alice", "secret-token")
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(StatusCode::OK, "/x").is_ok());
        assert!(check_status(StatusCode::NO_CONTENT, "/x").is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, "/x"),
            Err(AppError::Unauthorized)
        ));
        match check_status(StatusCode::INTERNAL_SERVER_ERROR, "/api/upload") {
            Err(AppError::RequestFailed { status, endpoint }) => {
                assert_eq!(status, 500);
                assert_eq!(endpoint, "/api/upload");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, "/x"),
            Err(AppError::RequestFailed { status: 403, .. })
        ));
    }

    #[test]
    fn request_bodies_use_backend_field_names() {
        let rename = serde_json::to_value(RenameBody {
            path: "/sub",
            old_name: "a",
            new_name: "b",
        })
        .unwrap();
        assert_eq!(
            rename,
            serde_json::json!({"path": "/sub", "old_name": "a", "new_name": "b"})
        );
        let download = serde_json::to_value(DownloadBody {
            path: "/",
            filename: "a.txt",
        })
        .unwrap();
        assert_eq!(download, serde_json::json!({"path": "/", "filename": "a.txt"}));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let store = HttpStore::new("http://localhost:8080/", None).unwrap();
        assert_eq!(store.base_url(), "http://localhost:8080");
        assert_eq!(
            store.url(endpoints::STRUCTURE),
            "http://localhost:8080/api/structure"
        );
    }

    #[tokio::test]
    async fn login_posts_credentials_and_reads_token() {
        let (url, server) = serve_once("200 OK", r#"{"token":"abc123"}"#).await;
        let store = HttpStore::new(&url, None).unwrap();
        let creds = Credentials {
            username: "alice".into(),
            password: "pw".into(),
        };
        let token = store.login(&creds).await.unwrap();
        assert_eq!(token, "abc123");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /login"));
        assert!(raw.contains(r#""username":"alice""#));
        assert!(!raw.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn fetch_tree_sends_bearer_and_parses_tree() {
        let body = r#"{"name":"root","files":["a.txt"],"dirs":[{"name":"sub","files":[],"dirs":[]}]}"#;
        let (url, server) = serve_once("200 OK", body).await;
        let store = HttpStore::new(&url, None).unwrap();
        let tree = store.fetch_tree(&session()).await.unwrap();
        assert_eq!(tree.name, "root");
        assert!(tree.has_dir("sub"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/structure"));
        assert!(raw
            .to_ascii_lowercase()
            .contains("authorization: bearer secret-token"));
        assert!(raw.contains(r#"{"path":"/"}"#));
    }

    #[tokio::test]
    async fn unauthorized_response_maps_to_unauthorized() {
        let (url, server) = serve_once("401 Unauthorized", "{}").await;
        let store = HttpStore::new(&url, None).unwrap();
        let err = store
            .create_directory(&session(), "/", "new")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_error_maps_to_request_failed() {
        let (url, server) = serve_once("500 Internal Server Error", "{}").await;
        let store = HttpStore::new(&url, None).unwrap();
        let err = store
            .delete_file(&session(), "/sub", "b.txt")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::RequestFailed { status: 500, ref endpoint } if endpoint == endpoints::DELETE_FILE
        ));
        let raw = server.await.unwrap();
        assert!(raw.contains(r#""name":"b.txt""#));
    }

    #[tokio::test]
    async fn upload_is_multipart_with_path_and_file() {
        let (url, server) = serve_once("200 OK", "{}").await;
        let store = HttpStore::new(&url, None).unwrap();
        store
            .upload(&session(), "/sub", Blob::new("notes.txt", b"hello".to_vec()))
            .await
            .unwrap();
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/upload"));
        assert!(raw.to_ascii_lowercase().contains("multipart/form-data"));
        assert!(raw.contains(r#"name="path""#));
        assert!(raw.contains(r#"filename="notes.txt""#));
        assert!(raw.contains("hello"));
    }

    #[tokio::test]
    async fn directory_download_is_named_archive() {
        let (url, server) = serve_once("200 OK", "PK-zip-bytes").await;
        let store = HttpStore::new(&url, None).unwrap();
        let blob = store
            .download_directory(&session(), "/", "photos")
            .await
            .unwrap();
        assert_eq!(blob.name, "photos.zip");
        assert_eq!(blob.bytes, b"PK-zip-bytes".to_vec());
        server.await.unwrap();
    }
}
