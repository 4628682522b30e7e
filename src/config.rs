//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--server`, `--download-dir`, `--no-mouse`, etc.)
//! 2. Explicit `--config` file
//! 3. `$DRIVE_TUI_CONFIG` environment variable (path to config file)
//! 4. Project-local `.drive-tui.toml` in the current working directory
//! 5. Global `~/.config/drive-tui/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

// ── Section configs ──────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the storage service, e.g. `https://drive.example.com`.
    pub base_url: Option<String>,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

/// Session handling.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Keep the token on disk so the next start skips the login form.
    pub persist: Option<bool>,
    /// Log out automatically when any request comes back 401.
    pub logout_on_unauthorized: Option<bool>,
}

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Confirm before delete operations.
    pub confirm_delete: Option<bool>,
    /// How long a notification stays in the status bar.
    pub notification_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory downloads are saved into.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path.
    pub file: Option<String>,
    /// Default filter when `RUST_LOG` is unset, e.g. `"info"` or `"drive_tui=debug"`.
    pub level: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark" or "light".
    pub scheme: Option<String>,
    /// Accent color override as `#rrggbb`.
    pub accent: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub general: GeneralConfig,
    pub download: DownloadConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_NOTIFICATION_SECS: u64 = 6;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("DRIVE_TUI_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".drive-tui.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("drive-tui").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (the parse error is logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`: `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: other.server.base_url.clone().or(self.server.base_url),
                request_timeout_secs: other
                    .server
                    .request_timeout_secs
                    .or(self.server.request_timeout_secs),
            },
            session: SessionConfig {
                persist: other.session.persist.or(self.session.persist),
                logout_on_unauthorized: other
                    .session
                    .logout_on_unauthorized
                    .or(self.session.logout_on_unauthorized),
            },
            general: GeneralConfig {
                mouse: other.general.mouse.or(self.general.mouse),
                confirm_delete: other.general.confirm_delete.or(self.general.confirm_delete),
                notification_secs: other
                    .general
                    .notification_secs
                    .or(self.general.notification_secs),
            },
            download: DownloadConfig {
                dir: other.download.dir.clone().or(self.download.dir),
            },
            logging: LoggingConfig {
                file: other.logging.file.clone().or(self.logging.file),
                level: other.logging.level.clone().or(self.logging.level),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                accent: other.theme.accent.clone().or(self.theme.accent),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that the highest-priority candidate is merged last.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn base_url(&self) -> &str {
        self.server.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.server
            .request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn persist_session(&self) -> bool {
        self.session.persist.unwrap_or(true)
    }

    pub fn logout_on_unauthorized(&self) -> bool {
        self.session.logout_on_unauthorized.unwrap_or(false)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn confirm_delete(&self) -> bool {
        self.general.confirm_delete.unwrap_or(true)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(
            self.general
                .notification_secs
                .unwrap_or(DEFAULT_NOTIFICATION_SECS),
        )
    }

    /// Download directory: configured, else the user's download directory,
    /// else the current directory.
    pub fn download_dir(&self) -> PathBuf {
        match &self.download.dir {
            Some(dir) => expand_home(dir),
            None => dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        match &self.logging.file {
            Some(file) => expand_home(file),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("drive-tui")
                .join("drive-tui.log"),
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
