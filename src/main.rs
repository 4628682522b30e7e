mod app;
mod components;
mod config;
mod drive;
mod error;
mod event;
mod handler;
mod logging;
mod remote;
mod session;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::app::{App, LoginField, Severity};
use crate::config::{AppConfig, DownloadConfig, GeneralConfig, LoggingConfig, ServerConfig};
use crate::event::EventHandler;
use crate::remote::http::HttpStore;
use crate::remote::memory::MemoryStore;
use crate::remote::RemoteStore;
use crate::session::SessionStore;
use crate::tui::{install_panic_hook, Tui};

/// A terminal client for a personal file-storage service.
#[derive(Parser, Debug)]
#[command(name = "drive", version, about)]
struct Cli {
    /// Username to prefill on the login form
    username: Option<String>,

    /// Base URL of the storage service
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Path to a config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory downloads are saved into
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Disable mouse support
    #[arg(long)]
    no_mouse: bool,

    /// Run against a built-in in-memory drive (user demo / demo)
    #[arg(long)]
    demo: bool,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Config values given on the command line.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: self.server.clone(),
                ..Default::default()
            },
            general: GeneralConfig {
                mouse: self.no_mouse.then_some(false),
                ..Default::default()
            },
            download: DownloadConfig {
                dir: self
                    .download_dir
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            },
            logging: LoggingConfig {
                file: self
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn build_backend(cli: &Cli, config: &AppConfig) -> error::Result<(Arc<dyn RemoteStore>, SessionStore)> {
    if cli.demo {
        return Ok((Arc::new(MemoryStore::demo()), SessionStore::in_memory()));
    }
    let store = HttpStore::new(config.base_url(), config.request_timeout())?;
    let session = match SessionStore::default_path() {
        Some(path) if config.persist_session() => SessionStore::persistent(path),
        _ => SessionStore::in_memory(),
    };
    Ok((Arc::new(store), session))
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    logging::init(&config.log_file(), config.log_level())?;
    info!(server = config.base_url(), demo = cli.demo, "starting");

    let (store, session) = build_backend(&cli, &config)?;

    install_panic_hook();
    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(100));
    let mut app = App::new(config, store, session, events.sender());

    if let Some(username) = cli.username {
        app.login.username = username;
        app.login.focus = LoginField::Password;
    }
    if cli.demo {
        app.notify("Demo drive: log in as demo / demo", Severity::Info);
    }
    app.resume_session();

    let result = run(&mut tui, &mut app, &mut events).await;
    tui.restore()?;
    info!("exiting");
    result
}

async fn run(tui: &mut Tui, app: &mut App, events: &mut EventHandler) -> error::Result<()> {
    while !app.should_quit {
        tui.terminal_mut().draw(|frame| ui::render(app, frame))?;
        let event = events.next().await?;
        app.handle_event(event);
    }
    Ok(())
}
